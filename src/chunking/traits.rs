//! Chunker trait and shared configuration.

/// Sizing and context rules applied to every chunking strategy.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Target upper bound for a chunk, in characters.
    pub max_chunk_size: usize,
    /// Lower bound below which a chunk is merged with a neighbor.
    pub min_chunk_size: usize,
    /// Whether to prepend trailing sentences of the previous chunk.
    pub preserve_context: bool,
    /// Importance threshold for structure-based element filtering.
    pub importance_threshold: f32,
    /// Cleaned-text length at which paragraph chunking takes over from
    /// sentence chunking.
    pub long_form_threshold: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 2_000,
            min_chunk_size: 400,
            preserve_context: true,
            importance_threshold: 0.3,
            long_form_threshold: 5_000,
        }
    }
}

impl ChunkerConfig {
    /// Creates a config with custom size bounds.
    #[must_use]
    pub fn with_sizes(max_chunk_size: usize, min_chunk_size: usize) -> Self {
        Self {
            max_chunk_size,
            min_chunk_size,
            ..Self::default()
        }
    }

    /// Disables context-preserving overlap.
    #[must_use]
    pub const fn without_context(mut self) -> Self {
        self.preserve_context = false;
        self
    }
}

/// A strategy for splitting cleaned text into retrieval-sized chunks.
///
/// Implementations only decide *where* to split; sizing enforcement and
/// overlap are applied uniformly afterwards.
pub trait Chunker {
    /// Splits text into raw chunks in document order.
    fn chunk(&self, text: &str, config: &ChunkerConfig) -> Vec<String>;

    /// Strategy name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ChunkerConfig::default();
        assert_eq!(config.max_chunk_size, 2_000);
        assert_eq!(config.min_chunk_size, 400);
        assert!(config.preserve_context);
        assert!((config.importance_threshold - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_builders() {
        let config = ChunkerConfig::with_sizes(1_000, 200).without_context();
        assert_eq!(config.max_chunk_size, 1_000);
        assert_eq!(config.min_chunk_size, 200);
        assert!(!config.preserve_context);
    }
}
