//! # siftd
//!
//! Chunk-first web search platform core.
//!
//! siftd turns raw crawled HTML into cleaned, scored, chunked records,
//! commits them to an OpenSearch-compatible store through a priority-
//! queued indexer, and serves chunk-first search with domain
//! diversification and an asynchronous AI-summary channel.
//!
//! ## Subsystems
//!
//! - **Pipeline**: language filtering, single-pass HTML extraction, text
//!   cleaning, quality scoring, semantic chunking on a rayon worker pool
//! - **Indexer**: dual-priority bounded queue with backpressure, bulk
//!   commits to daily indices, offline-mode degradation
//! - **Query service**: cached chunk search, domain diversification,
//!   parent-document merge, smart previews, WebSocket summary streaming

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]

pub mod chunking;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod lang;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod score;
pub mod server;
pub mod summary;
pub mod text;

// Re-export commonly used types at crate root
pub use error::{Error, IndexError, PipelineError, QueryError, Result};

// Re-export core domain types
pub use model::{
    chunk_id, document_id, ContentType, Document, DocumentChunk, QueueRecord, RawRecord,
};

// Re-export configuration
pub use config::{IndexerConfig, PipelineConfig, ServerConfig};

// Re-export pipeline types
pub use pipeline::{PipelineRunner, Processor, ProcessorOutput, ProcessorStats};

// Re-export indexer types
pub use index::{DualPriorityQueue, IndexerService, OsClient, Priority, QueueItem};

// Re-export query types
pub use query::{SearchHit, SearchResult, SearchService};

// Re-export summary types
pub use summary::{SummarizerClient, SummaryCoordinator};
