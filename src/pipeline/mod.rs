//! Document-processing pipeline.
//!
//! Raw crawled HTML goes in; cleaned, scored, chunked records come out as
//! bounded JSONL files in the indexer's fresh directory. The pipeline is
//! CPU-bound and runs on a rayon worker pool with no shared mutable state
//! between workers.

pub mod processor;
pub mod reader;
pub mod report;
pub mod runner;

pub use processor::{Processor, ProcessorOutput, ProcessorStats};
pub use reader::{discover_input_files, ReaderStats, RecordReader};
pub use report::{write_batch_report, QualityReport};
pub use runner::{log_summary, BatchSummary, PipelineRunner};
