//! Priority-queued indexer.
//!
//! Ingests pipeline output files through a dual-priority bounded queue
//! and commits them to daily indices with bulk calls. Fresh files always
//! preempt backlog; the index store being down degrades the service to
//! offline mode instead of stopping it.

pub mod admin;
pub mod client;
pub mod queue;
pub mod worker;

pub use admin::daily_index_name;
pub use client::{BulkAction, BulkOutcome, OsClient};
pub use queue::{DualPriorityQueue, Priority, QueueItem};
pub use worker::{IndexerService, IndexerStats};
