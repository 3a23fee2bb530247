//! Asynchronous AI-summary side channel.
//!
//! Each search may schedule a background summarization task identified by
//! a UUID. The [`SummaryCoordinator`] owns two maps: task state, written
//! by the generator task, and client connections, registered by the
//! WebSocket handler. Frames flow generator -> channel -> socket; the
//! summary text is streamed a few words at a time for a typing effect.

mod client;

pub use client::{SummarizerClient, SummaryOutcome};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::query::SearchHit;

/// How long the generator waits for a WebSocket to attach.
const CONNECTION_WAIT: Duration = Duration::from_secs(10);

/// Poll interval while waiting for the connection.
const CONNECTION_POLL: Duration = Duration::from_millis(100);

/// Words per streamed fragment.
const STREAM_CHUNK_WORDS: usize = 3;

/// Pacing delay between streamed fragments.
const STREAM_DELAY: Duration = Duration::from_millis(100);

/// Default summary length budget.
const DEFAULT_SUMMARY_LENGTH: usize = 300;

/// Lifecycle of a summary task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Scheduled, not yet running.
    Starting,
    /// Calling the summarizer / streaming.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished with an unrecoverable error.
    Failed,
}

impl TaskStatus {
    /// True for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// State of one summary task, owned by its generator.
#[derive(Debug, Clone, Serialize)]
pub struct TaskState {
    /// Current lifecycle phase.
    pub status: TaskStatus,
    /// Human-readable progress note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    /// The finished summary, buffered for late clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Model that produced the summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskState {
    fn starting() -> Self {
        Self {
            status: TaskStatus::Starting,
            progress: None,
            summary: None,
            model_used: None,
            error: None,
        }
    }
}

/// A server-to-client frame on the summary channel.
#[derive(Debug, Clone)]
pub enum WsFrame {
    /// Current task status snapshot.
    Status(TaskState),
    /// Progress note.
    Progress(String),
    /// A fragment of the summary text.
    SummaryChunk(String),
    /// Terminal success marker.
    SummaryDone,
    /// Terminal failure marker.
    Error(String),
    /// Keep-alive.
    Ping,
}

impl WsFrame {
    /// Wire representation of the frame.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Status(state) => json!({
                "type": "status",
                "status": state.status,
                "progress": state.progress.clone().unwrap_or_default(),
            }),
            Self::Progress(progress) => json!({ "type": "progress", "progress": progress }),
            Self::SummaryChunk(text) => json!({ "type": "summary_chunk", "text": text }),
            Self::SummaryDone => json!({ "type": "summary_done" }),
            Self::Error(error) => json!({ "type": "error", "error": error }),
            Self::Ping => json!({ "type": "ping" }),
        }
    }
}

/// Aggregate task counts for introspection.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TaskCounts {
    /// All tasks tracked.
    pub total: usize,
    /// Completed tasks.
    pub completed: usize,
    /// Failed tasks.
    pub failed: usize,
    /// Starting or processing tasks.
    pub active: usize,
}

/// Owner of the task-state table and the connection registry.
///
/// Passed by reference everywhere; there are no globals. The generator
/// task is the single writer of a task's state, the WebSocket handler is
/// the single writer of its connection entry.
pub struct SummaryCoordinator {
    tasks: RwLock<HashMap<String, TaskState>>,
    connections: Mutex<HashMap<String, mpsc::Sender<WsFrame>>>,
}

impl Default for SummaryCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryCoordinator {
    /// Creates an empty coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Schedules a background summary task and returns its request id.
    pub async fn schedule(
        self: &Arc<Self>,
        summarizer: Arc<SummarizerClient>,
        query: String,
        results: Vec<SearchHit>,
    ) -> String {
        let request_id = Uuid::new_v4().to_string();
        self.tasks
            .write()
            .await
            .insert(request_id.clone(), TaskState::starting());

        let coordinator = Arc::clone(self);
        let id = request_id.clone();
        tokio::spawn(async move {
            coordinator.generate(&summarizer, &id, &query, &results).await;
        });

        info!(request_id = %request_id, "summary task scheduled");
        request_id
    }

    /// Registers a client connection and returns the current task state
    /// for the initial status frame.
    pub async fn register_connection(
        &self,
        request_id: &str,
        sender: mpsc::Sender<WsFrame>,
    ) -> Option<TaskState> {
        self.connections
            .lock()
            .await
            .insert(request_id.to_string(), sender);
        debug!(request_id, "summary connection registered");
        self.tasks.read().await.get(request_id).cloned()
    }

    /// Removes a client connection.
    pub async fn unregister_connection(&self, request_id: &str) {
        self.connections.lock().await.remove(request_id);
        debug!(request_id, "summary connection unregistered");
    }

    /// Snapshot of one task's state, for polling clients.
    pub async fn task_state(&self, request_id: &str) -> Option<TaskState> {
        self.tasks.read().await.get(request_id).cloned()
    }

    /// True when the task exists and has finished.
    pub async fn is_terminal(&self, request_id: &str) -> bool {
        self.tasks
            .read()
            .await
            .get(request_id)
            .is_some_and(|state| state.status.is_terminal())
    }

    /// Aggregate task counts.
    pub async fn task_counts(&self) -> TaskCounts {
        let tasks = self.tasks.read().await;
        let mut counts = TaskCounts {
            total: tasks.len(),
            ..TaskCounts::default()
        };
        for state in tasks.values() {
            match state.status {
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
                TaskStatus::Starting | TaskStatus::Processing => counts.active += 1,
            }
        }
        counts
    }

    /// Number of live client connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// The background generator: waits for the client, calls the
    /// summarizer, streams the result, and records the terminal state.
    async fn generate(
        &self,
        summarizer: &SummarizerClient,
        request_id: &str,
        query: &str,
        results: &[SearchHit],
    ) {
        // Give the client a bounded window to attach; proceed without it
        // and buffer the final state for polling.
        let mut waited = Duration::ZERO;
        while waited < CONNECTION_WAIT {
            if self.connections.lock().await.contains_key(request_id) {
                break;
            }
            tokio::time::sleep(CONNECTION_POLL).await;
            waited += CONNECTION_POLL;
        }
        if waited >= CONNECTION_WAIT {
            warn!(request_id, "no client attached within the wait window, proceeding");
        }

        self.update_state(request_id, |state| {
            state.status = TaskStatus::Processing;
            state.progress = Some("Analyzing search results...".to_string());
        })
        .await;
        self.send_frame(request_id, WsFrame::Progress("Analyzing search results...".to_string()))
            .await;

        let outcome = summarizer
            .generate_summary(query, results, DEFAULT_SUMMARY_LENGTH)
            .await;

        if outcome.summary.is_empty() {
            let error = outcome
                .error
                .unwrap_or_else(|| "summarization produced no text".to_string());
            self.update_state(request_id, |state| {
                state.status = TaskStatus::Failed;
                state.error = Some(error.clone());
            })
            .await;
            self.send_frame(request_id, WsFrame::Error(error)).await;
            self.unregister_connection(request_id).await;
            return;
        }

        self.stream_summary(request_id, &outcome.summary).await;

        self.update_state(request_id, |state| {
            state.status = TaskStatus::Completed;
            state.progress = None;
            state.summary = Some(outcome.summary.clone());
            state.model_used = Some(outcome.model_used.clone());
            state.error = outcome.error.clone();
        })
        .await;
        self.send_frame(request_id, WsFrame::SummaryDone).await;
        self.unregister_connection(request_id).await;
        info!(request_id, model = %outcome.model_used, "summary task completed");
    }

    /// Streams the summary in small fragments with pacing.
    async fn stream_summary(&self, request_id: &str, summary: &str) {
        let words: Vec<&str> = summary.split(' ').collect();
        for fragment in words.chunks(STREAM_CHUNK_WORDS) {
            let mut text = fragment.join(" ");
            text.push(' ');
            self.send_frame(request_id, WsFrame::SummaryChunk(text)).await;
            tokio::time::sleep(STREAM_DELAY).await;
        }
    }

    /// Sends a frame to the task's connection, when one is attached.
    pub async fn send_frame(&self, request_id: &str, frame: WsFrame) {
        let sender = {
            let connections = self.connections.lock().await;
            connections.get(request_id).cloned()
        };
        if let Some(sender) = sender
            && sender.send(frame).await.is_err()
        {
            debug!(request_id, "summary client went away mid-stream");
        }
    }

    async fn update_state(&self, request_id: &str, apply: impl FnOnce(&mut TaskState)) {
        if let Some(state) = self.tasks.write().await.get_mut(request_id) {
            apply(state);
        }
    }
}
