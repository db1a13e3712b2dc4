//! Provider task lifecycle.
//!
//! Async providers hand back a task identifier whose state we only observe
//! by polling. Tasks are never persisted; once the poll loop resolves or
//! times out the reference is dropped.

use serde::{Deserialize, Serialize};

/// Observed state of a provider-side generation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Pending,
    Processing,
    Succeeded,
    Failed,
}

impl TaskState {
    /// Map a provider status string onto our lifecycle.
    ///
    /// Providers disagree on vocabulary, so parsing is lenient: anything
    /// that is not clearly terminal keeps the poll loop going.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "completed" | "succeeded" | "success" => TaskState::Succeeded,
            "failed" | "error" | "canceled" => TaskState::Failed,
            "pending" | "queued" | "starting" => TaskState::Pending,
            _ => TaskState::Processing,
        }
    }

    /// Terminal states end the poll loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}
