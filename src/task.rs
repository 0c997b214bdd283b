// src/task.rs

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// A single to-do item as stored in the `tasks` collection.
///
/// Field names on the wire are camelCase; the document key doubles as the
/// opaque task id and is assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Free-form date string (expected `YYYY-MM-DD`-like); doubles as the
    /// server-side sort key.
    pub due_date: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
}

/// Display priority of a task. Drives the card color in the client and
/// nothing else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// A task payload without the server-assigned id or completion flag,
/// submitted for create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: String,
    #[serde(default)]
    pub priority: Priority,
}

impl TaskDraft {
    /// Client-side precondition for create and update: `title` and
    /// `dueDate` must be non-empty after trimming. Runs before any
    /// network call.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.title.trim().is_empty() {
            return Err(TaskError::Validation("title"));
        }
        if self.due_date.trim().is_empty() {
            return Err(TaskError::Validation("dueDate"));
        }
        Ok(())
    }
}
