// src/controller.rs

use log::{debug, info};

use crate::error::TaskError;
use crate::store::TaskStore;
use crate::task::{Task, TaskDraft};

/// Whether the controller has a backend round trip in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Refreshing,
}

/// Owns the in-memory task list for the current session and mediates all
/// mutations through the [`TaskStore`].
///
/// Every write is followed by a full re-fetch rather than an optimistic
/// local edit, so the backend's `dueDate` ordering is the only ordering
/// logic in the system and the in-memory list can never drift from it.
/// Mutations take `&mut self`; holding the controller behind an async
/// mutex serializes overlapping user actions.
pub struct TaskListController<S> {
    store: S,
    tasks: Vec<Task>,
    state: ControllerState,
}

impl<S: TaskStore> TaskListController<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            tasks: Vec::new(),
            state: ControllerState::Idle,
        }
    }

    /// The last-fetched task sequence, in backend order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Fetches the full collection ordered by `dueDate` ascending and
    /// replaces the in-memory list wholesale (last fetch wins). On failure
    /// the previous list is kept and the error surfaces to the caller.
    pub async fn refresh(&mut self) -> Result<(), TaskError> {
        self.state = ControllerState::Refreshing;
        let result = self.store.list_by_due_date().await;
        self.state = ControllerState::Idle;
        let fetched = result?;
        debug!("Refreshed task list: {} tasks", fetched.len());
        self.tasks = fetched;
        Ok(())
    }

    /// Persists a new task with `completed = false`, then refreshes to pick
    /// up the assigned id and canonical ordering. A draft with an empty
    /// title or due date fails validation without touching the store.
    pub async fn create(&mut self, draft: &TaskDraft) -> Result<(), TaskError> {
        draft.validate()?;
        self.state = ControllerState::Refreshing;
        let result = self.store.insert(draft).await;
        self.state = ControllerState::Idle;
        let id = result?;
        info!("Created task {}", id);
        self.refresh().await
    }

    /// Replaces all mutable fields of the task with the given id, then
    /// refreshes. Same validation as [`create`](Self::create).
    pub async fn update(&mut self, id: &str, draft: &TaskDraft) -> Result<(), TaskError> {
        draft.validate()?;
        self.state = ControllerState::Refreshing;
        let result = self.store.replace(id, draft).await;
        self.state = ControllerState::Idle;
        result?;
        info!("Updated task {}", id);
        self.refresh().await
    }

    /// Partial update of only the `completed` flag, then refresh.
    pub async fn toggle_completion(&mut self, id: &str, completed: bool) -> Result<(), TaskError> {
        self.state = ControllerState::Refreshing;
        let result = self.store.set_completed(id, completed).await;
        self.state = ControllerState::Idle;
        result?;
        self.refresh().await
    }

    /// Removes the task, then refreshes.
    pub async fn delete(&mut self, id: &str) -> Result<(), TaskError> {
        self.state = ControllerState::Refreshing;
        let result = self.store.delete(id).await;
        self.state = ControllerState::Idle;
        result?;
        info!("Deleted task {}", id);
        self.refresh().await
    }

    /// Case-insensitive substring match against `title`, over the
    /// last-fetched list. Lazy and restartable: recomputed on every call,
    /// never cached, and preserves backend ordering. Never touches the
    /// store.
    pub fn filter<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Task> + 'a {
        let needle = query.to_lowercase();
        self.tasks
            .iter()
            .filter(move |task| task.title.to_lowercase().contains(&needle))
    }
}
