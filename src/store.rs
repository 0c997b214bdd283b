// src/store.rs

use futures_util::StreamExt;
use log::error;
use mongodb::bson::doc;
use mongodb::{Collection, Database};
use uuid::Uuid;

use crate::error::BackendError;
use crate::task::{Task, TaskDraft};

/// The remote task collection as the controller sees it. Ordering is the
/// store's job; `list_by_due_date` returns tasks already sorted ascending
/// by `dueDate` and callers never re-sort.
#[allow(async_fn_in_trait)]
pub trait TaskStore {
    async fn list_by_due_date(&self) -> Result<Vec<Task>, BackendError>;

    /// Persists the draft with `completed = false` and returns the
    /// assigned id.
    async fn insert(&self, draft: &TaskDraft) -> Result<String, BackendError>;

    /// Replaces all mutable fields of the task with the given id. Fails
    /// if the id no longer exists server-side.
    async fn replace(&self, id: &str, draft: &TaskDraft) -> Result<(), BackendError>;

    /// Partial update of only the `completed` flag.
    async fn set_completed(&self, id: &str, completed: bool) -> Result<(), BackendError>;

    async fn delete(&self, id: &str) -> Result<(), BackendError>;
}

/// `TaskStore` backed by the `tasks` collection.
pub struct MongoTaskStore {
    tasks: Collection<Task>,
}

impl MongoTaskStore {
    pub fn new(db: &Database) -> Self {
        Self {
            tasks: db.collection::<Task>("tasks"),
        }
    }
}

impl TaskStore for MongoTaskStore {
    async fn list_by_due_date(&self) -> Result<Vec<Task>, BackendError> {
        let mut cursor = self
            .tasks
            .find(doc! {})
            .sort(doc! { "dueDate": 1 })
            .await?;

        let mut tasks = vec![];
        while let Some(task_res) = cursor.next().await {
            match task_res {
                Ok(task) => tasks.push(task),
                Err(e) => {
                    error!("Error reading tasks cursor: {}", e);
                    return Err(e.into());
                }
            }
        }
        Ok(tasks)
    }

    async fn insert(&self, draft: &TaskDraft) -> Result<String, BackendError> {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            due_date: draft.due_date.clone(),
            priority: draft.priority,
            completed: false,
        };
        self.tasks.insert_one(&task).await?;
        Ok(task.id)
    }

    async fn replace(&self, id: &str, draft: &TaskDraft) -> Result<(), BackendError> {
        let update = doc! {
            "$set": {
                "title": &draft.title,
                "description": &draft.description,
                "dueDate": &draft.due_date,
                "priority": draft.priority.as_str(),
            }
        };
        let res = self.tasks.update_one(doc! { "_id": id }, update).await?;
        if res.matched_count == 0 {
            return Err(BackendError::message(format!("no task with id {}", id)));
        }
        Ok(())
    }

    async fn set_completed(&self, id: &str, completed: bool) -> Result<(), BackendError> {
        let update = doc! { "$set": { "completed": completed } };
        let res = self.tasks.update_one(doc! { "_id": id }, update).await?;
        if res.matched_count == 0 {
            return Err(BackendError::message(format!("no task with id {}", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        let res = self.tasks.delete_one(doc! { "_id": id }).await?;
        if res.deleted_count == 0 {
            return Err(BackendError::message(format!("no task with id {}", id)));
        }
        Ok(())
    }
}
