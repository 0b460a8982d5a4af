use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Input structure for creating a task inside a list.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The title of the task.
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

/// Partial update accepted by `PATCH /lists/{list_id}/tasks/{task_id}`.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct TaskPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

/// Represents a task entity as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// The title of the task.
    pub title: String,
    /// The list this task belongs to.
    #[serde(rename = "_listId")]
    pub list_id: Uuid,
    pub completed: bool,
}

impl Task {
    /// Creates a new, not yet completed task in `list_id`.
    pub fn new(input: TaskInput, list_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            list_id,
            completed: false,
        }
    }
}
