use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::AppError;
use crate::models::{List, ListPatch, Session, Sessions, Task, TaskPatch, User};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    lists: Vec<List>,
    tasks: Vec<Task>,
}

/// Process-local store used in tests and when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn init(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn close(&self) {
        let mut data = self.data.write().await;
        *data = Collections::default();
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut data = self.data.write().await;
        if data.users.iter().any(|existing| existing.email == user.email) {
            return Err(AppError::Validation("Email already registered".into()));
        }
        data.users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|user| user.email == email).cloned())
    }

    async fn add_session(
        &self,
        user_id: Uuid,
        session: Session,
        now: DateTime<Utc>,
        max_sessions: usize,
    ) -> Result<Sessions, AppError> {
        let mut data = self.data.write().await;
        let user = data
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        let (swept, evicted) = user.sessions.admit(session, now, max_sessions);
        log::debug!("User {}: {} sessions swept, {} evicted", user_id, swept, evicted);
        Ok(user.sessions.clone())
    }

    async fn remove_session(&self, user_id: Uuid, token: &str) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        let user = data
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        Ok(user.sessions.remove(token))
    }

    async fn lists_for_user(&self, user_id: Uuid) -> Result<Vec<List>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .lists
            .iter()
            .filter(|list| list.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_list(&self, list: &List) -> Result<(), AppError> {
        self.data.write().await.lists.push(list.clone());
        Ok(())
    }

    async fn find_list(&self, id: Uuid, user_id: Uuid) -> Result<Option<List>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .lists
            .iter()
            .find(|list| list.id == id && list.user_id == user_id)
            .cloned())
    }

    async fn update_list(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: &ListPatch,
    ) -> Result<Option<List>, AppError> {
        let mut data = self.data.write().await;
        Ok(data
            .lists
            .iter_mut()
            .find(|list| list.id == id && list.user_id == user_id)
            .map(|list| {
                patch.apply(list);
                list.clone()
            }))
    }

    async fn delete_list(&self, id: Uuid, user_id: Uuid) -> Result<Option<List>, AppError> {
        let mut data = self.data.write().await;
        let position = data
            .lists
            .iter()
            .position(|list| list.id == id && list.user_id == user_id);
        Ok(position.map(|index| data.lists.remove(index)))
    }

    async fn tasks_for_list(&self, list_id: Uuid) -> Result<Vec<Task>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .tasks
            .iter()
            .filter(|task| task.list_id == list_id)
            .cloned()
            .collect())
    }

    async fn insert_task(&self, task: &Task) -> Result<(), AppError> {
        self.data.write().await.tasks.push(task.clone());
        Ok(())
    }

    async fn update_task(
        &self,
        id: Uuid,
        list_id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, AppError> {
        let mut data = self.data.write().await;
        Ok(data
            .tasks
            .iter_mut()
            .find(|task| task.id == id && task.list_id == list_id)
            .map(|task| {
                patch.apply(task);
                task.clone()
            }))
    }

    async fn delete_task(&self, id: Uuid, list_id: Uuid) -> Result<Option<Task>, AppError> {
        let mut data = self.data.write().await;
        let position = data
            .tasks
            .iter()
            .position(|task| task.id == id && task.list_id == list_id);
        Ok(position.map(|index| data.tasks.remove(index)))
    }

    async fn delete_tasks_in_list(&self, list_id: Uuid) -> Result<u64, AppError> {
        let mut data = self.data.write().await;
        let before = data.tasks.len();
        data.tasks.retain(|task| task.list_id != list_id);
        Ok((before - data.tasks.len()) as u64)
    }
}
