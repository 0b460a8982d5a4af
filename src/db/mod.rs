//! Storage seam.
//!
//! Handlers, middleware, and the session manager talk to persistence only through the
//! [`Store`] trait. A single handle is built in `main` (see [`open`]), shared as
//! `web::Data<dyn Store>`, initialised before the server binds and closed after it stops.
//!
//! Every method is a single-record operation; there are no cross-record transactions.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{List, ListPatch, Session, Sessions, Task, TaskPatch, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Prepares the backing storage (schema creation for PostgreSQL).
    async fn init(&self) -> Result<(), AppError>;
    /// Releases connections. The store must not be used afterwards.
    async fn close(&self);

    /// Inserts a new user. Fails with `AppError::Validation` if the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    /// Exact, case-sensitive email match.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    /// Adds `session` to `user_id` as one atomic step (see [`Sessions::admit`]) and
    /// returns the stored collection. Concurrent calls for one user never lose an entry.
    async fn add_session(
        &self,
        user_id: Uuid,
        session: Session,
        now: DateTime<Utc>,
        max_sessions: usize,
    ) -> Result<Sessions, AppError>;
    /// Atomically removes the session holding `token`. Returns whether it existed.
    async fn remove_session(&self, user_id: Uuid, token: &str) -> Result<bool, AppError>;

    async fn lists_for_user(&self, user_id: Uuid) -> Result<Vec<List>, AppError>;
    async fn insert_list(&self, list: &List) -> Result<(), AppError>;
    async fn find_list(&self, id: Uuid, user_id: Uuid) -> Result<Option<List>, AppError>;
    async fn update_list(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: &ListPatch,
    ) -> Result<Option<List>, AppError>;
    async fn delete_list(&self, id: Uuid, user_id: Uuid) -> Result<Option<List>, AppError>;

    async fn tasks_for_list(&self, list_id: Uuid) -> Result<Vec<Task>, AppError>;
    async fn insert_task(&self, task: &Task) -> Result<(), AppError>;
    async fn update_task(
        &self,
        id: Uuid,
        list_id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, AppError>;
    async fn delete_task(&self, id: Uuid, list_id: Uuid) -> Result<Option<Task>, AppError>;
    /// Removes every task of `list_id`, returning how many were deleted.
    async fn delete_tasks_in_list(&self, list_id: Uuid) -> Result<u64, AppError>;
}

/// Builds and initialises the store selected by the configuration.
pub async fn open(config: &Config) -> Result<Arc<dyn Store>, AppError> {
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            log::info!("Using PostgreSQL storage");
            Arc::new(PgStore::connect(url).await?)
        }
        None => {
            log::warn!("DATABASE_URL not set, using in-memory storage; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    store.init().await?;
    Ok(store)
}
