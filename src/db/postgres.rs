use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::Store;
use crate::error::AppError;
use crate::models::{List, ListPatch, Session, Sessions, Task, TaskPatch, User};

const MAX_CONNECTIONS: u32 = 10;

// Sessions live inside the user row, mirroring their lack of an independent lifecycle.
// `tasks.list_id` carries no foreign key: list deletion cascades in the application.
const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        sessions JSONB NOT NULL DEFAULT '[]'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS lists (
        id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS tasks (
        id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        list_id UUID NOT NULL,
        completed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS tasks_list_id_idx ON tasks (list_id)",
];

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    sessions: Json<Sessions>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            sessions: row.sessions.0,
            created_at: row.created_at,
        }
    }
}

/// Reads the sessions of `user_id`, holding the row lock until the transaction ends.
async fn lock_sessions(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<Sessions, AppError> {
    let row: Option<(Json<Sessions>,)> =
        sqlx::query_as("SELECT sessions FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
    row.map(|(sessions,)| sessions.0)
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

async fn write_sessions(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    sessions: &Sessions,
) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET sessions = $1 WHERE id = $2")
        .bind(Json(sessions))
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// PostgreSQL-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn init(&self) -> Result<(), AppError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        log::info!("Database schema ready");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, password_hash, sessions, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(Json(&user.sessions))
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::Validation("Email already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, sessions, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, sessions, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn add_session(
        &self,
        user_id: Uuid,
        session: Session,
        now: DateTime<Utc>,
        max_sessions: usize,
    ) -> Result<Sessions, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut sessions = lock_sessions(&mut tx, user_id).await?;
        let (swept, evicted) = sessions.admit(session, now, max_sessions);
        log::debug!("User {}: {} sessions swept, {} evicted", user_id, swept, evicted);
        write_sessions(&mut tx, user_id, &sessions).await?;
        tx.commit().await?;
        Ok(sessions)
    }

    async fn remove_session(&self, user_id: Uuid, token: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut sessions = lock_sessions(&mut tx, user_id).await?;
        let removed = sessions.remove(token);
        if removed {
            write_sessions(&mut tx, user_id, &sessions).await?;
        }
        tx.commit().await?;
        Ok(removed)
    }

    async fn lists_for_user(&self, user_id: Uuid) -> Result<Vec<List>, AppError> {
        let lists = sqlx::query_as::<_, List>(
            "SELECT id, title, user_id FROM lists WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lists)
    }

    async fn insert_list(&self, list: &List) -> Result<(), AppError> {
        sqlx::query("INSERT INTO lists (id, title, user_id) VALUES ($1, $2, $3)")
            .bind(list.id)
            .bind(&list.title)
            .bind(list.user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_list(&self, id: Uuid, user_id: Uuid) -> Result<Option<List>, AppError> {
        let list = sqlx::query_as::<_, List>(
            "SELECT id, title, user_id FROM lists WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(list)
    }

    async fn update_list(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: &ListPatch,
    ) -> Result<Option<List>, AppError> {
        let list = sqlx::query_as::<_, List>(
            "UPDATE lists SET title = COALESCE($3, title)
             WHERE id = $1 AND user_id = $2
             RETURNING id, title, user_id",
        )
        .bind(id)
        .bind(user_id)
        .bind(&patch.title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(list)
    }

    async fn delete_list(&self, id: Uuid, user_id: Uuid) -> Result<Option<List>, AppError> {
        let list = sqlx::query_as::<_, List>(
            "DELETE FROM lists WHERE id = $1 AND user_id = $2 RETURNING id, title, user_id",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(list)
    }

    async fn tasks_for_list(&self, list_id: Uuid) -> Result<Vec<Task>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT id, title, list_id, completed FROM tasks WHERE list_id = $1 ORDER BY created_at",
        )
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), AppError> {
        sqlx::query("INSERT INTO tasks (id, title, list_id, completed) VALUES ($1, $2, $3, $4)")
            .bind(task.id)
            .bind(&task.title)
            .bind(task.list_id)
            .bind(task.completed)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_task(
        &self,
        id: Uuid,
        list_id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET title = COALESCE($3, title), completed = COALESCE($4, completed)
             WHERE id = $1 AND list_id = $2
             RETURNING id, title, list_id, completed",
        )
        .bind(id)
        .bind(list_id)
        .bind(&patch.title)
        .bind(patch.completed)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn delete_task(&self, id: Uuid, list_id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(
            "DELETE FROM tasks WHERE id = $1 AND list_id = $2 RETURNING id, title, list_id, completed",
        )
        .bind(id)
        .bind(list_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn delete_tasks_in_list(&self, list_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE list_id = $1")
            .bind(list_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
