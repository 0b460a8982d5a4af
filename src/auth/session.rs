//! Refresh-token sessions.
//!
//! Sessions are embedded in the user record. Creating one sweeps expired entries and
//! caps the collection, evicting the oldest; validating one never mutates the record.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::token::TokenService;
use crate::db::Store;
use crate::error::AppError;
use crate::models::User;

pub struct SessionManager {
    store: Arc<dyn Store>,
    tokens: TokenService,
    max_sessions: usize,
}

impl SessionManager {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService, max_sessions: usize) -> Self {
        Self {
            store,
            tokens,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Opens a new session for `user`, persists it, and returns its refresh token.
    ///
    /// The store applies the sweep and cap atomically; `user.sessions` is refreshed
    /// from the stored result.
    pub async fn create_session(&self, user: &mut User) -> Result<String, AppError> {
        let session = self.tokens.new_refresh_session();
        let refresh_token = session.token.clone();

        user.sessions = self
            .store
            .add_session(user.id, session, Utc::now(), self.max_sessions)
            .await?;

        log::info!(
            "Session created for user {} ({} active)",
            user.id,
            user.sessions.len()
        );
        Ok(refresh_token)
    }

    /// Loads the user `user_id` provided it holds `refresh_token`, expired or not.
    pub async fn find_user_by_session_token(
        &self,
        user_id: Uuid,
        refresh_token: &str,
    ) -> Result<User, AppError> {
        let not_found = || {
            AppError::SessionNotFound(
                "User not found. Make sure refresh token and user id are correct".into(),
            )
        };

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(not_found)?;

        if user.sessions.find(refresh_token).is_none() {
            return Err(not_found());
        }
        Ok(user)
    }

    /// Full refresh-flow check: the user exists, holds the token, and the session is live.
    pub async fn verify_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
    ) -> Result<User, AppError> {
        let user = self.find_user_by_session_token(user_id, refresh_token).await?;
        if !Self::is_session_valid(&user, refresh_token) {
            return Err(AppError::SessionExpired(
                "Refresh token expired or session invalid".into(),
            ));
        }
        Ok(user)
    }

    /// Removes the session holding `refresh_token`. Returns whether it existed.
    pub async fn end_session(&self, user: &mut User, refresh_token: &str) -> Result<bool, AppError> {
        let removed = self.store.remove_session(user.id, refresh_token).await?;
        user.sessions.remove(refresh_token);
        Ok(removed)
    }

    /// True iff `user` holds a session with `refresh_token` that has not expired.
    pub fn is_session_valid(user: &User, refresh_token: &str) -> bool {
        user.sessions
            .find(refresh_token)
            .map(|session| !Self::has_expired(session.expires_at))
            .unwrap_or(false)
    }

    pub fn has_expired(expires_at: DateTime<Utc>) -> bool {
        expires_at <= Utc::now()
    }
}
