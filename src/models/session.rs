use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One authenticated client instance: a refresh token and the moment it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: String, expires_at: DateTime<Utc>) -> Self {
        Self { token, expires_at }
    }

    /// A session is live strictly before `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The ordered set of sessions embedded in a user record, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sessions(Vec<Session>);

impl Sessions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, session: Session) {
        self.0.push(session);
    }

    pub fn find(&self, token: &str) -> Option<&Session> {
        self.0.iter().find(|session| session.token == token)
    }

    /// Removes the session holding `token`. Returns whether one was present.
    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|session| session.token != token);
        self.0.len() != before
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.0.len();
        self.0.retain(|session| !session.is_expired_at(now));
        before - self.0.len()
    }

    /// Drops the oldest entries until at most `max` remain.
    pub fn enforce_cap(&mut self, max: usize) -> usize {
        let excess = self.0.len().saturating_sub(max);
        self.0.drain(..excess);
        excess
    }

    /// Sweeps expired entries, appends `session`, then evicts the oldest beyond `max`.
    ///
    /// Returns how many entries were swept and how many were evicted.
    pub fn admit(&mut self, session: Session, now: DateTime<Utc>, max: usize) -> (usize, usize) {
        let swept = self.sweep_expired(now);
        self.push(session);
        let evicted = self.enforce_cap(max);
        (swept, evicted)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.0.iter()
    }
}
