use thiserror::Error;

/// Why a refresh attempt produced no access token. Shared by every waiter, hence `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No refresh session - log in first")]
    MissingCredentials,

    #[error("Refresh rejected with status {0}")]
    Rejected(u16),

    #[error("Refresh response carried no access token")]
    MissingToken,

    #[error("Refresh request failed: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    /// The session could not be renewed; credentials were cleared and the logout hook fired.
    #[error("Logged out: {0}")]
    LoggedOut(RefreshError),

    #[error("Request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Authentication response missing header {0}")]
    MissingHeader(&'static str),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Network(e) => e.status(),
            _ => None,
        }
    }
}
