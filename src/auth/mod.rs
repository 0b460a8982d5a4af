pub mod credentials;
pub mod extractors;
pub mod middleware;
pub mod password;
pub mod session;
pub mod token;

use serde::{Deserialize, Serialize};

// Re-export necessary items
pub use credentials::Accounts;
pub use extractors::{AuthenticatedUserId, VerifiedSession};
pub use middleware::{AccessTokenGuard, SessionGuard};
pub use password::{hash_password, verify_password};
pub use session::SessionManager;
pub use token::{Claims, TokenService};

/// Carries the short-lived access token, on requests and on auth responses.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";
/// Carries the long-lived refresh token.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";
/// Identifies the user alongside the refresh token.
pub const USER_ID_HEADER: &str = "_id";

/// Represents the payload for a user login request.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `GET /users/me/access-token`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}
