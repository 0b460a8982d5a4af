use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::User;

/// Extracts the authenticated user's ID from request extensions.
///
/// Only available on routes wrapped by `AccessTokenGuard`, which verifies the access
/// token and inserts this value. Missing means the guard did not run, and the request
/// is rejected with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUserId(pub Uuid);

impl FromRequest for AuthenticatedUserId {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUserId>().copied() {
            Some(user_id) => ready(Ok(user_id)),
            None => {
                let err = AppError::Unauthorized("Access token required".to_string());
                ready(Err(err.into()))
            }
        }
    }
}

/// The user and refresh token accepted by `SessionGuard`.
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    pub user: User,
    pub refresh_token: String,
}

impl FromRequest for VerifiedSession {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<VerifiedSession>().cloned() {
            Some(session) => ready(Ok(session)),
            None => {
                let err = AppError::Unauthorized("Refresh session required".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
