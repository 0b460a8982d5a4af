use crate::{
    auth::{
        AccessTokenResponse, Accounts, LoginRequest, SessionManager, TokenService,
        VerifiedSession, ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER,
    },
    error::AppError,
    models::{User, UserInput},
};
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use serde_json::json;

/// Opens a session for `user` and answers with the user in the body and both
/// tokens in response headers.
async fn respond_with_session(
    mut user: User,
    sessions: &SessionManager,
    tokens: &TokenService,
) -> Result<HttpResponse, AppError> {
    let refresh_token = sessions.create_session(&mut user).await?;
    let (access_token, _) = tokens.sign_access_token(user.id)?;

    Ok(HttpResponse::Ok()
        .insert_header((REFRESH_TOKEN_HEADER, refresh_token))
        .insert_header((ACCESS_TOKEN_HEADER, access_token))
        .json(user))
}

/// Sign up
///
/// Creates the account, opens its first session, and returns the user with
/// `x-access-token` and `x-refresh-token` headers.
///
/// ## Responses:
/// - `200 OK`: the created user.
/// - `400 Bad Request`: invalid fields or email already registered.
#[post("")]
pub async fn signup(
    accounts: web::Data<Accounts>,
    sessions: web::Data<SessionManager>,
    tokens: web::Data<TokenService>,
    signup_data: web::Json<UserInput>,
) -> Result<impl Responder, AppError> {
    let user = accounts.create_user(signup_data.into_inner()).await?;
    respond_with_session(user, &sessions, &tokens).await
}

/// Login
///
/// Verifies email and password, opens a new session, and returns the user with both tokens.
/// Wrong credentials answer `400` without issuing any token.
#[post("/login")]
pub async fn login(
    accounts: web::Data<Accounts>,
    sessions: web::Data<SessionManager>,
    tokens: web::Data<TokenService>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let user = accounts
        .find_by_credentials(&login_data.email, &login_data.password)
        .await?;
    respond_with_session(user, &sessions, &tokens).await
}

/// Renew the access token
///
/// Requires `SessionGuard`: a live refresh session identified by `_id` and `x-refresh-token`.
#[get("/access-token")]
pub async fn renew_access_token(
    session: VerifiedSession,
    tokens: web::Data<TokenService>,
) -> Result<impl Responder, AppError> {
    let (access_token, _) = tokens.sign_access_token(session.user.id)?;

    Ok(HttpResponse::Ok()
        .insert_header((ACCESS_TOKEN_HEADER, access_token.clone()))
        .json(AccessTokenResponse { access_token }))
}

/// Logout
///
/// Ends the session presented through `SessionGuard`. Other sessions of the user stay open.
#[delete("/session")]
pub async fn logout(
    session: VerifiedSession,
    sessions: web::Data<SessionManager>,
) -> Result<impl Responder, AppError> {
    let VerifiedSession {
        mut user,
        refresh_token,
    } = session;
    sessions.end_session(&mut user, &refresh_token).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Logged out successfully" })))
}
