//! HTTP client for the task manager API.
//!
//! [`ApiClient`] attaches the current access token to every request. When the server
//! answers 401 it renews the access token through [`RefreshCoordinator`] (one refresh
//! at a time, shared by all concurrent callers) and replays the request once. If the
//! refresh fails the client drops its credentials, fires the logout hook, and reports
//! [`ClientError::LoggedOut`] instead of retrying again.

pub mod error;
pub mod refresh;

use reqwest::{header::HeaderMap, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::{AccessTokenResponse, ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER, USER_ID_HEADER};
use crate::models::{List, Task, TaskPatch, User};

pub use error::{ClientError, RefreshError};
pub use refresh::RefreshCoordinator;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path of the access-token renewal endpoint.
const ACCESS_TOKEN_PATH: &str = "/users/me/access-token";

/// Tokens held by a logged-in client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: Option<Uuid>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

type LogoutHook = Arc<dyn Fn() + Send + Sync>;

/// Clones share credentials and the refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    credentials: Arc<RwLock<Credentials>>,
    coordinator: Arc<RefreshCoordinator>,
    on_logout: Option<LogoutHook>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: Arc::new(RwLock::new(Credentials::default())),
            coordinator: Arc::new(RefreshCoordinator::new()),
            on_logout: None,
        })
    }

    /// Registers a callback run whenever the client is forced into the logged-out state.
    pub fn with_logout_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_logout = Some(Arc::new(hook));
        self
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credentials;
    }

    pub fn is_logged_in(&self) -> bool {
        self.credentials().refresh_token.is_some()
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ---------------------------------------------------------------------
    // Session
    // ---------------------------------------------------------------------

    pub async fn signup(&self, email: &str, password: &str) -> Result<User, ClientError> {
        self.authenticate("/users", email, password).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        self.authenticate("/users/login", email, password).await
    }

    async fn authenticate(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ClientError> {
        let response = self
            .http
            .post(self.url(path))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let access_token = header_value(response.headers(), ACCESS_TOKEN_HEADER)?;
        let refresh_token = header_value(response.headers(), REFRESH_TOKEN_HEADER)?;
        let user: User = response.json().await?;

        self.set_credentials(Credentials {
            user_id: Some(user.id),
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
        });
        log::debug!("Logged in as {}", user.id);
        Ok(user)
    }

    /// Ends the server-side session (best-effort) and clears local credentials.
    pub async fn logout(&self) {
        let credentials = self.credentials();
        if let (Some(user_id), Some(refresh_token)) = (credentials.user_id, credentials.refresh_token)
        {
            let result = self
                .http
                .delete(self.url("/users/me/session"))
                .header(USER_ID_HEADER, user_id.to_string())
                .header(REFRESH_TOKEN_HEADER, refresh_token)
                .send()
                .await;
            if let Err(e) = result {
                log::warn!("Server-side logout failed: {}", e);
            }
        }
        self.force_logout();
    }

    /// Clears credentials; the hook fires only on the transition out of a session.
    fn force_logout(&self) {
        let previous = std::mem::take(
            &mut *self
                .credentials
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if previous.refresh_token.is_none() {
            return;
        }
        if let Some(hook) = &self.on_logout {
            hook();
        }
    }

    // ---------------------------------------------------------------------
    // Request pipeline
    // ---------------------------------------------------------------------

    /// Sends a request with the current access token, refreshing and replaying once on 401.
    ///
    /// Non-401 error statuses come back unchanged as `ClientError::Status`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ClientError> {
        let used_token = self.credentials().access_token;
        let response = self.dispatch(&method, path, body, used_token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return error_for_status(response).await;
        }

        log::debug!("{} {} answered 401, renewing access token", method, path);
        let fresh_token = match self.fresh_access_token(used_token.as_deref()).await {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Access token renewal failed, logging out: {}", e);
                self.force_logout();
                return Err(ClientError::LoggedOut(e));
            }
        };

        let replay = self.dispatch(&method, path, body, Some(&fresh_token)).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            self.force_logout();
            return Err(ClientError::LoggedOut(RefreshError::Rejected(
                StatusCode::UNAUTHORIZED.as_u16(),
            )));
        }
        error_for_status(replay).await
    }

    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
        access_token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(token) = access_token {
            request = request.header(ACCESS_TOKEN_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// An access token newer than `used`, refreshing only if nobody has yet.
    async fn fresh_access_token(&self, used: Option<&str>) -> Result<String, RefreshError> {
        let credentials = self.credentials();
        if let Some(current) = credentials.access_token {
            if Some(current.as_str()) != used {
                return Ok(current);
            }
        }

        let (user_id, refresh_token) = match (credentials.user_id, credentials.refresh_token) {
            (Some(user_id), Some(refresh_token)) => (user_id, refresh_token),
            _ => return Err(RefreshError::MissingCredentials),
        };

        let http = self.http.clone();
        let url = self.url(ACCESS_TOKEN_PATH);
        let store = Arc::clone(&self.credentials);
        self.coordinator
            .refresh(move || async move {
                let token = request_access_token(&http, &url, user_id, &refresh_token).await?;
                if store_refreshed_token(&store, &refresh_token, &token) {
                    log::debug!("Access token refreshed");
                } else {
                    log::debug!("Session changed during refresh, new access token not stored");
                }
                Ok::<_, RefreshError>(token)
            })
            .await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        Ok(self.send(method, path, body).await?.json().await?)
    }

    // ---------------------------------------------------------------------
    // Lists and tasks
    // ---------------------------------------------------------------------

    pub async fn lists(&self) -> Result<Vec<List>, ClientError> {
        self.send_json(Method::GET, "/lists", None).await
    }

    pub async fn create_list(&self, title: &str) -> Result<List, ClientError> {
        self.send_json(Method::POST, "/lists", Some(&json!({ "title": title })))
            .await
    }

    pub async fn rename_list(&self, list_id: Uuid, title: &str) -> Result<(), ClientError> {
        let path = format!("/lists/{}", list_id);
        self.send(Method::PATCH, &path, Some(&json!({ "title": title })))
            .await?;
        Ok(())
    }

    pub async fn delete_list(&self, list_id: Uuid) -> Result<List, ClientError> {
        self.send_json(Method::DELETE, &format!("/lists/{}", list_id), None)
            .await
    }

    pub async fn tasks(&self, list_id: Uuid) -> Result<Vec<Task>, ClientError> {
        self.send_json(Method::GET, &format!("/lists/{}/tasks", list_id), None)
            .await
    }

    pub async fn create_task(&self, list_id: Uuid, title: &str) -> Result<Task, ClientError> {
        let path = format!("/lists/{}/tasks", list_id);
        self.send_json(Method::POST, &path, Some(&json!({ "title": title })))
            .await
    }

    pub async fn update_task(
        &self,
        list_id: Uuid,
        task_id: Uuid,
        patch: &TaskPatch,
    ) -> Result<(), ClientError> {
        let path = format!("/lists/{}/tasks/{}", list_id, task_id);
        let body = encode_body(patch)?;
        self.send(Method::PATCH, &path, Some(&body)).await?;
        Ok(())
    }

    pub async fn delete_task(&self, list_id: Uuid, task_id: Uuid) -> Result<Task, ClientError> {
        let path = format!("/lists/{}/tasks/{}", list_id, task_id);
        self.send_json(Method::DELETE, &path, None).await
    }
}

async fn request_access_token(
    http: &Client,
    url: &str,
    user_id: Uuid,
    refresh_token: &str,
) -> Result<String, RefreshError> {
    let response = http
        .get(url)
        .header(USER_ID_HEADER, user_id.to_string())
        .header(REFRESH_TOKEN_HEADER, refresh_token)
        .send()
        .await
        .map_err(|e| RefreshError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        return Err(RefreshError::Rejected(response.status().as_u16()));
    }

    let body: AccessTokenResponse = response
        .json()
        .await
        .map_err(|_| RefreshError::MissingToken)?;
    if body.access_token.is_empty() {
        return Err(RefreshError::MissingToken);
    }
    Ok(body.access_token)
}

async fn error_for_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

fn header_value(headers: &HeaderMap, name: &'static str) -> Result<String, ClientError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(ClientError::MissingHeader(name))
}

/// Stores `token` only while `credentials` still belong to the session that was refreshed.
fn store_refreshed_token(
    credentials: &RwLock<Credentials>,
    used_refresh_token: &str,
    token: &str,
) -> bool {
    let mut credentials = credentials.write().unwrap_or_else(PoisonError::into_inner);
    if credentials.refresh_token.as_deref() != Some(used_refresh_token) {
        return false;
    }
    credentials.access_token = Some(token.to_string());
    true
}

fn encode_body<T: Serialize>(value: &T) -> Result<Value, ClientError> {
    Ok(serde_json::to_value(value)?)
}
