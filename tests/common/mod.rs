#![allow(dead_code)]

use actix_web::{dev::ServiceResponse, test};
use serde_json::json;
use std::sync::Arc;
use task_manager::auth::{ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER};
use task_manager::db::MemoryStore;
use task_manager::{AppState, Config};

pub const TEST_SECRET: &str = "integration_test_secret";

// Helper struct to hold auth details
pub struct TestUser {
    pub id: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub fn test_config() -> Config {
    Config::for_secret(TEST_SECRET)
}

pub fn test_state(config: &Config) -> AppState {
    AppState::new(config, Arc::new(MemoryStore::new()))
}

pub fn header(resp: &ServiceResponse, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub async fn signup_user(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse,
        Error = actix_web::Error,
    >,
    email: &str,
    password: &str,
) -> Result<TestUser, String> {
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();

    let access_token = header(&resp, ACCESS_TOKEN_HEADER);
    let refresh_token = header(&resp, REFRESH_TOKEN_HEADER);
    let body = test::read_body(resp).await;

    if !status.is_success() {
        return Err(format!(
            "Failed to sign up. Status: {}. Body: {}",
            status,
            String::from_utf8_lossy(&body)
        ));
    }

    let user: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| format!("Failed to parse signup response: {}", e))?;

    Ok(TestUser {
        id: user["_id"].as_str().unwrap_or_default().to_string(),
        access_token: access_token.ok_or("missing x-access-token")?,
        refresh_token: refresh_token.ok_or("missing x-refresh-token")?,
    })
}
