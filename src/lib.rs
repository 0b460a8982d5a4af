#![doc = "The `task_manager` library crate."]
#![doc = ""]
#![doc = "Server side: domain models, storage, the authentication and session core, routing,"]
#![doc = "and error handling used by the binary (`main.rs`) to run the API."]
#![doc = "Client side: `client::ApiClient`, which refreshes expired access tokens transparently."]

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;

pub use crate::config::Config;
pub use crate::error::AppError;
pub use crate::state::AppState;
