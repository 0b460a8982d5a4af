use actix_web::web;
use std::sync::Arc;

use crate::auth::{Accounts, SessionManager, TokenService};
use crate::config::Config;
use crate::db::Store;
use crate::routes;

/// Everything handlers and guards pull from `app_data`, built once per process.
#[derive(Clone)]
pub struct AppState {
    pub store: web::Data<dyn Store>,
    pub tokens: web::Data<TokenService>,
    pub sessions: web::Data<SessionManager>,
    pub accounts: web::Data<Accounts>,
    protect_task_listing: bool,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn Store>) -> Self {
        let tokens = TokenService::from_config(config);
        let sessions =
            SessionManager::new(Arc::clone(&store), tokens.clone(), config.max_sessions_per_user);
        let accounts = Accounts::new(Arc::clone(&store), config.password_cost);

        Self {
            store: web::Data::from(store),
            tokens: web::Data::new(tokens),
            sessions: web::Data::new(sessions),
            accounts: web::Data::new(accounts),
            protect_task_listing: config.protect_task_listing,
        }
    }

    /// Registers shared state and every route on an `App` or scope.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.store.clone())
            .app_data(self.tokens.clone())
            .app_data(self.sessions.clone())
            .app_data(self.accounts.clone());
        routes::config(cfg, self.protect_task_listing);
    }
}
