pub mod health;
pub mod lists;
pub mod tasks;
pub mod users;

use actix_cors::Cors;
use actix_web::{http::Method, web};

use crate::auth::{
    AccessTokenGuard, SessionGuard, ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER, USER_ID_HEADER,
};
use crate::error::AppError;

/// Path of the task listing that may be served without an access token.
pub const TASK_LISTING_PATTERN: &str = "/lists/{list_id}/tasks";

/// Registers every endpoint with its guard.
///
/// With `protect_task_listing` off, `GET /lists/{list_id}/tasks` is reachable anonymously.
pub fn config(cfg: &mut web::ServiceConfig, protect_task_listing: bool) {
    let mut list_guard = AccessTokenGuard::new();
    if !protect_task_listing {
        list_guard = list_guard.allow_anonymous(Method::GET, TASK_LISTING_PATTERN);
    }

    cfg.app_data(json_config())
        .app_data(path_config())
        .service(health::health)
        .service(
            web::scope("/users")
                .service(users::signup)
                .service(users::login)
                .service(
                    web::scope("/me")
                        .wrap(SessionGuard)
                        .service(users::renew_access_token)
                        .service(users::logout),
                ),
        )
        .service(
            web::scope("/lists")
                .wrap(list_guard)
                .service(lists::get_lists)
                .service(lists::create_list)
                .service(lists::update_list)
                .service(lists::delete_list)
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}

/// Malformed or incomplete JSON bodies are validation errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid request body: {}", err)).into()
    })
}

/// A path segment that does not parse as an id names no resource.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        log::debug!("Unparseable path: {}", err);
        AppError::NotFound("Resource not found".into()).into()
    })
}

/// CORS policy for browser clients: auth headers allowed in, tokens exposed out.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec![
            Method::GET,
            Method::POST,
            Method::HEAD,
            Method::OPTIONS,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allowed_headers(vec![
            "origin",
            "x-requested-with",
            "content-type",
            "accept",
            ACCESS_TOKEN_HEADER,
            REFRESH_TOKEN_HEADER,
            USER_ID_HEADER,
        ])
        .expose_headers(vec![ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER])
        .max_age(3600)
}
