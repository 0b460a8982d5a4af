use actix_web::{middleware::Logger, App, HttpServer};
use std::io;

use task_manager::{db, routes, AppState, Config};

fn startup_error(err: task_manager::AppError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(startup_error)?;
    let store = db::open(&config).await.map_err(startup_error)?;
    let state = AppState::new(&config, store.clone());

    log::info!("Starting task manager server at {}", config.server_url());
    let server = HttpServer::new(move || {
        App::new()
            .wrap(routes::cors())
            .wrap(Logger::default())
            .configure(|cfg| state.configure(cfg))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run();

    let result = server.await;

    store.close().await;
    log::info!("Storage closed, shutting down");
    result
}
