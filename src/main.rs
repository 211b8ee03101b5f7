use actix_web::{middleware, web, App, HttpServer};
use log::{error, info, warn};
use std::env;
use std::io;
use std::path::Path;

use asset_depot::api;
use asset_depot::app_state::AppState;
use asset_depot::config::AppConfig;

const DEFAULT_LOG_CONFIG: &str = "server_log.yaml";

fn init_logging() {
    let log_config = env::var("LOG_CONFIG").unwrap_or_else(|_| DEFAULT_LOG_CONFIG.to_string());
    if Path::new(&log_config).exists() {
        match log4rs::init_file(&log_config, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("Failed to load {}: {}, falling back to env_logger", log_config, e),
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    init_logging();

    let config = AppConfig::load().map_err(|e| {
        error!("Refusing to start: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;
    let state = AppState::from_config(config.clone())?;

    match state.staging_sweeper() {
        Some(sweeper) => {
            actix_web::rt::spawn(sweeper.run());
        }
        None => warn!("Staging sweeper disabled"),
    }

    let bind = (config.server.host.clone(), config.server.port);
    info!("Starting server on {}:{}", bind.0, bind.1);

    let data = web::Data::new(state.clone());
    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(api::cors(&state.config.cors))
            .wrap(middleware::Logger::default())
            .app_data(data.clone())
            .configure(|cfg| api::configure(cfg, &state))
    })
    .workers(config.server.workers)
    .bind(bind)?
    .run()
    .await
}
