//! HTTP surface: routes, CORS and static asset serving

pub mod auth;
pub mod handlers;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::web;
use log::info;

use crate::app_state::AppState;
use crate::config::{CorsConfig, StorageBackend};

/// Register every route. The delete route is method-guarded, so `GET`s for
/// the same paths fall through to the static file service.
pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(web::PayloadConfig::default().limit(state.config.server.max_body_bytes))
        .route("/healthz", web::get().to(handlers::healthz))
        .route("/upload", web::post().to(handlers::upload_image))
        .route("/garbage-collect", web::post().to(handlers::garbage_collect))
        .route("/images/{image_name}", web::delete().to(handlers::delete_image));

    if state.config.storage.backend == StorageBackend::Local {
        cfg.service(Files::new("/images", state.config.storage.base_dir()));
    }
}

pub fn cors(config: &CorsConfig) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600);

    let origins = config.allowed_origins.trim();
    if origins == "*" {
        return cors.allow_any_origin();
    }

    origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .fold(cors, |cors, origin| {
            info!("Allowing cross-origin requests from {}", origin);
            cors.allowed_origin(origin)
        })
}
