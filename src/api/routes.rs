// src/api/routes.rs
use actix_web::http::Method;
use actix_web::middleware::DefaultHeaders;
use actix_web::{error, web, HttpResponse};
use serde_json::json;

use super::handlers;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .route("/health", web::method(Method::OPTIONS).to(handlers::preflight))
            .service(
                web::scope("/execute")
                    .route("", web::post().to(handlers::execute))
                    .route("", web::method(Method::OPTIONS).to(handlers::preflight))
                    .route("/batch", web::post().to(handlers::execute_batch))
                    .route("/batch", web::method(Method::OPTIONS).to(handlers::preflight)),
            ),
    );
}

/// CORS headers attached to every response, including errors and preflights.
pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", ALLOW_ORIGIN))
        .add(("Access-Control-Allow-Headers", ALLOW_HEADERS))
}

/// Body extractor settings: size cap and a JSON error body for malformed input.
pub fn json_config(max_body_bytes: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(max_body_bytes)
        .error_handler(|err, _req| {
            let message = err.to_string();
            log::warn!("Rejected request body: {}", message);
            error::InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(json!({ "error": message })),
            )
            .into()
        })
}
