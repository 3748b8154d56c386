use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::api::AppState;

pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "exercise-runner",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.backend.kind().to_string()
    })))
}
