// src/api/handlers/execute.rs
use actix_web::{web, HttpResponse, Result};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::AppState;
use crate::errors::EvalError;
use crate::models::{ExecutionRequest, ExecutionResult};
use crate::sandbox;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchExecutionResponse {
    pub batch_id: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub completed_at: String,
    pub results: Vec<ExecutionResult>,
}

/// Caught faults are still a 200; the outcome lives in the body.
pub async fn execute(
    state: web::Data<AppState>,
    req: web::Json<ExecutionRequest>,
) -> Result<HttpResponse> {
    let result = sandbox::execute(state.backend.as_ref(), &state.limits, &req.into_inner()).await;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn execute_batch(
    state: web::Data<AppState>,
    req: web::Json<Vec<ExecutionRequest>>,
) -> Result<HttpResponse> {
    let requests = req.into_inner();
    let limit = state.config.sandbox.max_batch;

    if requests.len() > limit {
        let error = EvalError::BatchTooLarge {
            size: requests.len(),
            limit,
        };
        log::warn!("{}", error);
        return Ok(HttpResponse::BadRequest().json(json!({ "error": error.to_string() })));
    }

    let results = sandbox::execute_batch(state.backend.as_ref(), &state.limits, &requests).await;
    let passed = results.iter().filter(|r| r.success()).count();

    Ok(HttpResponse::Ok().json(BatchExecutionResponse {
        batch_id: Uuid::new_v4().to_string(),
        total: results.len(),
        passed,
        failed: results.len() - passed,
        completed_at: chrono::Utc::now().to_rfc3339(),
        results,
    }))
}

/// CORS preflight: headers come from the default-headers middleware.
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}
