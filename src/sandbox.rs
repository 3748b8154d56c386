// src/sandbox.rs
use crate::config::SandboxConfig;
use crate::evaluator::{Capabilities, Evaluator, Fault};
use crate::models::{ExecutionRequest, ExecutionResult};
use futures::future;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Budget and size ceiling applied to every submission.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionLimits {
    pub timeout: Duration,
    pub max_source_bytes: usize,
}

impl ExecutionLimits {
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            max_source_bytes: config.max_source_bytes,
        }
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self::from_config(&SandboxConfig::default())
    }
}

/// Runs one submission: student code, then test code, as a single program
/// with only `assert` in scope. Never fails; every fault becomes a failed result.
pub async fn execute<E: Evaluator>(
    evaluator: &E,
    limits: &ExecutionLimits,
    request: &ExecutionRequest,
) -> ExecutionResult {
    let id = Uuid::new_v4();
    let start = Instant::now();
    let source = request.combined_source();

    log::info!("Execution {} received ({} bytes)", id, source.len());

    let outcome = evaluate_within_limits(evaluator, limits, &source).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(()) => {
            log::info!("Execution {} passed in {}ms", id, elapsed_ms);
            ExecutionResult::passed()
        }
        Err(fault) => {
            match &fault {
                Fault::Isolation(message) => {
                    log::error!("Execution {} could not be evaluated: {}", id, message)
                }
                other => log::warn!(
                    "Execution {} failed with {} fault in {}ms",
                    id,
                    other.kind(),
                    elapsed_ms
                ),
            }
            ExecutionResult::failed(&fault)
        }
    }
}

async fn evaluate_within_limits<E: Evaluator>(
    evaluator: &E,
    limits: &ExecutionLimits,
    source: &str,
) -> Result<(), Fault> {
    if source.len() > limits.max_source_bytes {
        return Err(Fault::SourceTooLarge {
            size: source.len(),
            limit: limits.max_source_bytes,
        });
    }

    let capabilities = Capabilities::standard();
    match tokio::time::timeout(limits.timeout, evaluator.evaluate(source, &capabilities)).await {
        Ok(result) => result.map(|_| ()),
        Err(_) => Err(Fault::Timeout(limits.timeout)),
    }
}

/// Runs several submissions concurrently. Results keep the request order.
pub async fn execute_batch<E: Evaluator>(
    evaluator: &E,
    limits: &ExecutionLimits,
    requests: &[ExecutionRequest],
) -> Vec<ExecutionResult> {
    let batch_start = Instant::now();

    let futures: Vec<_> = requests
        .iter()
        .map(|request| execute(evaluator, limits, request))
        .collect();
    let results = future::join_all(futures).await;

    log::info!(
        "Batch of {} executions completed in {}ms",
        requests.len(),
        batch_start.elapsed().as_millis()
    );

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::embedded::EngineLimits;
    use crate::evaluator::EmbeddedEvaluator;
    use crate::models::{FAILURE_MARKER, SUCCESS_MESSAGE};

    fn limits() -> ExecutionLimits {
        ExecutionLimits::default()
    }

    #[tokio::test]
    async fn test_passing_submission() {
        let result = execute(
            &EmbeddedEvaluator::default(),
            &limits(),
            &ExecutionRequest::new(
                "function add(a,b){return a+b;}",
                "assert.strictEqual(add(2,3), 5);",
            ),
        )
        .await;

        assert!(result.success());
        assert_eq!(result.output(), Some(SUCCESS_MESSAGE));
        assert_eq!(result.error(), None);
    }

    #[tokio::test]
    async fn test_failing_assertion() {
        let result = execute(
            &EmbeddedEvaluator::default(),
            &limits(),
            &ExecutionRequest::new(
                "function add(a,b){return a-b;}",
                "assert.strictEqual(add(2,3), 5);",
            ),
        )
        .await;

        assert!(!result.success());
        assert_eq!(result.output(), None);
        let error = result.error().unwrap();
        assert!(error.starts_with(FAILURE_MARKER));
        assert!(error.contains("expected 5 but got -1"), "{error}");
    }

    #[tokio::test]
    async fn test_syntax_error_is_a_result() {
        let result = execute(
            &EmbeddedEvaluator::default(),
            &limits(),
            &ExecutionRequest::new("function broken(", "assert.strictEqual(1, 1);"),
        )
        .await;

        assert!(!result.success());
        assert!(result.error().is_some());
    }

    #[tokio::test]
    async fn test_student_code_runs_before_tests() {
        let evaluator = EmbeddedEvaluator::default();
        let student = "function add(a,b){return a+b;}";
        let test = "assert.strictEqual(add(2,3), 5);";

        let in_order = execute(&evaluator, &limits(), &ExecutionRequest::new(student, test)).await;
        assert!(in_order.success());

        // Calls placed before a `let` binding hit the temporal dead zone.
        let reversed = execute(
            &evaluator,
            &limits(),
            &ExecutionRequest::new(test, "let add = (a, b) => a + b;"),
        )
        .await;
        assert!(!reversed.success());
    }

    #[tokio::test]
    async fn test_empty_submission_passes() {
        let result = execute(
            &EmbeddedEvaluator::default(),
            &limits(),
            &ExecutionRequest::new("", ""),
        )
        .await;
        assert!(result.success());
    }

    #[tokio::test]
    async fn test_oversized_submission_is_rejected() {
        let limits = ExecutionLimits {
            max_source_bytes: 16,
            ..limits()
        };
        let result = execute(
            &EmbeddedEvaluator::default(),
            &limits,
            &ExecutionRequest::new("const padding = 'xxxxxxxxxxxxxxxx';", ""),
        )
        .await;

        assert!(!result.success());
        assert!(result.error().unwrap().contains("the limit is 16 bytes"));
    }

    #[tokio::test]
    async fn test_runaway_loop_becomes_timeout_failure() {
        let limits = ExecutionLimits {
            timeout: Duration::from_millis(200),
            ..limits()
        };
        let evaluator = EmbeddedEvaluator::new(EngineLimits {
            timeout: Duration::from_millis(200),
            ..EngineLimits::default()
        });
        let request = ExecutionRequest::new(
            "function spin() { for (;;) { for (let i = 0; i < 1000000; i++) {} } }",
            "spin();\nassert.strictEqual(1, 1);",
        );

        let result = execute(&evaluator, &limits, &request).await;
        assert!(!result.success());
        assert!(result.error().unwrap().contains("timed out after 200ms"));
    }

    #[tokio::test]
    async fn test_engine_stops_runaway_loop_without_outer_timer() {
        // The outer budget is far away, so only the engine can end the run.
        let limits = ExecutionLimits {
            timeout: Duration::from_secs(30),
            ..limits()
        };
        let evaluator = EmbeddedEvaluator::new(EngineLimits {
            timeout: Duration::from_millis(200),
            ..EngineLimits::default()
        });

        let start = Instant::now();
        let result = execute(
            &evaluator,
            &limits,
            &ExecutionRequest::new("for (;;) { for (let i = 0; i < 1000000; i++) {} }", ""),
        )
        .await;

        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(!result.success());
        assert!(result.error().unwrap().contains("timed out after 200ms"));
    }

    #[tokio::test]
    async fn test_concurrent_submissions_do_not_share_bindings() {
        let evaluator = EmbeddedEvaluator::default();
        let requests = vec![
            ExecutionRequest::new(
                "function answer() { return 1; }",
                "assert.strictEqual(answer(), 1);",
            ),
            ExecutionRequest::new(
                "function answer() { return 2; }",
                "assert.strictEqual(answer(), 2);",
            ),
            ExecutionRequest::new(
                "function answer() { return 3; }",
                "assert.strictEqual(answer(), 1);",
            ),
        ];

        let results = execute_batch(&evaluator, &limits(), &requests).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].success());
        assert!(results[1].success());
        assert!(!results[2].success());
        assert!(results[2].error().unwrap().contains("expected 1 but got 3"));
    }
}
