// src/models.rs
use crate::evaluator::Fault;
use serde::{Deserialize, Serialize};

pub const SUCCESS_MESSAGE: &str = "✅ All tests passed.";
pub const FAILURE_MARKER: &str = "❌";

/// A submission: the student's solution and the exercise's test script.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub student_code: String,
    pub test_code: String,
}

impl ExecutionRequest {
    pub fn new(student_code: impl Into<String>, test_code: impl Into<String>) -> Self {
        Self {
            student_code: student_code.into(),
            test_code: test_code.into(),
        }
    }

    /// Student code first so its definitions are in scope for the tests.
    pub fn combined_source(&self) -> String {
        format!("{}\n{}", self.student_code, self.test_code)
    }
}

/// Outcome of one submission. Exactly one of `output` and `error` is set.
/// Built only through `passed` and `failed`; never read back from the wire.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    success: bool,
    output: Option<String>,
    error: Option<String>,
}

impl ExecutionResult {
    pub fn passed() -> Self {
        Self {
            success: true,
            output: Some(SUCCESS_MESSAGE.to_string()),
            error: None,
        }
    }

    pub fn failed(fault: &Fault) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(format!("{} Test failed: {}", FAILURE_MARKER, fault)),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
