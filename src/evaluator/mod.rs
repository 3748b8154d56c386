// src/evaluator/mod.rs

use std::time::Duration;

use thiserror::Error;

use crate::config::{BackendKind, SandboxConfig};

pub mod embedded;
pub mod harness;
pub mod node;

pub use embedded::EmbeddedEvaluator;
pub use node::NodeEvaluator;

/// Name under which assertion failures are thrown inside the evaluated program.
pub const ASSERTION_ERROR_NAME: &str = "AssertionError";

/// Everything that can stop a submission from passing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    #[error("{0}")]
    Syntax(String),

    #[error("{0}")]
    Runtime(String),

    #[error("{0}")]
    Assertion(String),

    #[error("execution timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    #[error("submission is {size} bytes, the limit is {limit} bytes")]
    SourceTooLarge { size: usize, limit: usize },

    #[error("sandbox error: {0}")]
    Isolation(String),
}

impl Fault {
    pub fn kind(&self) -> &'static str {
        match self {
            Fault::Syntax(_) => "syntax",
            Fault::Runtime(_) => "runtime",
            Fault::Assertion(_) => "assertion",
            Fault::Timeout(_) => "timeout",
            Fault::ResourceLimit(_) => "resource_limit",
            Fault::SourceTooLarge { .. } => "source_too_large",
            Fault::Isolation(_) => "isolation",
        }
    }
}

/// A capability handed to the evaluated program as a global binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// `assert.strictEqual(actual, expected, message?)`
    Assert,
}

impl Capability {
    pub fn binding(&self) -> &'static str {
        match self {
            Capability::Assert => "assert",
        }
    }
}

/// The explicit set of bindings visible to evaluated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities(Vec<Capability>);

impl Capabilities {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// The table every exercise runs with: only `assert`.
    pub fn standard() -> Self {
        Self(vec![Capability::Assert])
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.0.iter()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::standard()
    }
}

/// What a completed evaluation reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub elapsed_ms: u64,
}

/// A common trait for the backends that run submitted programs.
///
/// Implementations must give every call a fresh evaluation context and must
/// report every failure of the program as a `Fault` rather than panicking.
/// The caller also enforces the wall-clock budget by dropping the future, so
/// a backend must stop its work when that happens.
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        source: &str,
        capabilities: &Capabilities,
    ) -> impl std::future::Future<Output = Result<Evaluation, Fault>> + Send;
}

/// The backend chosen at startup.
#[derive(Debug, Clone)]
pub enum Backend {
    Embedded(EmbeddedEvaluator),
    Node(NodeEvaluator),
}

impl Backend {
    pub fn from_config(config: &SandboxConfig) -> Self {
        match config.backend {
            BackendKind::Embedded => Backend::Embedded(EmbeddedEvaluator::from_config(config)),
            BackendKind::Node => Backend::Node(NodeEvaluator::from_config(config)),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Embedded(_) => BackendKind::Embedded,
            Backend::Node(_) => BackendKind::Node,
        }
    }
}

impl Evaluator for Backend {
    async fn evaluate(&self, source: &str, capabilities: &Capabilities) -> Result<Evaluation, Fault> {
        match self {
            Backend::Embedded(evaluator) => evaluator.evaluate(source, capabilities).await,
            Backend::Node(evaluator) => evaluator.evaluate(source, capabilities).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_capabilities_only_expose_assert() {
        let caps = Capabilities::standard();
        let bindings: Vec<_> = caps.iter().map(Capability::binding).collect();
        assert_eq!(bindings, vec!["assert"]);
        assert!(!Capabilities::none().contains(Capability::Assert));
    }

    #[test]
    fn test_fault_messages() {
        assert_eq!(
            Fault::Timeout(Duration::from_millis(2000)).to_string(),
            "execution timed out after 2000ms"
        );
        assert_eq!(
            Fault::Assertion("expected 5 but got -1".to_string()).to_string(),
            "expected 5 but got -1"
        );
        assert_eq!(Fault::SourceTooLarge { size: 10, limit: 5 }.kind(), "source_too_large");
    }

    #[test]
    fn test_backend_follows_config() {
        let mut config = SandboxConfig::default();
        assert_eq!(Backend::from_config(&config).kind(), BackendKind::Embedded);

        config.backend = BackendKind::Node;
        assert_eq!(Backend::from_config(&config).kind(), BackendKind::Node);
    }
}
