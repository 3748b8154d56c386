// src/evaluator/embedded.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rquickjs::convert::Coerced;
use rquickjs::function::Rest;
use rquickjs::{CatchResultExt, CaughtError, Context, Function, Runtime, Value};

use crate::config::SandboxConfig;
use crate::evaluator::{harness, Capabilities, Evaluation, Evaluator, Fault, ASSERTION_ERROR_NAME};

/// Runs programs on an in-process JavaScript engine.
///
/// Each call gets its own runtime and context on a blocking worker thread,
/// both dropped when the program finishes. The context has the ECMAScript
/// built-ins only: no console, timers, module loader, filesystem or network.
/// An interrupt handler aborts the program once its budget is spent, so the
/// worker thread is released even when nobody is waiting for it any more.
#[derive(Debug, Clone)]
pub struct EmbeddedEvaluator {
    limits: EngineLimits,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineLimits {
    pub timeout: Duration,
    pub memory_bytes: usize,
    pub stack_bytes: usize,
}

impl EngineLimits {
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            memory_bytes: config.memory_limit_bytes,
            stack_bytes: config.stack_size_limit,
        }
    }
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self::from_config(&SandboxConfig::default())
    }
}

impl EmbeddedEvaluator {
    pub fn new(limits: EngineLimits) -> Self {
        Self { limits }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(EngineLimits::from_config(config))
    }
}

impl Default for EmbeddedEvaluator {
    fn default() -> Self {
        Self::new(EngineLimits::default())
    }
}

impl Evaluator for EmbeddedEvaluator {
    async fn evaluate(&self, source: &str, capabilities: &Capabilities) -> Result<Evaluation, Fault> {
        let source = source.to_owned();
        let capabilities = capabilities.clone();
        let limits = self.limits;

        let start = Instant::now();
        tokio::task::spawn_blocking(move || run_program(&source, &capabilities, limits))
            .await
            .map_err(|e| Fault::Isolation(format!("evaluation worker failed: {}", e)))??;

        Ok(Evaluation {
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Compiles `source` as a function body and calls it with the capability
/// values, in a brand-new runtime.
fn run_program(source: &str, capabilities: &Capabilities, limits: EngineLimits) -> Result<(), Fault> {
    let runtime = Runtime::new()
        .map_err(|e| Fault::Isolation(format!("failed to start engine: {}", e)))?;
    runtime.set_memory_limit(limits.memory_bytes);
    runtime.set_max_stack_size(limits.stack_bytes);

    let deadline = Instant::now() + limits.timeout;
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    runtime.set_interrupt_handler(Some(Box::new(move || {
        let expired = Instant::now() >= deadline;
        if expired {
            flag.store(true, Ordering::Relaxed);
        }
        expired
    })));

    let context = Context::full(&runtime)
        .map_err(|e| Fault::Isolation(format!("failed to create context: {}", e)))?;

    let factories: Vec<String> = capabilities
        .iter()
        .map(|capability| harness::capability_factory(*capability))
        .collect();
    let compile = harness::compile_expression(source, capabilities)?;

    context.with(|ctx| {
        let mut bindings: Vec<Value<'_>> = Vec::with_capacity(factories.len());
        for factory in &factories {
            let value: Value<'_> = ctx
                .eval(factory.as_str())
                .catch(&ctx)
                .map_err(|e| Fault::Isolation(format!("failed to install capabilities: {}", e)))?;
            bindings.push(value);
        }

        let program: Function<'_> = ctx
            .eval(compile.as_str())
            .catch(&ctx)
            .map_err(|e| classify(e, interrupted.load(Ordering::Relaxed), limits.timeout))?;
        program
            .call::<_, Value<'_>>((Rest(bindings),))
            .catch(&ctx)
            .map(|_| ())
            .map_err(|e| classify(e, interrupted.load(Ordering::Relaxed), limits.timeout))
    })
}

/// Maps whatever stopped the program onto the fault taxonomy.
fn classify(error: CaughtError<'_>, interrupted: bool, budget: Duration) -> Fault {
    if interrupted {
        return Fault::Timeout(budget);
    }

    match error {
        CaughtError::Exception(exception) => {
            let name = exception
                .as_object()
                .get::<_, String>("name")
                .unwrap_or_default();
            let message = exception.message().unwrap_or_default();
            let described = if name.is_empty() {
                message.clone()
            } else {
                format!("{}: {}", name, message)
            };

            match name.as_str() {
                ASSERTION_ERROR_NAME => Fault::Assertion(message),
                "SyntaxError" => Fault::Syntax(described),
                "InternalError" | "RangeError" if is_engine_limit(&message) => {
                    Fault::ResourceLimit(message)
                }
                _ => Fault::Runtime(described),
            }
        }
        // `throw "boom"` and friends.
        CaughtError::Value(value) => {
            let rendered = value
                .get::<Coerced<String>>()
                .map(|coerced| coerced.0)
                .unwrap_or_else(|_| format!("{:?}", value.type_of()));
            Fault::Runtime(format!("Uncaught {}", rendered))
        }
        CaughtError::Error(rquickjs::Error::Allocation) => {
            Fault::ResourceLimit("out of memory".to_string())
        }
        CaughtError::Error(e) => Fault::Isolation(e.to_string()),
    }
}

fn is_engine_limit(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("stack overflow")
        || message.contains("call stack")
        || message.contains("out of memory")
}
