// src/evaluator/node.rs

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::SandboxConfig;
use crate::evaluator::{harness, Capabilities, Evaluation, Evaluator, Fault, ASSERTION_ERROR_NAME};

/// File the driver writes its single outcome to, inside the private working directory.
const REPORT_FILE: &str = "report.json";

/// How long the child keeps its event loop alive after reporting.
const GRACE_MS: u64 = 50;

/// Runs each program in its own `node` process.
///
/// The program is compiled inside a fresh `vm` context whose global object
/// starts empty, with string code generation and wasm disabled and no
/// dynamic `import()` loader. The capability objects are built inside that
/// context too, so nothing reachable from the program belongs to the host
/// realm. The child gets an empty environment and a private temporary
/// working directory that is removed afterwards. It is killed when the
/// evaluation future is dropped (for example on timeout).
///
/// The outcome is written once to a file in the working directory. Standard
/// output is discarded, so nothing the program prints can stand in for it.
#[derive(Debug, Clone)]
pub struct NodeEvaluator {
    binary: String,
    args: Vec<String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Report {
    ok: bool,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl NodeEvaluator {
    pub fn new(binary: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
        }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(config.node_binary.clone(), config.node_args.clone())
    }
}

impl Evaluator for NodeEvaluator {
    async fn evaluate(&self, source: &str, capabilities: &Capabilities) -> Result<Evaluation, Fault> {
        let workdir = tempfile::tempdir()
            .map_err(|e| Fault::Isolation(format!("failed to create working directory: {}", e)))?;
        let report_path = workdir.path().join(REPORT_FILE);
        let script = driver_script(source, capabilities, &report_path)?;

        let start = Instant::now();
        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .arg("-")
            .env_clear()
            // PATH only, so a bare `node` still resolves.
            .env("PATH", std::env::var_os("PATH").unwrap_or_default())
            .current_dir(workdir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Fault::Isolation(format!("failed to start {}: {}", self.binary, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script.as_bytes())
                .await
                .map_err(|e| Fault::Isolation(format!("failed to send program: {}", e)))?;
            // Close stdin so node starts running the script.
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Fault::Isolation(format!("failed to wait for node: {}", e)))?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let report = match tokio::fs::read_to_string(&report_path).await {
            Ok(raw) => parse_report(&raw),
            Err(e) => {
                log::debug!("no report at {}: {}", report_path.display(), e);
                None
            }
        };
        let Some(report) = report else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!(
                "node exited with {} without a usable report: {}",
                output.status,
                stderr.trim()
            );
            return Err(Fault::Isolation(format!(
                "evaluation process exited with {} without reporting a result",
                output.status
            )));
        };

        report_to_outcome(report).map(|()| Evaluation { elapsed_ms })
    }
}

/// Builds the host-side script fed to node on stdin.
///
/// The submitted program is compiled with `vm.compileFunction` as a function
/// body whose parameters are the capability bindings, the same shape the
/// embedded backend uses. Syntax errors surface from the compile step and
/// are reported like any other fault. Errors are classified by name, since
/// they come from another realm.
fn driver_script(
    source: &str,
    capabilities: &Capabilities,
    report_path: &Path,
) -> Result<String, Fault> {
    let report_path = report_path
        .to_str()
        .ok_or_else(|| Fault::Isolation("working directory is not valid UTF-8".to_string()))?;
    let factories: Vec<String> = capabilities
        .iter()
        .map(|capability| harness::capability_factory(*capability))
        .collect();

    Ok(format!(
        r#""use strict";
const fs = require("fs");
const vm = require("vm");
process.on("unhandledRejection", () => {{}});
const describe = (e) => {{
  try {{
    if (Object.prototype.toString.call(e) === "[object Error]") {{
      const name = String(e.name);
      const message = String(e.message);
      if (name === "{assertion}") return {{ ok: false, kind: "assertion", message }};
      if (name === "SyntaxError") return {{ ok: false, kind: "syntax", message: name + ": " + message }};
      if (name === "RangeError" && /call stack/i.test(message)) return {{ ok: false, kind: "resource_limit", message }};
      return {{ ok: false, kind: "runtime", message: name + ": " + message }};
    }}
    return {{ ok: false, kind: "runtime", message: "Uncaught " + String(e) }};
  }} catch (_) {{
    return {{ ok: false, kind: "runtime", message: "Uncaught exception" }};
  }}
}};
let outcome;
try {{
  const context = vm.createContext(Object.create(null), {{
    codeGeneration: {{ strings: false, wasm: false }},
  }});
  const bindings = {factories}.map((factory) => vm.runInContext(factory, context));
  const program = vm.compileFunction({source}, {params}, {{
    parsingContext: context,
    filename: "submission.js",
  }});
  program(...bindings);
  outcome = {{ ok: true }};
}} catch (e) {{
  outcome = describe(e);
}}
fs.writeFileSync({report}, JSON.stringify(outcome), {{ flag: "wx" }});
setTimeout(() => process.exit(0), {grace});
"#,
        assertion = ASSERTION_ERROR_NAME,
        factories = harness::encode(&factories)?,
        source = harness::encode(source)?,
        params = harness::encode(&harness::parameter_names(capabilities))?,
        report = harness::encode(report_path)?,
        grace = GRACE_MS,
    ))
}

/// Accepts exactly one JSON report; anything else is treated as no report.
fn parse_report(raw: &str) -> Option<Report> {
    serde_json::from_str(raw.trim()).ok()
}

fn report_to_outcome(report: Report) -> Result<(), Fault> {
    if report.ok {
        return Ok(());
    }

    let message = report.message.unwrap_or_default();
    Err(match report.kind.as_deref() {
        Some("assertion") => Fault::Assertion(message),
        Some("syntax") => Fault::Syntax(message),
        Some("resource_limit") => Fault::ResourceLimit(message),
        _ => Fault::Runtime(message),
    })
}
