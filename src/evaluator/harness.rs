// src/evaluator/harness.rs
//
// JavaScript shared by both backends: the capability objects and the way a
// submission is compiled. Both compile the program as a function body whose
// parameters are the capability bindings, so the two accept the same programs.

use serde::Serialize;

use crate::evaluator::{Capabilities, Capability, Fault, ASSERTION_ERROR_NAME};

/// An expression evaluating to the frozen `assert` object. The error class
/// lives in a closure so the program cannot replace it.
pub fn assert_factory() -> String {
    format!(
        r#"(() => {{
  class {name} extends Error {{
    constructor(message) {{ super(message); this.name = "{name}"; }}
  }}
  const render = (v) => typeof v === "string" ? JSON.stringify(v) : String(v);
  return Object.freeze({{
    strictEqual(actual, expected, message) {{
      if (actual === expected) return;
      throw new {name}(message !== undefined
        ? String(message)
        : "expected " + render(expected) + " but got " + render(actual));
    }},
  }});
}})()"#,
        name = ASSERTION_ERROR_NAME
    )
}

/// The expression that builds the value bound to `capability`.
pub fn capability_factory(capability: Capability) -> String {
    match capability {
        Capability::Assert => assert_factory(),
    }
}

/// Parameter names, in the order the capability values are passed.
pub fn parameter_names(capabilities: &Capabilities) -> Vec<&'static str> {
    capabilities.iter().map(Capability::binding).collect()
}

/// `new Function(<params>, <source>)`, with every piece JSON-encoded.
pub fn compile_expression(source: &str, capabilities: &Capabilities) -> Result<String, Fault> {
    let mut args = parameter_names(capabilities)
        .into_iter()
        .map(|name| encode(name))
        .collect::<Result<Vec<_>, _>>()?;
    args.push(encode(source)?);
    Ok(format!("new Function({})", args.join(", ")))
}

/// Renders `value` as a JavaScript literal.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, Fault> {
    serde_json::to_string(value)
        .map_err(|e| Fault::Isolation(format!("failed to encode program: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_expression_binds_capabilities() {
        assert_eq!(
            compile_expression("return 1;", &Capabilities::standard()).unwrap(),
            r#"new Function("assert", "return 1;")"#
        );
        assert_eq!(
            compile_expression("let s = \"x\";", &Capabilities::none()).unwrap(),
            r#"new Function("let s = \"x\";")"#
        );
    }

    #[test]
    fn test_assert_factory_names_its_error() {
        let factory = assert_factory();
        assert!(factory.contains(r#"this.name = "AssertionError""#));
        assert!(factory.contains("Object.freeze"));
    }
}
