use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use iceos_error::IceError;
use iceos_execution::{NodeExecutionResult, NodeOutputData, RunContext};
use iceos_registry::{NodeExecutor, WorkflowRuntime};
use iceos_sandbox::{run_with_limits, ResourceLimits, SandboxError};
use iceos_workflow::{NodeKind, NodeSpec};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::support::metadata;

/// A consumed capability: the actual interpreter behind a `code` node. No
/// in-tree implementation ships — a deployment wires up a concrete
/// WASM-hosted interpreter (or rejects `code` nodes entirely by registering
/// none) the same way it supplies a `BlueprintStore` or `MemoryStore`.
#[async_trait]
pub trait CodeRuntime: Send + Sync {
    async fn execute(&self, code: &str, language: &str, imports: &[String], ctx: Value) -> Result<Value, IceError>;
}

/// Runs `code` nodes under [`CodeRuntime`], wrapped in [`run_with_limits`]
/// with [`ResourceLimits::isolated`] per the `code` node's process-level
/// isolation requirement. Inputs are injected as `ctx`; the interpreter's
/// own convention governs how `result` is captured into the returned value.
///
/// Before dispatch, the blueprint's `code`/`imports` are checked in-tree:
/// [`validate_syntax`] rejects the most common malformed-Python shapes
/// (unterminated strings, unbalanced brackets) the same way the reference
/// system's node executor calls `ast.parse` before ever reaching its
/// sandbox, and [`validate_imports`] enforces the node's own `imports`
/// allowlist rather than trusting the external interpreter to. This is not
/// a full Python grammar — only `CodeRuntime` executes the code — but a
/// blueprint with invalid syntax or a disallowed import never gets that
/// far.
pub struct CodeExecutor {
    runtime: Arc<dyn CodeRuntime>,
    limits: ResourceLimits,
}

impl CodeExecutor {
    #[must_use]
    pub fn new(runtime: Arc<dyn CodeRuntime>, limits: ResourceLimits) -> Self {
        Self { runtime, limits: limits.isolated() }
    }
}

#[async_trait]
impl NodeExecutor for CodeExecutor {
    async fn exec(
        &self,
        _runtime: &dyn WorkflowRuntime,
        node: &NodeSpec,
        _ctx: &RunContext,
        input: Value,
    ) -> Result<NodeExecutionResult, IceError> {
        let NodeKind::Code { code, language, imports } = &node.kind else {
            return Err(IceError::internal("CodeExecutor invoked on a non-code node"));
        };
        let imports = imports.clone().unwrap_or_default();

        if !language.starts_with("python") {
            return Err(IceError::validation(format!("code node {} declares unsupported language '{language}'", node.id)));
        }
        validate_syntax(code).map_err(|reason| IceError::validation(format!("code node {}: {reason}", node.id)))?;
        validate_imports(code, &imports).map_err(|module| IceError::sandbox_violation(node.id.to_string(), format!("import:{module}")))?;

        let start = Instant::now();
        let cancel = CancellationToken::new();
        let outcome = run_with_limits(self.runtime.execute(code, language, &imports, input), &self.limits, &cancel).await;

        match outcome {
            Ok(Ok(value)) => Ok(NodeExecutionResult::success(NodeOutputData::inline(value), metadata(1, start, false))),
            Ok(Err(err)) => Ok(NodeExecutionResult::failure(err.to_string(), err.error_code(), metadata(1, start, false))),
            Err(sandbox_err @ SandboxError::TimedOut { .. }) => {
                let err: IceError = sandbox_err.into();
                Ok(NodeExecutionResult::failure(err.to_string(), "resource_exceeded", metadata(1, start, false)))
            }
            Err(sandbox_err) => {
                let err: IceError = sandbox_err.into();
                Ok(NodeExecutionResult::failure(err.to_string(), err.error_code(), metadata(1, start, false)))
            }
        }
    }
}

/// A minimal lexical pass over `code`: tracks bracket balance and string
/// termination (single, double, and triple-quoted, `#` comments) well
/// enough to catch the malformed blueprints that matter before ever
/// reaching the interpreter — an unterminated string or an unbalanced
/// bracket. It does not parse expressions or statements, so it accepts
/// plenty of strings that still fail at the interpreter; it only promises
/// to reject the syntactically broken ones early.
fn validate_syntax(code: &str) -> Result<(), String> {
    if code.trim().is_empty() {
        return Err("code is empty".to_owned());
    }

    let mut depth: i32 = 0;
    let mut chars = code.chars().peekable();
    let mut in_comment = false;
    let mut quote: Option<(char, bool)> = None; // (quote char, is_triple)

    while let Some(c) = chars.next() {
        if let Some((q, triple)) = quote {
            if c == '\\' {
                chars.next();
                continue;
            }
            if c == q {
                if !triple {
                    quote = None;
                } else if chars.clone().take(2).collect::<String>() == format!("{q}{q}") {
                    chars.next();
                    chars.next();
                    quote = None;
                }
            }
            continue;
        }
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }
        match c {
            '#' => in_comment = true,
            '\'' | '"' => {
                let triple = chars.clone().take(2).collect::<String>() == format!("{c}{c}");
                if triple {
                    chars.next();
                    chars.next();
                }
                quote = Some((c, triple));
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return Err("unbalanced closing bracket".to_owned());
        }
    }

    if quote.is_some() {
        return Err("unterminated string literal".to_owned());
    }
    if depth != 0 {
        return Err("unbalanced brackets".to_owned());
    }
    Ok(())
}

/// Scans `code` for `import x` / `from x import y` statements and rejects
/// the first module whose top-level name is not in `allowlist`. Returns
/// the offending module name on rejection.
fn validate_imports(code: &str, allowlist: &[String]) -> Result<(), String> {
    for line in code.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        let module = if let Some(rest) = line.strip_prefix("import ") {
            rest.split([',', ' ']).next()
        } else if let Some(rest) = line.strip_prefix("from ") {
            rest.split_whitespace().next()
        } else {
            continue;
        };
        let Some(module) = module else { continue };
        let root = module.split('.').next().unwrap_or(module);
        if !allowlist.iter().any(|allowed| allowed == root) {
            return Err(root.to_owned());
        }
    }
    Ok(())
}
