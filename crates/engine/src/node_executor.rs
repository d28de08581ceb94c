use std::time::Instant;

use iceos_core::NodeId;
use iceos_error::IceError;
use iceos_execution::{cache_key, DataPassingPolicy, EventKind, NodeExecutionResult, NodeMetadata, NodeOutputData, RunContext};
use iceos_registry::WorkflowRuntime;
use iceos_sandbox::{run_with_limits, ResourceLimits, SandboxError};
use iceos_workflow::{InputMapping, NodeSpec, RetryPolicy};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::cache::NodeCache;

/// The handles a node execution needs beyond the node and the run context
/// itself. Every field is a shared reference, so this is cheap to build once
/// per level and pass down. Events go through `runtime.emit` rather than a
/// bus held here directly, so a store-backed runtime persists node-level
/// events the same way it persists run-level ones.
#[derive(Clone, Copy)]
pub struct ExecCx<'a> {
    pub runtime: &'a dyn WorkflowRuntime,
    pub cache: &'a NodeCache,
    pub topology_hash: &'a str,
    pub cancel: &'a CancellationToken,
    pub data_policy: &'a DataPassingPolicy,
}

fn empty_metadata() -> NodeMetadata {
    NodeMetadata { attempt: 0, duration_ms: 0, cache_hit: false }
}

/// Runs one node through its full lifecycle: validate, assemble input, check
/// the input schema, look up the cache, dispatch to the registered executor
/// under the sandbox timeout with a retry loop, check the output schema,
/// then persist the output into `ctx` and emit the terminal event. Never
/// returns `Err` — every failure mode becomes a failed `NodeExecutionResult`
/// so the scheduler always has a result to record for this node.
pub async fn execute_node(cx: ExecCx<'_>, node: &NodeSpec, ctx: &RunContext) -> NodeExecutionResult {
    if let Err(err) = validate_node_config(node) {
        return fail_and_emit(cx, node, err, empty_metadata()).await;
    }

    cx.runtime.emit(EventKind::NodeStarted { node_id: node.id.clone() }, Some(node.id.clone()), Value::Null).await;

    let input = match assemble_input(node, ctx) {
        Ok(value) => value,
        Err(err) => return fail_and_emit(cx, node, err, empty_metadata()).await,
    };

    if let Some(schema) = &node.input_schema {
        if let Err(err) = schema.check(&input) {
            return fail_and_emit(cx, node, err, empty_metadata()).await;
        }
    }

    let key = cache_key(cx.topology_hash, &node.id, &input);
    if node.use_cache {
        if let Some(mut cached) = cx.cache.get(&key) {
            cached.metadata.cache_hit = true;
            return persist_and_emit(cx, node, ctx, cached).await;
        }
    }

    let Some(executor) = cx.runtime.registry().get_executor(node.node_type()) else {
        return fail_and_emit(cx, node, IceError::registry(format!("no executor registered for node type '{}'", node.node_type())), empty_metadata()).await;
    };

    let retry_policy = node.retry_policy.clone().unwrap_or(RetryPolicy { max_attempts: 1, backoff_strategy: iceos_workflow::BackoffStrategy::Fixed, backoff_ms: 0 });
    let limits = node.timeout_ms.map(|ms| ResourceLimits::with_timeout(std::time::Duration::from_millis(ms))).unwrap_or_default();

    let start = Instant::now();
    let mut attempt = 0u32;
    let mut result;
    loop {
        attempt += 1;
        if attempt > 1 {
            cx.runtime.emit(EventKind::NodeRetrying { node_id: node.id.clone(), attempt }, Some(node.id.clone()), Value::Null).await;
            let backoff = retry_policy.backoff_for_attempt(attempt - 2);
            if backoff > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
            }
        }

        result = match run_with_limits(executor.exec(cx.runtime, node, ctx, input.clone()), &limits, cx.cancel).await {
            Ok(Ok(r)) => r.with_attempt(attempt, start),
            Ok(Err(err)) => NodeExecutionResult::failure(err.to_string(), err.error_code(), metadata(attempt, start)),
            Err(sandbox_err) => {
                let err: IceError = sandbox_err_into(sandbox_err);
                NodeExecutionResult::failure(err.to_string(), err.error_code(), metadata(attempt, start))
            }
        };

        if result.success || !is_retryable(result.error_type.as_deref()) || attempt >= retry_policy.max_attempts {
            break;
        }
    }

    if result.success {
        if let Some(schema) = &node.output_schema {
            if let Some(output) = result.output.as_ref().and_then(NodeOutputData::as_inline) {
                if let Err(err) = schema.check(output) {
                    result = NodeExecutionResult::failure(err.to_string(), err.error_code(), result.metadata.clone());
                }
            }
        }
    }

    if result.success {
        if let Some(output) = result.output.as_ref().and_then(NodeOutputData::as_inline) {
            if let Err((limit, actual)) = cx.data_policy.check_output_size(output) {
                let err = IceError::resource_exceeded(format!("node output for '{}' is {actual} bytes, over the {limit}-byte limit", node.id));
                result = NodeExecutionResult::failure(err.to_string(), err.error_code(), result.metadata.clone());
            }
        }
    }

    if result.success && node.use_cache {
        cx.cache.put(key, result.clone());
    }

    persist_and_emit(cx, node, ctx, result).await
}

fn sandbox_err_into(err: SandboxError) -> IceError {
    err.into()
}

trait WithAttempt {
    fn with_attempt(self, attempt: u32, start: Instant) -> Self;
}

impl WithAttempt for NodeExecutionResult {
    fn with_attempt(mut self, attempt: u32, start: Instant) -> Self {
        self.metadata.attempt = attempt;
        self.metadata.duration_ms = iceos_sandbox_elapsed_ms(start);
        self
    }
}

fn iceos_sandbox_elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn metadata(attempt: u32, start: Instant) -> NodeMetadata {
    NodeMetadata { attempt, duration_ms: iceos_sandbox_elapsed_ms(start), cache_hit: false }
}

fn is_retryable(error_type: Option<&str>) -> bool {
    matches!(error_type, Some("transient") | Some("rate_limited") | Some("timeout"))
}

async fn fail_and_emit(cx: ExecCx<'_>, node: &NodeSpec, err: IceError, metadata: NodeMetadata) -> NodeExecutionResult {
    let result = NodeExecutionResult::failure(err.to_string(), err.error_code(), metadata);
    cx.runtime
        .emit(EventKind::NodeFailed { node_id: node.id.clone(), error_type: err.error_code().to_owned() }, Some(node.id.clone()), err.to_payload())
        .await;
    result
}

async fn persist_and_emit(cx: ExecCx<'_>, node: &NodeSpec, ctx: &RunContext, result: NodeExecutionResult) -> NodeExecutionResult {
    if result.success {
        if let Some(output) = result.output.clone() {
            // Only the scheduler ever calls this once per node per run, so a
            // second write here would mean a node was dispatched twice.
            let _ = ctx.record_output(node.id.clone(), output);
        }
        cx.runtime.emit(EventKind::NodeSucceeded { node_id: node.id.clone() }, Some(node.id.clone()), Value::Null).await;
    } else {
        let error_type = result.error_type.clone().unwrap_or_else(|| "internal".to_owned());
        cx.runtime
            .emit(
                EventKind::NodeFailed { node_id: node.id.clone(), error_type },
                Some(node.id.clone()),
                serde_json::json!({"message": result.error.clone().unwrap_or_default()}),
            )
            .await;
    }
    result
}

/// Idempotent, side-effect-free check of the node's declared schemas. Full
/// structural/cycle/airgap validation already happened once at blueprint
/// submission time via `iceos_workflow::validate`; this only re-checks the
/// two pieces a node executor is in a position to fail on: malformed schema
/// literals.
fn validate_node_config(node: &NodeSpec) -> Result<(), IceError> {
    if let Some(schema) = &node.input_schema {
        schema.validate_literal()?;
    }
    if let Some(schema) = &node.output_schema {
        schema.validate_literal()?;
    }
    Ok(())
}

/// Resolves the `input` value passed to the node's executor. Explicit
/// `input_mappings` always win; with none declared, falls back to the
/// positional rule: no dependencies means the workflow's top-level inputs,
/// one dependency passes its output straight through, and more than one
/// merges every predecessor's output into an object keyed by node id.
fn assemble_input(node: &NodeSpec, ctx: &RunContext) -> Result<Value, IceError> {
    if node.input_mappings.is_empty() {
        return Ok(default_input(node, ctx));
    }

    let mut map = Map::with_capacity(node.input_mappings.len());
    for (key, mapping) in &node.input_mappings {
        let value = match mapping {
            InputMapping::Literal(literal) => literal.clone(),
            InputMapping::FromNode { source_node_id, source_output_key } => ctx.resolve_path(source_node_id, source_output_key)?,
        };
        map.insert(key.clone(), value);
    }
    Ok(Value::Object(map))
}

fn default_input(node: &NodeSpec, ctx: &RunContext) -> Value {
    match node.dependencies.as_slice() {
        [] => ctx.inputs.clone(),
        [only] => output_value_of(ctx, only),
        many => {
            let mut map = Map::with_capacity(many.len());
            for dep in many {
                map.insert(dep.to_string(), output_value_of(ctx, dep));
            }
            Value::Object(map)
        }
    }
}

fn output_value_of(ctx: &RunContext, node_id: &NodeId) -> Value {
    ctx.output_of(node_id).and_then(|output| output.as_inline().cloned()).unwrap_or(Value::Null)
}
