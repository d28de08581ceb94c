use std::future::Future;

use iceos_error::IceError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::limits::ResourceLimits;

/// A sandbox-level failure, distinct from the node's own `IceError` so the
/// node executor can tell "the sandbox killed it" apart from "the executor
/// returned an error".
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("execution exceeded {limit_ms}ms wall-clock timeout")]
    TimedOut { limit_ms: u64 },
    #[error("execution was cancelled")]
    Cancelled,
}

impl From<SandboxError> for IceError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::TimedOut { limit_ms } => IceError::Timeout { elapsed_ms: limit_ms },
            SandboxError::Cancelled => IceError::canceled(None),
        }
    }
}

/// Runs `future` under `limits`, enforcing the wall-clock timeout and
/// observing `cancel` for cooperative cancellation. Memory/CPU caps in
/// `limits` are advisory at this layer — enforcing them requires a concrete
/// isolated backend (a WASM runtime, an rlimit-aware child process) that is
/// a consumed capability, not implemented here.
pub async fn run_with_limits<F, T>(
    future: F,
    limits: &ResourceLimits,
    cancel: &CancellationToken,
) -> Result<T, SandboxError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        () = cancel.cancelled() => Err(SandboxError::Cancelled),
        result = tokio::time::timeout(limits.timeout, future) => {
            result.map_err(|_| SandboxError::TimedOut { limit_ms: limits.timeout.as_millis() as u64 })
        }
    }
}
