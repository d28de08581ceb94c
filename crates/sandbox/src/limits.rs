use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capability::IsolationLevel;

/// Resource caps applied around a single node's execution. Memory and CPU
/// enforcement are best-effort and platform-dependent; the wall-clock
/// timeout is always enforced because it needs no OS support beyond a timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub timeout: Duration,
    pub max_memory_bytes: Option<u64>,
    pub max_cpu_millis: Option<u64>,
    pub isolation: IsolationLevel,
}

impl ResourceLimits {
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout, max_memory_bytes: None, max_cpu_millis: None, isolation: IsolationLevel::CapabilityGated }
    }

    #[must_use]
    pub fn isolated(mut self) -> Self {
        self.isolation = IsolationLevel::Isolated;
        self
    }

    #[must_use]
    pub fn with_memory_cap(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_cpu_cap(mut self, millis: u64) -> Self {
        self.max_cpu_millis = Some(millis);
        self
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_are_capability_gated_with_thirty_second_timeout() {
        let limits = ResourceLimits::default();
        assert_eq!(limits.timeout, Duration::from_secs(30));
        assert_eq!(limits.isolation, IsolationLevel::CapabilityGated);
    }

    #[test]
    fn builder_methods_compose() {
        let limits = ResourceLimits::with_timeout(Duration::from_millis(500))
            .isolated()
            .with_memory_cap(1024)
            .with_cpu_cap(200);
        assert_eq!(limits.isolation, IsolationLevel::Isolated);
        assert_eq!(limits.max_memory_bytes, Some(1024));
        assert_eq!(limits.max_cpu_millis, Some(200));
    }
}
