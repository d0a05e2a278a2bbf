/// Configuration for the operation pipeline.
///
/// Controls operation timeouts and the load-shedding limit.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Timeout for one query, update, or catalog operation in milliseconds.
    pub operation_timeout_ms: u64,
    /// Maximum number of concurrent operations before load shedding.
    pub max_concurrent_operations: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 60_000,
            max_concurrent_operations: 64,
        }
    }
}
