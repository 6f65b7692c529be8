/// Preset retry policies for common dependencies
use crate::retry::RetryPolicy;
use std::time::Duration;

/// Relational store connection acquisition
///
/// - Fixed 3s delay between attempts
/// - No attempt limit: blocks until the store accepts connections
pub fn database_connect() -> RetryPolicy {
    RetryPolicy::fixed(Duration::from_secs(3))
}
