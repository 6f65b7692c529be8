/// Resilience patterns shared by backend services
///
/// - **Retry**: a `RetryPolicy` object (fixed or exponential backoff, optional
///   attempt limit, optional jitter) that call sites hold instead of inlining
///   their own retry loops
/// - **Presets**: pre-tuned policies for common dependencies
///
/// # Example: block until the database accepts connections
///
/// ```rust,no_run
/// use resilience::presets;
///
/// #[tokio::main]
/// async fn main() {
///     let policy = presets::database_connect();
///
///     let result = policy.retry(|| async {
///         // Open a connection here
///         Ok::<_, String>(())
///     }).await;
/// }
/// ```

pub mod presets;
pub mod retry;

pub use presets::database_connect;
pub use retry::{with_retry, Backoff, RetryError, RetryPolicy};
