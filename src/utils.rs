// ABOUTME: Small shared utilities: retry with exponential backoff
// ABOUTME: Used by the connection layer to ride out transient failures

use std::time::Duration;

/// Retry a function with exponential backoff
///
/// Executes an async operation with automatic retry on failure. Each retry
/// doubles the delay to handle transient failures gracefully.
///
/// # Arguments
///
/// * `operation` - Async function to retry
/// * `max_retries` - Maximum number of retry attempts (0 = no retries)
/// * `initial_delay` - Delay before first retry (doubles each subsequent retry)
///
/// # Returns
///
/// Returns the successful result or the last error after all retries exhausted.
///
/// # Examples
///
/// ```no_run
/// # use std::time::Duration;
/// # use portable_dump::utils::retry_with_backoff;
/// # async fn example() -> Result<(), String> {
/// let result = retry_with_backoff(
///     || async { Ok::<_, String>("success") },
///     3,
///     Duration::from_secs(1),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    max_retries: u32,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = initial_delay;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= max_retries {
                    return Err(e);
                }
                tracing::warn!(
                    "Operation failed (attempt {}/{}): {}; retrying in {:?}...",
                    attempt + 1,
                    max_retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
        }
    }
}
