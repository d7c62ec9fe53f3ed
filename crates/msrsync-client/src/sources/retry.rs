use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryPolicy;
use crate::{ClientError, ClientResult};

/// Runs `operation` until it succeeds, fails permanently, or the policy's
/// attempts run out. Only transient errors are retried; backoff doubles per try.
pub fn with_retries<T, F>(policy: &RetryPolicy, collaborator: &str, mut operation: F) -> ClientResult<T>
where
    F: FnMut() -> ClientResult<T>,
{
    let attempts = policy.attempts.max(1);
    let mut delay = policy.backoff_ms;
    let mut attempt = 1;

    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) if !error.is_transient() => return Err(error),
            Err(error) if attempt >= attempts => {
                return Err(ClientError::collaborator_failed(
                    collaborator,
                    attempts,
                    &error.message,
                ));
            }
            Err(error) => {
                warn!(
                    collaborator,
                    attempt,
                    attempts,
                    backoff_ms = delay,
                    error = %error.message,
                    "collaborator call failed; retrying"
                );
                if delay > 0 {
                    thread::sleep(Duration::from_millis(delay));
                }
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
        }
    }
}
