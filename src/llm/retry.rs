//! Retry policy for assistant service requests.
//!
//! Exponential backoff with jitter, plus honoring a server-provided
//! `Retry-After` when one is sent with a 429.
//!
//! Only reads are retried freely. A POST that reached the server may already
//! have taken effect (a run created, tool outputs accepted), so POSTs are
//! retried only when the request provably never landed: a connect failure,
//! or a 429 rejection.

use std::time::Duration;

use rand::Rng;
use reqwest::Method;

/// Upper bound on any server-requested wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);
/// Upper bound on the exponential base before jitter.
const MAX_BACKOFF_MS: u64 = 60_000;

/// Returns `true` if the HTTP status code is transient and worth retrying.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Whether a request with `method` that got `status` may be sent again.
pub(crate) fn should_retry_status(method: &Method, status: u16) -> bool {
    if *method == Method::GET {
        is_retryable_status(status)
    } else {
        status == 429
    }
}

/// Whether a request with `method` that failed before any response may be
/// sent again. `connect_failed` means no connection was ever established.
pub(crate) fn should_retry_transport(method: &Method, connect_failed: bool) -> bool {
    *method == Method::GET || connect_failed
}

/// Backoff for `attempt` (0-based): 1s doubled per attempt, capped at 60s,
/// +/-25% jitter, never below 100ms.
pub(crate) fn retry_backoff_delay(attempt: u32) -> Duration {
    let base_ms: u64 = 1000u64
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(MAX_BACKOFF_MS);
    let jitter_range = base_ms / 4;
    let jitter = if jitter_range > 0 {
        let offset = rand::thread_rng().gen_range(0..=jitter_range * 2);
        offset as i64 - jitter_range as i64
    } else {
        0
    };
    let delay_ms = (base_ms as i64).saturating_add(jitter).max(100) as u64;
    Duration::from_millis(delay_ms)
}

/// Parse a `Retry-After` header given in whole seconds.
pub(crate) fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    let secs: u64 = value?.trim().parse().ok()?;
    Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}
