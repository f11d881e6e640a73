//! Retry and pagination helpers. The only place that knows about GitHub
//! rate-limit semantics; transport is injected so both are testable offline.

use rand::Rng;
use std::time::Duration;
use tracing::debug;

const RETRYABLE_STATUSES: [u16; 2] = [429, 503];
const BASE_RETRY_DELAY_MS: u64 = 1_000;
const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub fn is_retryable(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Delay before retry number `attempt` (0-based), without jitter.
/// A positive integer `Retry-After` wins over exponential backoff.
pub fn retry_delay(attempt: u32, retry_after: Option<&str>) -> Duration {
    if let Some(secs) = retry_after.and_then(|v| v.trim().parse::<u64>().ok()) {
        if secs > 0 {
            return Duration::from_secs(secs);
        }
    }
    let backoff = BASE_RETRY_DELAY_MS.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(backoff.min(MAX_RETRY_DELAY_MS))
}

/// ±10 % jitter.
fn jittered(delay: Duration) -> Duration {
    delay.mul_f64(rand::thread_rng().gen_range(0.9..=1.1))
}

/// Call `fetch` until it yields a non-retryable status or `max_retries`
/// retries are used up. The last response is returned either way; callers
/// still check the status.
pub fn fetch_with_retry<F, E>(fetch: F, max_retries: u32) -> Result<HttpResponse, E>
where
    F: FnMut() -> Result<HttpResponse, E>,
{
    fetch_with_retry_using(fetch, max_retries, std::thread::sleep)
}

pub fn fetch_with_retry_using<F, S, E>(
    mut fetch: F,
    max_retries: u32,
    mut sleep: S,
) -> Result<HttpResponse, E>
where
    F: FnMut() -> Result<HttpResponse, E>,
    S: FnMut(Duration),
{
    let mut attempt = 0;
    loop {
        let res = fetch()?;
        if !is_retryable(res.status) || attempt >= max_retries {
            return Ok(res);
        }
        let delay = jittered(retry_delay(attempt, res.retry_after.as_deref()));
        debug!(status = res.status, attempt, ?delay, "retrying request");
        sleep(delay);
        attempt += 1;
    }
}

/// Fetch pages 1, 2, ... until a page has fewer than `page_size` items.
pub fn paginated_fetch<T, F, E>(mut fetch_page: F, page_size: usize, delay: Duration) -> Result<Vec<T>, E>
where
    F: FnMut(u32) -> Result<Vec<T>, E>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let items = fetch_page(page)?;
        let last = items.len() < page_size;
        all.extend(items);
        if last {
            return Ok(all);
        }
        page += 1;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
