//! Retry with exponential backoff and jitter, shared by every model client.
//! Rate limits and transient network failures are retried transparently;
//! client errors switch to the next rung immediately.

use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Wall-clock bound across all attempts.
    pub total_deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            total_deadline: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    #[cfg(test)]
    pub fn fast(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            total_deadline: Duration::from_secs(5),
        }
    }
}

/// Whether an error is worth retrying. 429 and 408 are transient, as are
/// 5xx and socket-level failures; other 4xx client errors are not.
pub fn is_transient(err: &anyhow::Error) -> bool {
    if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>() {
        if reqwest_err.is_timeout() || reqwest_err.is_connect() {
            return true;
        }
        if let Some(status) = reqwest_err.status() {
            let code = status.as_u16();
            return code == 429 || code == 408 || status.is_server_error();
        }
    }
    let msg = err.to_string().to_ascii_lowercase();
    if msg.contains("insufficient_quota") || msg.contains("exceeded your current quota") {
        return false;
    }
    // String fallback: scan for a status code in the message.
    for word in msg.split(|c: char| !c.is_ascii_digit()) {
        if let Ok(code) = word.parse::<u16>() {
            if (400..500).contains(&code) {
                return code == 429 || code == 408;
            }
            if (500..600).contains(&code) {
                return true;
            }
        }
    }
    msg.contains("timeout")
        || msg.contains("timed out")
        || msg.contains("connection reset")
        || msg.contains("overloaded")
        || msg.contains("unavailable")
        || msg.contains("rate limit")
        || msg.contains("rate-limited")
}

fn jittered(delay: Duration) -> Duration {
    let half = delay.as_millis() as u64 / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=half)
    };
    delay + Duration::from_millis(jitter)
}

/// Run `op` with retries per `policy`. The closure receives the attempt
/// index so callers can tag logs. Returns the first success, the first
/// non-transient error, or the last transient error once attempts or the
/// deadline run out.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    stage: &str,
    model: &str,
    op: F,
) -> anyhow::Result<T>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let started = Instant::now();
    let mut delay = policy.base_delay;

    for attempt in 0..policy.max_attempts {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(stage, model, attempt, "recovered after retries");
                }
                return Ok(value);
            }
            Err(err) => {
                let transient = is_transient(&err);
                let out_of_budget = attempt + 1 >= policy.max_attempts
                    || started.elapsed() + delay > policy.total_deadline;
                if !transient || out_of_budget {
                    if transient && out_of_budget {
                        tracing::warn!(stage, model, attempt = attempt + 1, "retry budget exhausted");
                    }
                    return Err(err);
                }
                tracing::warn!(
                    stage,
                    model,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "transient failure, backing off"
                );
                tokio::time::sleep(jittered(delay)).await;
                delay = (delay * 2).min(policy.max_delay);
            }
        }
    }
    anyhow::bail!("{stage}: retry policy allows no attempts");
}
