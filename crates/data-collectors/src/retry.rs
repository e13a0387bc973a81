use pipeline_core::{PipelineConfig, PipelineError};
use std::future::Future;
use std::time::Duration;

/// Wraps fallible provider calls with a fixed inter-call delay (rate
/// limiting) and exponential-backoff retries.
#[derive(Debug, Clone)]
pub struct Retrier {
    request_delay: Duration,
    max_retries: u32,
    base_delay: Duration,
}

impl Retrier {
    pub fn new(request_delay: Duration, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            request_delay,
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.request_delay(),
            config.max_retries,
            config.backoff_base(),
        )
    }

    /// Run `operation` up to `max_retries` times total. The fixed inter-call
    /// delay is slept before every attempt; failed attempts wait
    /// `base_delay * 2^attempt` before the next one. The last error is
    /// propagated after the final attempt. Nothing is validated here;
    /// whatever the operation returns is the caller's problem.
    pub async fn execute<T, F, Fut>(
        &self,
        label: &str,
        mut operation: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let attempts = self.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            self.pause().await;

            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt + 1,
                        attempts,
                        label,
                        err
                    );
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.base_delay * 2u32.pow(attempt)).await;
                    } else {
                        tracing::error!("All {} attempts failed for {}", attempts, label);
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| PipelineError::Provider(format!("{}: no attempts made", label))))
    }

    /// The fixed inter-call pause, also used between symbols.
    pub async fn pause(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn a_persistent_failure_is_retried_exactly_max_retries_times() {
        let retrier = Retrier::new(Duration::ZERO, 3, Duration::from_millis(10));
        let calls = AtomicU32::new(0);

        let start = Instant::now();
        let result: Result<(), _> = retrier
            .execute("doomed", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PipelineError::Provider("connection reset".to_string())) }
            })
            .await;
        let elapsed = start.elapsed();

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Backoff between attempts: base * (1 + 2)
        assert!(elapsed >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn the_last_error_is_the_one_propagated() {
        let retrier = Retrier::new(Duration::ZERO, 2, Duration::ZERO);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retrier
            .execute("flaky", || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Err(PipelineError::Provider(format!("failure {}", attempt)))
                }
            })
            .await;

        match result {
            Err(PipelineError::Provider(message)) => assert_eq!(message, "failure 1"),
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn success_mid_way_stops_the_retries() {
        let retrier = Retrier::new(Duration::ZERO, 3, Duration::from_millis(5));
        let calls = AtomicU32::new(0);

        let result = retrier
            .execute("recovers", || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(PipelineError::Provider("timeout".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
