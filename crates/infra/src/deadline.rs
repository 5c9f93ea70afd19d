//! Deadline enforcement for every outbound IO call.

use std::future::Future;
use std::time::Duration;

/// Errors that can express "the deadline elapsed".
pub trait DeadlineError {
    fn deadline_exceeded(operation: &'static str, after: Duration) -> Self;
}

/// Run `fut` under `deadline`. Dropping the returned future cancels `fut`.
pub async fn within<T, E, F>(deadline: Duration, operation: &'static str, fut: F) -> Result<T, E>
where
    E: DeadlineError,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = deadline.as_millis() as u64, "deadline exceeded");
            Err(E::deadline_exceeded(operation, deadline))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TimedOut(&'static str);

    impl DeadlineError for TimedOut {
        fn deadline_exceeded(operation: &'static str, _after: Duration) -> Self {
            TimedOut(operation)
        }
    }

    #[tokio::test]
    async fn slow_calls_surface_as_errors() {
        let res: Result<(), TimedOut> = within(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(res, Err(TimedOut("slow")));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let res: Result<u8, TimedOut> = within(Duration::from_secs(1), "fast", async { Ok(7) }).await;
        assert_eq!(res, Ok(7));
    }
}
