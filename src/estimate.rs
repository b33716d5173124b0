use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::Error;
use crate::schema::UsageData;

/// Why an estimator could not produce usage.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct EstimateError(pub String);

impl EstimateError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Looks up usage a resource definition cannot tell us, such as the
/// operating system behind an image id.
///
/// Returns only the keys it could estimate; callers merge them under the
/// declared usage.
#[async_trait]
pub trait UsageEstimator: Send + Sync {
    async fn estimate(&self, usage: &UsageData) -> Result<UsageData, EstimateError>;
}

/// Receiving side of a cancellation flag shared by every estimate in a run.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Sending side; dropping it does not cancel.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelSignal {
    /// A signal nothing can trigger.
    pub fn never() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    async fn cancelled(&mut self) {
        if self.rx.wait_for(|c| *c).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Run `estimator` for `resource` under a timeout and a cancel signal.
///
/// On success the estimated keys fill the gaps in `usage`; declared values
/// are never overwritten.
pub async fn run_estimate(
    resource: &str,
    estimator: &dyn UsageEstimator,
    usage: &UsageData,
    timeout: Duration,
    cancel: &CancelSignal,
) -> Result<UsageData, Error> {
    let mut cancel = cancel.clone();
    if cancel.is_cancelled() {
        return Err(Error::EstimateCancelled {
            resource: resource.to_string(),
        });
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::EstimateCancelled {
            resource: resource.to_string(),
        }),
        res = tokio::time::timeout(timeout, estimator.estimate(usage)) => match res {
            Ok(Ok(estimated)) => {
                tracing::debug!(
                    "Estimated {} usage keys for {resource}",
                    estimated.attributes.len()
                );
                Ok(usage.merge(&estimated))
            }
            Ok(Err(e)) => Err(Error::EstimateFailed {
                resource: resource.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(Error::EstimateTimedOut {
                resource: resource.to_string(),
                timeout,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UsageValue;

    struct Fixed(UsageData);

    #[async_trait]
    impl UsageEstimator for Fixed {
        async fn estimate(&self, _usage: &UsageData) -> Result<UsageData, EstimateError> {
            Ok(self.0.clone())
        }
    }

    struct Slow;

    #[async_trait]
    impl UsageEstimator for Slow {
        async fn estimate(&self, _usage: &UsageData) -> Result<UsageData, EstimateError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(UsageData::default())
        }
    }

    struct Failing;

    #[async_trait]
    impl UsageEstimator for Failing {
        async fn estimate(&self, _usage: &UsageData) -> Result<UsageData, EstimateError> {
            Err(EstimateError::new("image not found"))
        }
    }

    fn declared() -> UsageData {
        UsageData::new("aws_instance.web")
            .with("operating_system", UsageValue::String("windows".into()))
    }

    #[tokio::test]
    async fn test_estimate_fills_gaps_only() {
        let estimator = Fixed(
            UsageData::new("aws_instance.web")
                .with("operating_system", UsageValue::String("linux".into()))
                .with("monthly_cpu_credit_hrs", UsageValue::Int(300)),
        );

        let merged = run_estimate(
            "aws_instance.web",
            &estimator,
            &declared(),
            Duration::from_secs(1),
            &CancelSignal::never(),
        )
        .await
        .unwrap();

        assert_eq!(merged.get_string("operating_system").as_deref(), Some("windows"));
        assert_eq!(merged.get_int("monthly_cpu_credit_hrs"), Some(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let err = run_estimate(
            "aws_instance.web",
            &Slow,
            &declared(),
            Duration::from_secs(5),
            &CancelSignal::never(),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            Error::EstimateTimedOut {
                resource: "aws_instance.web".into(),
                timeout: Duration::from_secs(5),
            }
        );
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let err = run_estimate(
            "aws_instance.web",
            &Failing,
            &declared(),
            Duration::from_secs(1),
            &CancelSignal::never(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::EstimateFailed { ref reason, .. } if reason == "image not found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_running() {
        let (handle, signal) = cancel_pair();

        let task = tokio::spawn(async move {
            run_estimate(
                "aws_instance.web",
                &Slow,
                &declared(),
                Duration::from_secs(30),
                &signal,
            )
            .await
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::EstimateCancelled { .. }));
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        assert!(signal.is_cancelled());

        let err = run_estimate(
            "r",
            &Failing,
            &declared(),
            Duration::from_secs(1),
            &signal,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::EstimateCancelled { .. }));
    }
}
