//! Bounded execution of CPU-bound transform jobs.
//!
//! Transforms run on the blocking pool behind a semaphore so a burst of
//! heavy jobs cannot starve request intake, and under a wall-clock timeout
//! so no request runs unbounded. A panicking job is contained to its own
//! request.

use std::sync::Arc;
use std::time::Duration;

use pixelmill_core::AppError;
use tokio::sync::Semaphore;

pub struct JobRunner {
    semaphore: Arc<Semaphore>,
    timeout: Duration,
    timeout_secs: u64,
}

impl JobRunner {
    pub fn new(max_concurrent: usize, timeout_secs: u64) -> Self {
        tracing::info!(
            max_concurrent = max_concurrent,
            timeout_secs = timeout_secs,
            "Job runner initialized"
        );
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout: Duration::from_secs(timeout_secs),
            timeout_secs,
        }
    }

    /// Run one job to completion off the async path.
    ///
    /// The concurrency permit is held for the full duration of the blocking
    /// work; a timed-out job keeps its permit until it actually finishes, so
    /// the CPU bound holds even for runaways.
    pub async fn run<T, F>(&self, job: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, AppError> + Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("job runner is shut down".to_string()))?;

        let start = std::time::Instant::now();
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        match tokio::time::timeout(self.timeout, handle).await {
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout_secs,
                    "Processing job exceeded its time budget"
                );
                Err(AppError::Timeout(self.timeout_secs))
            }
            Ok(Err(join_err)) => {
                if join_err.is_panic() {
                    tracing::error!(error = %join_err, "Processing job panicked");
                    Err(AppError::Internal("processing job panicked".to_string()))
                } else {
                    Err(AppError::Internal("processing job was cancelled".to_string()))
                }
            }
            Ok(Ok(result)) => {
                tracing::debug!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Processing job finished"
                );
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_returns_job_result() {
        let runner = JobRunner::new(2, 5);
        let result: i32 = runner.run(|| Ok(41 + 1)).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn test_run_propagates_job_error() {
        let runner = JobRunner::new(2, 5);
        let result: Result<(), _> = runner
            .run(|| Err(AppError::Decode("broken".to_string())))
            .await;
        assert!(matches!(result, Err(AppError::Decode(_))));
    }

    #[tokio::test]
    async fn test_run_contains_panic() {
        let runner = JobRunner::new(2, 5);
        let result: Result<(), _> = runner.run(|| panic!("bad image")).await;
        assert!(matches!(result, Err(AppError::Internal(_))));

        // The runner stays usable afterwards.
        let ok: i32 = runner.run(|| Ok(7)).await.unwrap();
        assert_eq!(ok, 7);
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let runner = JobRunner::new(1, 1);
        let result: Result<(), _> = runner
            .run(|| {
                std::thread::sleep(Duration::from_secs(3));
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(AppError::Timeout(1))));
    }

    #[tokio::test]
    async fn test_concurrent_jobs_do_not_interfere() {
        let runner = Arc::new(JobRunner::new(4, 5));
        let mut handles = Vec::new();
        for i in 0..8 {
            let runner = runner.clone();
            handles.push(tokio::spawn(async move {
                runner.run(move || Ok(i * 2)).await
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            let value: i32 = handle.await.unwrap().unwrap();
            assert_eq!(value, i as i32 * 2);
        }
    }
}
