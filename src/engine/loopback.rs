use std::time::Duration;

use crate::engine::{JobHandle, NotarizationEngine};
use crate::error::{NotarizeError, Result};
use crate::notarize::{NotarizationJob, StatusReport};

/// Local stand-in for a notarization engine.
///
/// Every submitted job is completed after a fixed delay, either with
/// `success` or with `error` carrying the configured detail. No proof is
/// produced.
#[derive(Debug, Clone)]
pub struct LoopbackEngine {
    delay: Duration,
    failure: Option<String>,
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl LoopbackEngine {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            failure: None,
        }
    }

    /// Complete every job with `error` and the given detail.
    pub fn failing_with(mut self, detail: impl Into<String>) -> Self {
        self.failure = Some(detail.into());
        self
    }
}

impl NotarizationEngine for LoopbackEngine {
    fn submit(&self, job: &NotarizationJob) -> Result<JobHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| NotarizeError::Submission(e.to_string()))?;

        let (reporter, handle) = JobHandle::channel(job.id.clone());
        let delay = self.delay;
        let report = match &self.failure {
            Some(detail) => StatusReport::error(detail.clone()),
            None => StatusReport::success(),
        };

        tracing::info!(
            job_id = %job.id,
            notary_url = %job.notary_url,
            max_sent_data = job.max_sent_data,
            max_recv_data = job.max_recv_data,
            "Loopback engine accepted job"
        );

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!(job_id = %reporter.job_id(), status = %report.status, "Loopback engine finished job");
            if !reporter.report(report) {
                tracing::debug!(job_id = %reporter.job_id(), "Nobody listening for job status");
            }
        });

        Ok(handle)
    }
}
