//! Boundary to the notarization engine.
//!
//! The engine runs the actual TLS proof protocol and lives outside this
//! crate. Submitting a job hands back a [`JobHandle`]; the engine keeps the
//! paired [`StatusReporter`] and pushes status changes through it.
//!
//! # Components
//!
//! - [`NotarizationEngine`]: submission seam implemented by real engines
//! - [`JobHandle`] / [`StatusReporter`]: per-job status channel
//! - [`LoopbackEngine`]: local engine that completes jobs after a delay,
//!   used for dry runs from the CLI

pub mod loopback;

use tokio::sync::watch;

use crate::error::Result;
use crate::notarize::{NotarizationJob, StatusReport};

pub use loopback::LoopbackEngine;

pub trait NotarizationEngine: Send + Sync {
    /// Queue a job for notarization without waiting for the result.
    ///
    /// An error here means the job never reached the engine.
    fn submit(&self, job: &NotarizationJob) -> Result<JobHandle>;
}

/// Receiving side of a job's status channel, held by the submitter.
#[derive(Debug)]
pub struct JobHandle {
    job_id: String,
    updates: watch::Receiver<StatusReport>,
}

/// Sending side of a job's status channel, held by the engine.
#[derive(Debug)]
pub struct StatusReporter {
    job_id: String,
    updates: watch::Sender<StatusReport>,
}

impl JobHandle {
    /// Create a linked reporter/handle pair. The channel starts at `pending`.
    pub fn channel(job_id: impl Into<String>) -> (StatusReporter, JobHandle) {
        let job_id = job_id.into();
        let (tx, rx) = watch::channel(StatusReport::pending());
        (
            StatusReporter {
                job_id: job_id.clone(),
                updates: tx,
            },
            JobHandle {
                job_id,
                updates: rx,
            },
        )
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Latest report, without waiting.
    pub fn current(&self) -> StatusReport {
        self.updates.borrow().clone()
    }

    /// Wait for the next report. Returns `None` once the engine has dropped
    /// its reporter and no unseen report is left.
    pub async fn changed(&mut self) -> Option<StatusReport> {
        match self.updates.changed().await {
            Ok(()) => Some(self.updates.borrow_and_update().clone()),
            Err(_) => None,
        }
    }
}

impl StatusReporter {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Push a report. Returns false if the submitter is no longer listening.
    pub fn report(&self, report: StatusReport) -> bool {
        self.updates.send(report).is_ok()
    }
}
