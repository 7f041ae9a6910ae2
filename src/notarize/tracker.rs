use std::collections::HashMap;

use crate::notarize::job::{JobStatus, NotarizationJob};

/// A terminal transition detected by the tracker, with the text to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded { job_id: String, message: String },
    Failed { job_id: String, message: String },
}

impl Outcome {
    pub fn job_id(&self) -> &str {
        match self {
            Outcome::Succeeded { job_id, .. } | Outcome::Failed { job_id, .. } => job_id,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Succeeded { message, .. } | Outcome::Failed { message, .. } => message,
        }
    }
}

/// Edge detector over job statuses.
///
/// Remembers the last status seen per job id and reports a job only when its
/// status differs from that memo. A job never seen before counts as "not yet
/// observed", so a job whose first observed status is already terminal is
/// still reported.
#[derive(Debug, Default)]
pub struct StatusTracker {
    previous: HashMap<String, JobStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// One sweep over every given job. Each terminal edge yields one outcome.
    pub fn observe<'a, I>(&mut self, jobs: I) -> Vec<Outcome>
    where
        I: IntoIterator<Item = &'a NotarizationJob>,
    {
        let mut outcomes = Vec::new();

        for job in jobs {
            let current = job.status();
            if self.previous.get(&job.id) == Some(&current) {
                continue;
            }

            match current {
                JobStatus::Success => {
                    tracing::info!(job_id = %job.id, "Notarization succeeded");
                    outcomes.push(Outcome::Succeeded {
                        job_id: job.id.clone(),
                        message: job.http_dump(),
                    });
                }
                JobStatus::Error => {
                    let detail = job.error().unwrap_or_default();
                    tracing::warn!(job_id = %job.id, error = detail, "Notarization failed");
                    outcomes.push(Outcome::Failed {
                        job_id: job.id.clone(),
                        message: format!(
                            "Notarization failed for request {}: {}",
                            job.id, detail
                        ),
                    });
                }
                JobStatus::Pending => {}
            }

            self.previous.insert(job.id.clone(), current);
        }

        outcomes
    }

    /// Last status recorded for a job, if it has been observed.
    pub fn last_seen(&self, id: &str) -> Option<JobStatus> {
        self.previous.get(id).copied()
    }

    /// Drop the memo for a job that is no longer tracked.
    pub fn forget(&mut self, id: &str) {
        self.previous.remove(id);
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}
