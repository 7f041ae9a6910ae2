use indexmap::IndexMap;

use crate::error::{NotarizeError, Result};
use crate::notarize::job::{JobStatus, NotarizationJob, StatusReport};

const DEFAULT_MAX_JOBS: usize = 64;

/// Jobs currently being tracked, keyed by id, in submission order.
///
/// Callers only ever see shared references; status changes go through
/// [`apply_report`](JobBook::apply_report).
#[derive(Debug)]
pub struct JobBook {
    jobs: IndexMap<String, NotarizationJob>,
    max_jobs: usize,
}

impl Default for JobBook {
    fn default() -> Self {
        Self::new()
    }
}

impl JobBook {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_JOBS)
    }

    pub fn with_capacity(max_jobs: usize) -> Self {
        Self {
            jobs: IndexMap::new(),
            max_jobs,
        }
    }

    /// Check whether a job with this id could be tracked right now.
    pub fn check_admission(&self, id: &str) -> Result<()> {
        if self.jobs.contains_key(id) {
            return Err(NotarizeError::DuplicateJob(id.to_string()));
        }
        if self.is_full() {
            return Err(NotarizeError::QueueFull);
        }
        Ok(())
    }

    /// Start tracking a job. Only one job per id may be tracked at a time.
    pub fn insert(&mut self, job: NotarizationJob) -> Result<()> {
        self.check_admission(&job.id)?;
        self.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&NotarizationJob> {
        self.jobs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.jobs.contains_key(id)
    }

    /// Apply an engine report. Returns whether the status changed.
    pub fn apply_report(&mut self, id: &str, report: &StatusReport) -> Result<bool> {
        let job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| NotarizeError::JobNotFound(id.to_string()))?;
        job.advance(report)
    }

    /// All tracked jobs in submission order
    pub fn jobs(&self) -> impl Iterator<Item = &NotarizationJob> {
        self.jobs.values()
    }

    pub fn pending_jobs(&self) -> Vec<&NotarizationJob> {
        self.jobs
            .values()
            .filter(|j| j.status() == JobStatus::Pending)
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        self.jobs.values().any(|j| j.status() == JobStatus::Pending)
    }

    /// Stop tracking the given finished jobs and hand them back.
    /// Ids that are unknown or still pending are left alone.
    pub fn remove_finished(&mut self, ids: &[String]) -> Vec<NotarizationJob> {
        let mut removed = Vec::new();
        for id in ids {
            let finished = self.jobs.get(id.as_str()).is_some_and(|j| j.is_finished());
            if finished {
                if let Some(job) = self.jobs.shift_remove(id.as_str()) {
                    removed.push(job);
                }
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.max_jobs
    }
}
