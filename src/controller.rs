use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::capture::{has_eligible_request, select_target, RequestSource};
use crate::config::{ConfigReader, ControllerConfig};
use crate::engine::{JobHandle, NotarizationEngine};
use crate::error::{NotarizeError, Result};
use crate::notarize::{prepare, JobBook, NotarizationJob, StatusReport, StatusTracker};
use crate::notify::{Notice, Notifier};

/// What the trigger control should look like right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordance {
    pub is_processing: bool,
    pub has_eligible_request: bool,
}

impl Affordance {
    pub fn enabled(&self) -> bool {
        !self.is_processing && self.has_eligible_request
    }

    pub fn label(&self) -> &'static str {
        if self.is_processing {
            "Processing..."
        } else {
            "Verify"
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        if self.has_eligible_request {
            None
        } else {
            Some("Reload the page.")
        }
    }
}

/// Requests accepted by [`Controller::run`].
#[derive(Debug)]
pub enum ControlCommand {
    Trigger {
        respond_to: oneshot::Sender<Result<String>>,
    },
    Affordance {
        respond_to: oneshot::Sender<Affordance>,
    },
}

/// Forwarded from a job's status channel into the controller.
#[derive(Debug)]
enum JobEvent {
    Report { job_id: String, report: StatusReport },
    Closed { job_id: String },
}

enum LoopEvent {
    Shutdown,
    Command(Option<ControlCommand>),
    Job(JobEvent),
}

/// Owns the trigger pipeline and all state it mutates.
///
/// `is_processing` is set by the submit path and cleared by the status sweep
/// once no submitted job is left pending. The previous-status memo lives in
/// the [`StatusTracker`]. Neither is reachable from outside.
pub struct Controller {
    config: ControllerConfig,
    source: Arc<dyn RequestSource>,
    settings: Arc<dyn ConfigReader>,
    engine: Arc<dyn NotarizationEngine>,
    notifier: Arc<dyn Notifier>,
    book: JobBook,
    tracker: StatusTracker,
    is_processing: bool,
    finished: VecDeque<NotarizationJob>,
    events_tx: mpsc::Sender<JobEvent>,
    events_rx: mpsc::Receiver<JobEvent>,
}

impl Controller {
    pub fn new(
        config: ControllerConfig,
        source: Arc<dyn RequestSource>,
        settings: Arc<dyn ConfigReader>,
        engine: Arc<dyn NotarizationEngine>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.report_buffer.max(1));
        Self {
            book: JobBook::with_capacity(config.max_tracked_jobs),
            tracker: StatusTracker::new(),
            is_processing: false,
            finished: VecDeque::new(),
            config,
            source,
            settings,
            engine,
            notifier,
            events_tx,
            events_rx,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn book(&self) -> &JobBook {
        &self.book
    }

    pub async fn affordance(&self) -> Affordance {
        let requests = self.source.requests().await;
        Affordance {
            is_processing: self.is_processing,
            has_eligible_request: has_eligible_request(&requests),
        }
    }

    /// Select, prepare and submit. Returns the submitted job id.
    ///
    /// Every failure is delivered to the notifier before it is returned,
    /// except [`NotarizeError::AlreadyProcessing`], which corresponds to a
    /// disabled control rather than a user-visible error.
    pub async fn trigger(&mut self) -> Result<String> {
        if self.is_processing {
            tracing::debug!("Trigger ignored while a notarization is processing");
            return Err(NotarizeError::AlreadyProcessing);
        }

        let requests = self.source.requests().await;
        let target = match select_target(&requests) {
            Ok(target) => target.clone(),
            Err(e) => return Err(self.surface(e)),
        };
        tracing::info!(request_id = %target.request_id, url = %target.url, "Selected request");

        let job = match prepare(&target, self.settings.as_ref()).await {
            Ok(job) => job,
            Err(e) => return Err(self.surface(e)),
        };

        self.submit(job).map_err(|e| self.surface(e))
    }

    fn submit(&mut self, job: NotarizationJob) -> Result<String> {
        self.book
            .check_admission(&job.id)
            .map_err(|e| NotarizeError::Submission(e.to_string()))?;

        let handle = self.engine.submit(&job).map_err(|e| match e {
            NotarizeError::Submission(_) => e,
            other => NotarizeError::Submission(other.to_string()),
        })?;

        let job_id = job.id.clone();
        self.book.insert(job)?;
        self.is_processing = true;
        self.forward(handle);

        tracing::info!(job_id = %job_id, "Job submitted for notarization");
        Ok(job_id)
    }

    /// Relay a job's status channel into the controller's event queue.
    /// Stops after the first terminal report.
    fn forward(&self, mut handle: JobHandle) {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let job_id = handle.job_id().to_string();
            while let Some(report) = handle.changed().await {
                let terminal = report.status.is_terminal();
                let event = JobEvent::Report {
                    job_id: job_id.clone(),
                    report,
                };
                if tx.send(event).await.is_err() || terminal {
                    return;
                }
            }
            let _ = tx.send(JobEvent::Closed { job_id }).await;
        });
    }

    fn surface(&self, error: NotarizeError) -> NotarizeError {
        tracing::warn!(error = %error, "Notarization attempt aborted");
        self.notifier.notify(Notice::Error(error.to_string()));
        error
    }

    /// Record a status report for a tracked job. Returns whether it changed.
    pub(crate) fn apply_report(&mut self, job_id: &str, report: &StatusReport) -> Result<bool> {
        self.book.apply_report(job_id, report)
    }

    /// One pass of the status tracker over every tracked job.
    ///
    /// Each terminal transition is delivered exactly once. Jobs whose outcome
    /// was delivered stop being tracked and move to the finished list.
    pub fn sweep(&mut self) -> Vec<Notice> {
        let outcomes = self.tracker.observe(self.book.jobs());
        if outcomes.is_empty() {
            return Vec::new();
        }

        let ids: Vec<String> = outcomes.iter().map(|o| o.job_id().to_string()).collect();
        let notices: Vec<Notice> = outcomes
            .into_iter()
            .map(|o| Notice::Alert(o.message().to_string()))
            .collect();
        for notice in &notices {
            self.notifier.notify(notice.clone());
        }

        for job in self.book.remove_finished(&ids) {
            self.tracker.forget(&job.id);
            if self.finished.len() >= self.config.max_tracked_jobs {
                self.finished.pop_front();
            }
            self.finished.push_back(job);
        }
        self.is_processing = self.book.has_pending();

        notices
    }

    /// Wait for the next pushed status, apply it and sweep.
    pub async fn process_next_report(&mut self) -> Vec<Notice> {
        match self.events_rx.recv().await {
            Some(event) => self.handle_event(event),
            None => Vec::new(),
        }
    }

    fn handle_event(&mut self, event: JobEvent) -> Vec<Notice> {
        match event {
            JobEvent::Report { job_id, report } => {
                if let Err(e) = self.apply_report(&job_id, &report) {
                    tracing::warn!(job_id = %job_id, error = %e, "Status report rejected");
                }
                self.sweep()
            }
            JobEvent::Closed { job_id } => {
                if self.book.get(&job_id).is_some_and(|j| !j.is_finished()) {
                    tracing::warn!(
                        job_id = %job_id,
                        "Engine stopped reporting before the job finished"
                    );
                }
                Vec::new()
            }
        }
    }

    /// Jobs whose outcome has been delivered, oldest first. Drains the list.
    pub fn take_finished(&mut self) -> Vec<NotarizationJob> {
        self.finished.drain(..).collect()
    }

    /// Serve commands and status reports on the current task.
    ///
    /// Runs until `shutdown` is cancelled, or until the command channel is
    /// closed and no submitted job is still pending. Returns the finished jobs.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<ControlCommand>,
        shutdown: CancellationToken,
    ) -> Vec<NotarizationJob> {
        let mut commands_open = true;

        loop {
            if !commands_open && !self.is_processing {
                tracing::debug!("No commands and nothing in flight, stopping");
                break;
            }

            let event = tokio::select! {
                _ = shutdown.cancelled() => LoopEvent::Shutdown,
                cmd = commands.recv(), if commands_open => LoopEvent::Command(cmd),
                Some(event) = self.events_rx.recv() => LoopEvent::Job(event),
            };

            match event {
                LoopEvent::Shutdown => {
                    if self.is_processing {
                        tracing::warn!(
                            pending = self.book.pending_jobs().len(),
                            "Shutting down with jobs still pending"
                        );
                    }
                    break;
                }
                LoopEvent::Command(None) => commands_open = false,
                LoopEvent::Command(Some(ControlCommand::Trigger { respond_to })) => {
                    let result = self.trigger().await;
                    let _ = respond_to.send(result);
                }
                LoopEvent::Command(Some(ControlCommand::Affordance { respond_to })) => {
                    let _ = respond_to.send(self.affordance().await);
                }
                LoopEvent::Job(event) => {
                    self.handle_event(event);
                }
            }
        }

        self.take_finished()
    }
}
