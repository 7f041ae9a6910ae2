//! Shared fixtures for controller integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notarize_lite::capture::{CaptureLog, Header, ObservedRequest};
use notarize_lite::config::{ConfigReader, ControllerConfig, NotaryConfig};
use notarize_lite::engine::{JobHandle, NotarizationEngine, StatusReporter};
use notarize_lite::notarize::{NotarizationJob, StatusReport};
use notarize_lite::notify::RecordingNotifier;
use notarize_lite::{Controller, NotarizeError, Result};

/// The GraphQL request used throughout the scenarios.
pub fn graphql_request(id: &str) -> ObservedRequest {
    ObservedRequest::new(id, "POST", "https://x/graphql/query")
        .with_header(Header::new("Content-Type", "application/json"))
        .with_body("{\"q\":1}")
}

pub fn scenario_config() -> NotaryConfig {
    NotaryConfig::default()
        .with_limits(1000, 2000)
        .with_notary_url("https://notary")
        .with_websocket_proxy_url("wss://proxy")
}

/// Engine that keeps every reporter so tests decide when jobs finish.
#[derive(Default)]
pub struct ManualEngine {
    submitted: Mutex<Vec<NotarizationJob>>,
    reporters: Mutex<Vec<StatusReporter>>,
}

impl ManualEngine {
    pub fn submitted(&self) -> Vec<NotarizationJob> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn report(&self, job_id: &str, report: StatusReport) {
        let reporters = self.reporters.lock().unwrap();
        let reporter = reporters
            .iter()
            .find(|r| r.job_id() == job_id)
            .expect("job was never submitted");
        reporter.report(report);
    }

    /// Drop the reporter without a terminal report.
    pub fn abandon(&self, job_id: &str) {
        self.reporters.lock().unwrap().retain(|r| r.job_id() != job_id);
    }
}

impl NotarizationEngine for ManualEngine {
    fn submit(&self, job: &NotarizationJob) -> Result<JobHandle> {
        let (reporter, handle) = JobHandle::channel(job.id.clone());
        self.submitted.lock().unwrap().push(job.clone());
        self.reporters.lock().unwrap().push(reporter);
        Ok(handle)
    }
}

/// Engine whose queue rejects everything.
pub struct RejectingEngine;

impl NotarizationEngine for RejectingEngine {
    fn submit(&self, _job: &NotarizationJob) -> Result<JobHandle> {
        Err(NotarizeError::Submission("engine queue closed".to_string()))
    }
}

/// Settings store where the proxy URL cannot be read.
pub struct BrokenSettings;

#[async_trait]
impl ConfigReader for BrokenSettings {
    async fn max_sent_data(&self) -> Result<u64> {
        Ok(1000)
    }

    async fn max_recv_data(&self) -> Result<u64> {
        Ok(2000)
    }

    async fn notary_url(&self) -> Result<String> {
        Ok("https://notary".to_string())
    }

    async fn websocket_proxy_url(&self) -> Result<String> {
        Err(NotarizeError::ConfigRead("storage read failed".to_string()))
    }
}

pub struct Fixture {
    pub controller: Controller,
    pub capture: CaptureLog,
    pub engine: Arc<ManualEngine>,
    pub notifier: RecordingNotifier,
}

pub fn fixture(requests: Vec<ObservedRequest>) -> Fixture {
    fixture_with(requests, Arc::new(scenario_config()))
}

pub fn fixture_with(requests: Vec<ObservedRequest>, settings: Arc<dyn ConfigReader>) -> Fixture {
    let capture = CaptureLog::from_requests(requests);
    let engine = Arc::new(ManualEngine::default());
    let notifier = RecordingNotifier::new();
    let controller = Controller::new(
        ControllerConfig::default(),
        Arc::new(capture.clone()),
        settings,
        engine.clone(),
        Arc::new(notifier.clone()),
    );
    Fixture {
        controller,
        capture,
        engine,
        notifier,
    }
}
