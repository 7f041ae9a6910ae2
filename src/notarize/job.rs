use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{NotarizeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Success,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }

    /// Legal moves are `pending -> success` and `pending -> error`.
    /// Staying in the same state is not a transition and is always allowed.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self == next || (self == JobStatus::Pending && next.is_terminal())
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// Status pushed by the notarization engine for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            error: None,
        }
    }

    pub fn success() -> Self {
        Self {
            status: JobStatus::Success,
            error: None,
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            error: Some(detail.into()),
        }
    }
}

/// One notarization attempt.
///
/// Everything except the status (and the error detail that comes with it) is
/// fixed once the job is built. Status only changes through [`advance`],
/// which enforces the `pending -> success | error` machine.
///
/// [`advance`]: NotarizationJob::advance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotarizationJob {
    pub id: String,
    pub url: String,
    pub method: String,
    pub headers: IndexMap<String, String>,
    pub body: String,
    pub max_sent_data: u64,
    pub max_recv_data: u64,
    pub notary_url: String,
    pub websocket_proxy_url: String,
    pub secret_headers: BTreeSet<String>,
    pub secret_resps: BTreeSet<String>,
    status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

impl NotarizationJob {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_pending(
        id: String,
        url: String,
        method: String,
        headers: IndexMap<String, String>,
        body: String,
        max_sent_data: u64,
        max_recv_data: u64,
        notary_url: String,
        websocket_proxy_url: String,
    ) -> Self {
        Self {
            id,
            url,
            method,
            headers,
            body,
            max_sent_data,
            max_recv_data,
            notary_url,
            websocket_proxy_url,
            secret_headers: BTreeSet::new(),
            secret_resps: BTreeSet::new(),
            status: JobStatus::Pending,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Failure detail attached by the engine, if the job ended in `error`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a report from the engine.
    ///
    /// Returns `Ok(true)` if the status changed, `Ok(false)` for a repeat of
    /// the current status, and an error for anything leaving a terminal state.
    pub(crate) fn advance(&mut self, report: &StatusReport) -> Result<bool> {
        if !self.status.can_transition_to(report.status) {
            return Err(NotarizeError::IllegalTransition {
                id: self.id.clone(),
                from: self.status,
                to: report.status,
            });
        }
        if self.status == report.status {
            return Ok(false);
        }

        self.status = report.status;
        if report.status == JobStatus::Error {
            self.error = Some(report.error.clone().unwrap_or_default());
        }
        self.completed_at = Some(Utc::now());
        Ok(true)
    }

    /// Plain HTTP/1.1 rendering of the notarized request.
    pub fn http_dump(&self) -> String {
        let request_line = format!("{} {} HTTP/1.1\n", self.method, self.url);
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}{}\n\n{}", request_line, headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> NotarizationJob {
        let mut headers = IndexMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "*/*".to_string());
        NotarizationJob::new_pending(
            "r1".to_string(),
            "https://x/graphql/query".to_string(),
            "POST".to_string(),
            headers,
            "{\"q\":1}".to_string(),
            1000,
            2000,
            "https://notary".to_string(),
            "wss://proxy".to_string(),
        )
    }

    #[test]
    fn status_display_matches_wire_form() {
        assert_eq!(JobStatus::Pending.to_string(), "pending");
        assert_eq!(
            serde_json::to_string(&JobStatus::Success).unwrap(),
            "\"success\""
        );
    }

    #[test]
    fn transition_table() {
        use JobStatus::*;
        assert!(Pending.can_transition_to(Success));
        assert!(Pending.can_transition_to(Error));
        assert!(Success.can_transition_to(Success));
        assert!(!Success.can_transition_to(Error));
        assert!(!Success.can_transition_to(Pending));
        assert!(!Error.can_transition_to(Success));
        assert!(!Error.can_transition_to(Pending));
    }

    #[test]
    fn new_job_is_pending() {
        let job = job();
        assert_eq!(job.status(), JobStatus::Pending);
        assert!(job.error().is_none());
        assert!(job.completed_at().is_none());
        assert!(job.secret_headers.is_empty());
        assert!(job.secret_resps.is_empty());
    }

    #[test]
    fn advance_to_success_once() {
        let mut job = job();
        assert!(job.advance(&StatusReport::success()).unwrap());
        assert!(!job.advance(&StatusReport::success()).unwrap());
        assert_eq!(job.status(), JobStatus::Success);
        assert!(job.completed_at().is_some());
    }

    #[test]
    fn advance_out_of_terminal_is_rejected() {
        let mut job = job();
        job.advance(&StatusReport::error("boom")).unwrap();
        assert_eq!(job.error(), Some("boom"));

        let err = job.advance(&StatusReport::success()).unwrap_err();
        assert!(matches!(err, NotarizeError::IllegalTransition { .. }));
        assert_eq!(job.status(), JobStatus::Error);
    }

    #[test]
    fn http_dump_layout() {
        let dump = job().http_dump();
        assert_eq!(
            dump,
            "POST https://x/graphql/query HTTP/1.1\n\
             Content-Type: application/json\n\
             Accept: */*\n\
             \n\
             {\"q\":1}"
        );
    }

    #[test]
    fn serializes_in_camel_case() {
        let value = serde_json::to_value(job()).unwrap();
        assert_eq!(value["id"], "r1");
        assert_eq!(value["maxSentData"], 1000);
        assert_eq!(value["websocketProxyUrl"], "wss://proxy");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["secretHeaders"], serde_json::json!([]));
        assert!(value.get("error").is_none());
    }
}
