use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::capture::ObservedRequest;
use crate::error::Result;

/// Read-only view over the requests the capture layer has recorded so far.
#[async_trait]
pub trait RequestSource: Send + Sync {
    /// Current requests in capture order. May be empty.
    async fn requests(&self) -> Vec<ObservedRequest>;
}

/// In-memory capture log.
///
/// Clones share the same underlying log, so the capture side can keep
/// recording while the controller holds a handle for reading.
#[derive(Debug, Clone, Default)]
pub struct CaptureLog {
    entries: Arc<RwLock<Vec<ObservedRequest>>>,
}

impl CaptureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_requests(requests: Vec<ObservedRequest>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(requests)),
        }
    }

    /// Load a capture log from a JSON array of requests.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let requests: Vec<ObservedRequest> = serde_json::from_str(&raw)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            count = requests.len(),
            "Loaded captured requests"
        );
        Ok(Self::from_requests(requests))
    }

    pub async fn record(&self, request: ObservedRequest) {
        self.entries.write().await.push(request);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RequestSource for CaptureLog {
    async fn requests(&self) -> Vec<ObservedRequest> {
        self.entries.read().await.clone()
    }
}
