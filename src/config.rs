use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NotarizeError, Result};

pub const DEFAULT_MAX_SENT_DATA: u64 = 4096;
pub const DEFAULT_MAX_RECV_DATA: u64 = 16384;
pub const DEFAULT_NOTARY_URL: &str = "https://notary.pse.dev";
pub const DEFAULT_WEBSOCKET_PROXY_URL: &str = "wss://notary.pse.dev/proxy";

/// Source of the four settings a job is prepared with.
///
/// Each accessor may fail on its own. Callers go through [`read_snapshot`],
/// which treats any single failure as a failure of the whole read.
#[async_trait]
pub trait ConfigReader: Send + Sync {
    async fn max_sent_data(&self) -> Result<u64>;
    async fn max_recv_data(&self) -> Result<u64>;
    async fn notary_url(&self) -> Result<String>;
    async fn websocket_proxy_url(&self) -> Result<String>;
}

/// The settings captured at build time and copied into a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub max_sent_data: u64,
    pub max_recv_data: u64,
    pub notary_url: String,
    pub websocket_proxy_url: String,
}

/// Run the four reads concurrently and wait for all of them.
pub async fn read_snapshot(reader: &dyn ConfigReader) -> Result<ConfigSnapshot> {
    let (max_sent_data, max_recv_data, notary_url, websocket_proxy_url) = tokio::try_join!(
        reader.max_sent_data(),
        reader.max_recv_data(),
        reader.notary_url(),
        reader.websocket_proxy_url(),
    )?;

    Ok(ConfigSnapshot {
        max_sent_data,
        max_recv_data,
        notary_url,
        websocket_proxy_url,
    })
}

/// Stored notarization settings, in the same shape the settings file uses.
///
/// Every field is optional in the file; missing keys take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotaryConfig {
    pub max_sent_data: u64,
    pub max_recv_data: u64,
    pub notary_url: String,
    pub websocket_proxy_url: String,
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            max_sent_data: DEFAULT_MAX_SENT_DATA,
            max_recv_data: DEFAULT_MAX_RECV_DATA,
            notary_url: DEFAULT_NOTARY_URL.to_string(),
            websocket_proxy_url: DEFAULT_WEBSOCKET_PROXY_URL.to_string(),
        }
    }
}

impl NotaryConfig {
    pub fn with_notary_url(mut self, url: impl Into<String>) -> Self {
        self.notary_url = url.into();
        self
    }

    pub fn with_websocket_proxy_url(mut self, url: impl Into<String>) -> Self {
        self.websocket_proxy_url = url.into();
        self
    }

    pub fn with_limits(mut self, max_sent_data: u64, max_recv_data: u64) -> Self {
        self.max_sent_data = max_sent_data;
        self.max_recv_data = max_recv_data;
        self
    }
}

#[async_trait]
impl ConfigReader for NotaryConfig {
    async fn max_sent_data(&self) -> Result<u64> {
        Ok(self.max_sent_data)
    }

    async fn max_recv_data(&self) -> Result<u64> {
        Ok(self.max_recv_data)
    }

    async fn notary_url(&self) -> Result<String> {
        Ok(self.notary_url.clone())
    }

    async fn websocket_proxy_url(&self) -> Result<String> {
        Ok(self.websocket_proxy_url.clone())
    }
}

/// Reads settings from a JSON file on every access.
///
/// The file is re-read per accessor so edits made between two triggers are
/// picked up without restarting.
#[derive(Debug, Clone)]
pub struct FileConfigReader {
    path: PathBuf,
}

impl FileConfigReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn load(&self) -> Result<NotaryConfig> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            NotarizeError::ConfigRead(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            NotarizeError::ConfigRead(format!("invalid settings in {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl ConfigReader for FileConfigReader {
    async fn max_sent_data(&self) -> Result<u64> {
        Ok(self.load().await?.max_sent_data)
    }

    async fn max_recv_data(&self) -> Result<u64> {
        Ok(self.load().await?.max_recv_data)
    }

    async fn notary_url(&self) -> Result<String> {
        Ok(self.load().await?.notary_url)
    }

    async fn websocket_proxy_url(&self) -> Result<String> {
        Ok(self.load().await?.websocket_proxy_url)
    }
}

/// Settings for the controller itself.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Maximum number of jobs tracked at once
    pub max_tracked_jobs: usize,
    /// Buffer size of the channel status reports are forwarded through
    pub report_buffer: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_tracked_jobs: 64,
            report_buffer: 32,
        }
    }
}

impl ControllerConfig {
    pub fn with_max_tracked_jobs(mut self, max_tracked_jobs: usize) -> Self {
        self.max_tracked_jobs = max_tracked_jobs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct FailingReader;

    #[async_trait]
    impl ConfigReader for FailingReader {
        async fn max_sent_data(&self) -> Result<u64> {
            Ok(1)
        }

        async fn max_recv_data(&self) -> Result<u64> {
            Ok(2)
        }

        async fn notary_url(&self) -> Result<String> {
            Err(NotarizeError::ConfigRead("storage unavailable".to_string()))
        }

        async fn websocket_proxy_url(&self) -> Result<String> {
            Ok("wss://proxy".to_string())
        }
    }

    #[test]
    fn notary_config_default() {
        let cfg = NotaryConfig::default();
        assert_eq!(cfg.max_sent_data, 4096);
        assert_eq!(cfg.max_recv_data, 16384);
        assert_eq!(cfg.notary_url, "https://notary.pse.dev");
        assert_eq!(cfg.websocket_proxy_url, "wss://notary.pse.dev/proxy");
    }

    #[test]
    fn notary_config_builders() {
        let cfg = NotaryConfig::default()
            .with_limits(1000, 2000)
            .with_notary_url("https://notary")
            .with_websocket_proxy_url("wss://proxy");
        assert_eq!(cfg.max_sent_data, 1000);
        assert_eq!(cfg.max_recv_data, 2000);
        assert_eq!(cfg.notary_url, "https://notary");
        assert_eq!(cfg.websocket_proxy_url, "wss://proxy");
    }

    #[test]
    fn notary_config_partial_json_uses_defaults() {
        let cfg: NotaryConfig = serde_json::from_str(r#"{"notaryUrl":"https://n"}"#).unwrap();
        assert_eq!(cfg.notary_url, "https://n");
        assert_eq!(cfg.max_sent_data, DEFAULT_MAX_SENT_DATA);
        assert_eq!(cfg.websocket_proxy_url, DEFAULT_WEBSOCKET_PROXY_URL);
    }

    #[tokio::test]
    async fn read_snapshot_collects_all_values() {
        let cfg = NotaryConfig::default().with_limits(10, 20);
        let snapshot = read_snapshot(&cfg).await.unwrap();
        assert_eq!(snapshot.max_sent_data, 10);
        assert_eq!(snapshot.max_recv_data, 20);
        assert_eq!(snapshot.notary_url, DEFAULT_NOTARY_URL);
    }

    #[tokio::test]
    async fn read_snapshot_fails_if_any_read_fails() {
        let err = read_snapshot(&FailingReader).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to prepare notarization: storage unavailable"
        );
    }

    /// Every read blocks until all four have started.
    struct RendezvousReader {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl ConfigReader for RendezvousReader {
        async fn max_sent_data(&self) -> Result<u64> {
            self.barrier.wait().await;
            Ok(1000)
        }

        async fn max_recv_data(&self) -> Result<u64> {
            self.barrier.wait().await;
            Ok(2000)
        }

        async fn notary_url(&self) -> Result<String> {
            self.barrier.wait().await;
            Ok("https://notary".to_string())
        }

        async fn websocket_proxy_url(&self) -> Result<String> {
            self.barrier.wait().await;
            Ok("wss://proxy".to_string())
        }
    }

    #[tokio::test]
    async fn read_snapshot_runs_reads_concurrently() {
        let reader = RendezvousReader {
            barrier: tokio::sync::Barrier::new(4),
        };

        let snapshot = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            read_snapshot(&reader),
        )
        .await
        .expect("reads ran one after another")
        .unwrap();
        assert_eq!(snapshot.max_sent_data, 1000);
        assert_eq!(snapshot.websocket_proxy_url, "wss://proxy");
    }

    #[tokio::test]
    async fn file_reader_reads_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"maxSentData":1000,"maxRecvData":2000,"notaryUrl":"https://notary","websocketProxyUrl":"wss://proxy"}}"#
        )
        .unwrap();

        let reader = FileConfigReader::new(file.path());
        let snapshot = read_snapshot(&reader).await.unwrap();
        assert_eq!(
            snapshot,
            ConfigSnapshot {
                max_sent_data: 1000,
                max_recv_data: 2000,
                notary_url: "https://notary".to_string(),
                websocket_proxy_url: "wss://proxy".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn file_reader_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let reader = FileConfigReader::new(dir.path().join("missing.json"));
        let err = reader.notary_url().await.unwrap_err();
        assert!(matches!(err, NotarizeError::ConfigRead(_)));
    }

    #[tokio::test]
    async fn file_reader_malformed_json_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let reader = FileConfigReader::new(file.path());
        let err = read_snapshot(&reader).await.unwrap_err();
        assert!(matches!(err, NotarizeError::ConfigRead(_)));
    }

    #[test]
    fn controller_config_default() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.max_tracked_jobs, 64);
        assert_eq!(cfg.report_buffer, 32);
        assert_eq!(cfg.with_max_tracked_jobs(2).max_tracked_jobs, 2);
    }
}
