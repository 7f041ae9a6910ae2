use indexmap::IndexMap;

use crate::capture::{Header, ObservedRequest};
use crate::config::{read_snapshot, ConfigReader, ConfigSnapshot};
use crate::error::{NotarizeError, Result};
use crate::notarize::job::NotarizationJob;

/// Fold the captured header list into a map.
///
/// A repeated name keeps the position of its first occurrence and the value
/// of its last. A header without a value maps to an empty string.
pub fn flatten_headers(headers: &[Header]) -> IndexMap<String, String> {
    headers.iter().fold(IndexMap::new(), |mut acc, header| {
        acc.insert(
            header.name.clone(),
            header.value.clone().unwrap_or_default(),
        );
        acc
    })
}

/// Build a pending job from a selected request and a settings snapshot.
pub fn build(request: &ObservedRequest, config: ConfigSnapshot) -> NotarizationJob {
    NotarizationJob::new_pending(
        request.request_id.clone(),
        request.url.clone(),
        request.method.clone(),
        flatten_headers(&request.request_headers),
        request.request_body.clone().unwrap_or_default(),
        config.max_sent_data,
        config.max_recv_data,
        config.notary_url,
        config.websocket_proxy_url,
    )
}

/// Read the settings and build the job. Nothing is built if any read fails.
pub async fn prepare(request: &ObservedRequest, reader: &dyn ConfigReader) -> Result<NotarizationJob> {
    let snapshot = read_snapshot(reader).await.map_err(|e| match e {
        NotarizeError::ConfigRead(_) => e,
        other => NotarizeError::ConfigRead(other.to_string()),
    })?;

    let job = build(request, snapshot);
    tracing::debug!(
        job_id = %job.id,
        method = %job.method,
        url = %job.url,
        headers = job.headers.len(),
        "Prepared notarization job"
    );
    Ok(job)
}
