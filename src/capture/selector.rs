use crate::capture::ObservedRequest;
use crate::error::{NotarizeError, Result};

/// URL fragment identifying a GraphQL query request.
pub const GRAPHQL_QUERY_MARKER: &str = "graphql/query";

/// Pick the first request, in capture order, whose URL points at a GraphQL query.
pub fn select_target(requests: &[ObservedRequest]) -> Result<&ObservedRequest> {
    requests
        .iter()
        .find(|r| r.url.contains(GRAPHQL_QUERY_MARKER))
        .ok_or(NotarizeError::NoEligibleRequest)
}

pub fn has_eligible_request(requests: &[ObservedRequest]) -> bool {
    requests.iter().any(|r| r.url.contains(GRAPHQL_QUERY_MARKER))
}
