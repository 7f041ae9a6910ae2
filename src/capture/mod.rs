//! Captured network requests and target selection.
//!
//! The capture layer itself lives outside this crate; [`RequestSource`] is
//! the read-only view the controller consumes. [`CaptureLog`] is the
//! in-memory implementation used by the CLI and tests.

pub mod log;
pub mod request;
pub mod selector;

pub use log::{CaptureLog, RequestSource};
pub use request::{Header, ObservedRequest};
pub use selector::{has_eligible_request, select_target};
