pub mod book;
pub mod builder;
pub mod job;
pub mod tracker;

pub use book::JobBook;
pub use builder::{build, flatten_headers, prepare};
pub use job::{JobStatus, NotarizationJob, StatusReport};
pub use tracker::{Outcome, StatusTracker};
