pub mod capture;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod notarize;
pub mod notify;
pub mod shutdown;

pub use controller::{Affordance, ControlCommand, Controller};
pub use error::{NotarizeError, Result};
