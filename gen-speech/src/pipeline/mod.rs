//! Conversion pipeline: the state machine, its operations, and the harness that runs them.

pub mod conversion;
pub mod progress;
pub mod runner;
pub mod steps;

pub use conversion::Conversion;
pub use runner::{Runner, StepPolicies};
pub use steps::LocalSteps;
