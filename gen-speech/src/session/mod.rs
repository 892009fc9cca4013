//! Conversion journal with checkpoint/resume support.

mod persistence;
mod types;

pub use persistence::{SessionLock, SessionStore};
pub use types::Session;
