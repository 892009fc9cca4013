//! Audio file handling: accumulating chunk audio and placing the final file.

pub mod appender;
pub mod publisher;

pub use appender::{append_audio, create_scratch, rewind_scratch};
pub use publisher::publish;
