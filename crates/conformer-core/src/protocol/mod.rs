//! The action container control protocol: `POST /init` once, then `POST /run`
//! per activation.

pub mod client;
pub mod payload;

pub use client::ActionClient;
pub use payload::{is_binary_code, InitRequest, RunRequest, RunResult, DEFAULT_ENTRY_POINT};
