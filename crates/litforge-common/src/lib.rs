//! litforge-common — Shared error type and sandboxed HTTP client used across all Litforge crates.

pub mod error;
pub mod sandbox;

pub use error::{LitforgeError, Result};
pub use sandbox::SandboxClient;
