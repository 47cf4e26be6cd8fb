//! litforge-agent — Literature collection task runner.

pub mod agent;
pub mod baseline;
pub mod config;
pub mod report;
pub mod table;

pub use agent::{LiteratureAgent, Task, TaskResult};
