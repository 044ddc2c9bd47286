//! Jira Version Core Library
//!
//! Finds or creates a version in a Jira project. The HTTP transport is
//! abstracted behind [`api::VersionApi`]; see the `jira_version_http`
//! crate for the reqwest implementation.
#![warn(missing_docs)]

pub mod errors;
pub mod schemas;
pub mod inputs;
pub mod api;
pub mod retry;
pub mod workflow;

pub use backon;
pub use url::Url;
