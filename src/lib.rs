#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]

pub use jira_version_lib;
pub mod prelude;

#[cfg(feature = "http")]
pub use jira_version_http;
