#[doc(no_inline)]
pub use jira_version_lib::api::{ApiResponse, VersionApi};
#[doc(no_inline)]
pub use jira_version_lib::errors::*;
#[doc(no_inline)]
pub use jira_version_lib::inputs::{Credentials, NoopMasker, RawInputs, SecretMasker, VersionInputs};
#[doc(no_inline)]
pub use jira_version_lib::retry::RetryPolicy;
#[doc(no_inline)]
pub use jira_version_lib::schemas::{JiraErrorPayload, VersionCreateRequest, VersionRecord};
#[doc(no_inline)]
pub use jira_version_lib::workflow::{VersionOutcome, VersionOutputs, VersionWorkflow};

#[doc(no_inline)]
#[cfg(feature = "http")]
pub use jira_version_http::{ClientError, JiraClient};
