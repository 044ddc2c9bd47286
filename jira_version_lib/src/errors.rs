use thiserror::Error;

/// A connection-level failure while talking to Jira
///
/// This covers DNS failures, refused connections, timeouts and
/// interrupted bodies. An HTTP status code, whatever its value,
/// is never a transport error.
#[derive(Debug, Error)]
#[error("Request to {url} failed: {message}")]
pub struct TransportError {
  /// The URL that was being requested
  pub url: String,
  /// Description of the underlying fault
  pub message: String,
}

impl TransportError {
  /// Create a new TransportError
  pub fn new<U: ToString, M: ToString>(url: U, message: M) -> Self {
    Self {
      url: url.to_string(),
      message: message.to_string(),
    }
  }
}

/// Errors produced while validating the step inputs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
  /// A required input was absent or blank
  #[error("Input required and not supplied: {0}")]
  Missing(&'static str),
  /// The base URL could not be used
  #[allow(missing_docs)]
  #[error("Invalid Jira base URL {url}: {reason}")]
  BadUrl { url: String, reason: String },
  /// A boolean input did not follow the boolean grammar
  #[allow(missing_docs)]
  #[error("Input does not meet boolean grammar: {name} = {value:?} (expected true|True|TRUE|false|False|FALSE)")]
  BadBoolean { name: String, value: String },
}

/// Every way a version run can end in failure
#[derive(Debug, Error)]
pub enum VersionError {
  /// The inputs were rejected before any request was made
  #[error("Invalid input: {0}")]
  InvalidInput(#[from] InputError),
  /// A request could not be completed at the connection level
  #[error("Transport failure: {0}")]
  Transport(#[from] TransportError),
  /// Jira answered the create request with a non-2xx status
  ///
  /// This includes rate limiting that outlasted the retry budget.
  #[allow(missing_docs)]
  #[error("Failed to create version. Status: {status}. {detail}")]
  Http { status: u16, detail: String },
  /// Jira reported success but the body was not a version
  #[error("Failed to parse version response: {0}")]
  Parse(#[source] serde_json::Error),
}

impl VersionError {
  /// The HTTP status code behind this error, if there was one
  pub fn status(&self) -> Option<u16> {
    match self {
      VersionError::Http { status, .. } => Some(*status),
      _ => None,
    }
  }
}
