use async_trait::async_trait;
use crate::errors::TransportError;

/// Raw outcome of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
  /// HTTP status code
  pub status: u16,
  /// Response body, uninterpreted
  pub body: String,
}

impl ApiResponse {
  /// Create a new ApiResponse
  pub fn new<B: Into<String>>(status: u16, body: B) -> Self {
    Self { status, body: body.into() }
  }

  /// Status is in `[200, 300)`
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Status is 429 Too Many Requests
  pub fn is_rate_limited(&self) -> bool {
    self.status == 429
  }
}

/// The calls the version workflow makes against Jira
///
/// Implementations return every HTTP status as an ordinary
/// [`ApiResponse`]. Only connection-level faults are errors.
#[async_trait]
pub trait VersionApi: Send + Sync {
  /// `GET /rest/api/3/project/{project_key}/versions`
  async fn list_versions(&self, project_key: &str) -> Result<ApiResponse, TransportError>;

  /// `POST /rest/api/3/version` with an already serialized JSON body
  async fn create_version(&self, body: &str) -> Result<ApiResponse, TransportError>;
}
