use std::error::Error as StdError;
use std::time::Duration;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use jira_version_lib::api::{ApiResponse, VersionApi};
use jira_version_lib::errors::TransportError;
use jira_version_lib::inputs::Credentials;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use thiserror::Error;

pub use reqwest;

const API_PATH: [&str; 3] = ["rest", "api", "3"];

/// Problems building a [`JiraClient`]
#[derive(Debug, Error)]
pub enum ClientError {
  /// The base URL cannot have path segments appended
  #[error("Base URL cannot be used as a base: {0}")]
  NotABase(Url),
  /// The credentials do not fit in a header value
  #[error("Credentials cannot be encoded as an Authorization header")]
  BadCredentials,
}

/// Jira REST client for the version endpoints
///
/// Every HTTP status is handed back as an [`ApiResponse`]; only
/// connection-level faults become errors.
#[derive(Debug, Clone)]
pub struct JiraClient {
  client: reqwest::Client,
  base_url: Url,
  headers: HeaderMap,
  timeout: Option<Duration>,
}

fn basic_auth(credentials: &Credentials) -> Result<HeaderValue, ClientError> {
  let encoded = STANDARD.encode(format!("{}:{}", credentials.email, credentials.api_token));
  let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
    .map_err(|_| ClientError::BadCredentials)?;
  value.set_sensitive(true);
  Ok(value)
}

// reqwest only displays the outermost error, the cause is in the chain
fn describe(e: reqwest::Error) -> String {
  let e = e.without_url();
  let mut message = e.to_string();
  let mut source = e.source();
  while let Some(cause) = source {
    message.push_str(": ");
    message.push_str(&cause.to_string());
    source = cause.source();
  }
  message
}

impl JiraClient {
  pub fn new(client: reqwest::Client, base_url: Url, credentials: &Credentials) -> Result<Self, ClientError> {
    let mut base_url = base_url;
    if base_url.cannot_be_a_base() {
      return Err(ClientError::NotABase(base_url));
    }
    base_url.set_query(None);
    base_url.set_fragment(None);
    // credentials only travel in the Authorization header
    let _ = base_url.set_username("");
    let _ = base_url.set_password(None);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, basic_auth(credentials)?);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(Self {
      client,
      base_url,
      headers,
      timeout: None,
    })
  }

  /// Limit each request to `timeout`
  ///
  /// No limit is set by default, so only the underlying
  /// client's own connect and read timeouts apply.
  pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// `{base}/rest/api/3/{segments...}`, each segment escaped
  pub fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    // checked in new()
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(API_PATH).extend(segments);
    }
    url
  }

  pub fn versions_url(&self, project_key: &str) -> Url {
    self.endpoint(&["project", project_key, "versions"])
  }

  pub fn create_version_url(&self) -> Url {
    self.endpoint(&["version"])
  }

  fn req(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
    let req = self.client.request(method, url)
      .headers(self.headers.clone());
    match self.timeout {
      Some(timeout) => req.timeout(timeout),
      None => req,
    }
  }

  async fn send(&self, req: reqwest::RequestBuilder, url: &Url) -> Result<ApiResponse, TransportError> {
    let response = req.send().await.map_err(|e| TransportError::new(url, describe(e)))?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| TransportError::new(url, describe(e)))?;
    log::debug!("{} responded with status {}", url, status);
    Ok(ApiResponse { status, body })
  }

  pub async fn get(&self, url: Url) -> Result<ApiResponse, TransportError> {
    log::debug!("GET {}", url);
    self.send(self.req(Method::GET, url.clone()), &url).await
  }

  pub async fn post_json(&self, url: Url, body: String) -> Result<ApiResponse, TransportError> {
    log::debug!("POST {}", url);
    self.send(self.req(Method::POST, url.clone()).body(body), &url).await
  }
}

#[async_trait]
impl VersionApi for JiraClient {
  async fn list_versions(&self, project_key: &str) -> Result<ApiResponse, TransportError> {
    self.get(self.versions_url(project_key)).await
  }

  async fn create_version(&self, body: &str) -> Result<ApiResponse, TransportError> {
    self.post_json(self.create_version_url(), body.to_string()).await
  }
}
