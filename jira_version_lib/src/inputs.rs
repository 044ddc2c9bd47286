use std::fmt;
use url::Url;
use crate::errors::InputError;
use crate::schemas::VersionCreateRequest;

/// Receives secret values so the host can scrub them from its logs
///
/// The workflow never depends on masking for its own decisions; a run
/// behaves the same with [`NoopMasker`] as with a real masker.
pub trait SecretMasker {
  /// Register a value that must never appear in log output
  fn mask(&self, secret: &str);
}

/// Masker for hosts without a masking facility
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMasker;

impl SecretMasker for NoopMasker {
  fn mask(&self, _secret: &str) {}
}

/// Jira account email and API token
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
  /// Account email (user identifier)
  pub email: String,
  /// API token
  pub api_token: String,
}

impl Credentials {
  /// Create a new credential pair
  pub fn new<E: Into<String>, T: Into<String>>(email: E, api_token: T) -> Self {
    Self {
      email: email.into(),
      api_token: api_token.into(),
    }
  }
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("email", &"***")
      .field("api_token", &"***")
      .finish()
  }
}

/// Everything a single run needs, validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInputs {
  /// Absolute base URL of the Jira site
  pub base_url: Url,
  /// Key of the target project
  pub project_key: String,
  /// Secrets used for Basic authentication
  pub credentials: Credentials,
  /// Name of the version to find or create
  pub version_name: String,
  /// Description for a newly created version
  pub version_description: String,
  /// Whether a newly created version is marked released
  pub released: bool,
  /// Look for an existing version with the same name before creating
  pub check_if_exists: bool,
}

/// Raw textual inputs, as handed over by the host platform
///
/// Not `Debug`, it holds the credentials in the clear.
#[derive(Clone, Default)]
pub struct RawInputs {
  #[allow(missing_docs)]
  pub base_url: String,
  #[allow(missing_docs)]
  pub project_key: String,
  #[allow(missing_docs)]
  pub user_email: String,
  #[allow(missing_docs)]
  pub api_token: String,
  #[allow(missing_docs)]
  pub version_name: String,
  #[allow(missing_docs)]
  pub version_description: Option<String>,
  #[allow(missing_docs)]
  pub released: bool,
  #[allow(missing_docs)]
  pub check_if_exists: bool,
}

fn required(name: &'static str, value: &str) -> Result<String, InputError> {
  let value = value.trim();
  if value.is_empty() {
    return Err(InputError::Missing(name));
  }
  Ok(value.to_string())
}

/// Parse a boolean input using the host's grammar
///
/// Accepts `true`, `True`, `TRUE`, `false`, `False` and `FALSE`.
pub fn parse_boolean(name: &str, value: &str) -> Result<bool, InputError> {
  match value.trim() {
    "true" | "True" | "TRUE" => Ok(true),
    "false" | "False" | "FALSE" => Ok(false),
    other => Err(InputError::BadBoolean { name: name.to_string(), value: other.to_string() }),
  }
}

// user:password@ in the authority is replaced before a URL is echoed
fn redact_userinfo(raw: &str) -> String {
  let (scheme, rest) = match raw.split_once("://") {
    Some(parts) => parts,
    None => return raw.to_string(),
  };
  let authority_end = rest.find(|c: char| matches!(c, '/' | '?' | '#')).unwrap_or(rest.len());
  match rest[..authority_end].rfind('@') {
    Some(at) => format!("{}://***@{}", scheme, &rest[at + 1..]),
    None => raw.to_string(),
  }
}

/// Parse and check a Jira base URL
///
/// Any userinfo is dropped from the result and redacted in errors,
/// credentials are supplied separately.
pub fn parse_base_url(raw: &str) -> Result<Url, InputError> {
  let raw = required("jira-base-url", raw)?;
  let shown = redact_userinfo(&raw);
  let mut url = Url::parse(&raw).map_err(|e| InputError::BadUrl { url: shown.clone(), reason: e.to_string() })?;
  match url.scheme() {
    "http" | "https" => {},
    other => return Err(InputError::BadUrl { url: shown, reason: format!("unsupported scheme {}", other) }),
  }
  if url.cannot_be_a_base() {
    return Err(InputError::BadUrl { url: shown, reason: "not a base URL".into() });
  }
  let _ = url.set_username("");
  let _ = url.set_password(None);
  Ok(url)
}

impl TryFrom<RawInputs> for VersionInputs {
  type Error = InputError;

  fn try_from(raw: RawInputs) -> Result<Self, Self::Error> {
    let base_url = parse_base_url(&raw.base_url)?;
    let project_key = required("jira-project-key", &raw.project_key)?;
    let email = required("jira-user-email", &raw.user_email)?;
    let api_token = required("jira-api-token", &raw.api_token)?;
    let version_name = required("version-name", &raw.version_name)?;
    Ok(Self {
      base_url,
      project_key,
      credentials: Credentials { email, api_token },
      version_name,
      version_description: raw.version_description.unwrap_or_default(),
      released: raw.released,
      check_if_exists: raw.check_if_exists,
    })
  }
}

impl VersionInputs {
  /// Hand both credential values to the masker
  ///
  /// Call before anything is logged.
  pub fn mask_secrets(&self, masker: &dyn SecretMasker) {
    masker.mask(&self.credentials.email);
    masker.mask(&self.credentials.api_token);
  }

  /// Payload for creating the requested version
  pub fn create_request(&self) -> VersionCreateRequest {
    VersionCreateRequest {
      name: self.version_name.clone(),
      description: self.version_description.clone(),
      project_key: self.project_key.clone(),
      released: self.released,
    }
  }
}
