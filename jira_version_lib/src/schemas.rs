//! Wire shapes exchanged with the Jira REST API (`/rest/api/3`)
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Payload for `POST /rest/api/3/version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionCreateRequest {
  /// Version name, never empty
  pub name: String,
  /// Free text description, empty when not supplied
  pub description: String,
  /// Key of the project the version belongs to
  #[serde(rename = "project")]
  pub project_key: String,
  /// Whether the version is already released
  pub released: bool,
}

impl VersionCreateRequest {
  /// Serialize to the JSON body sent to Jira
  pub fn to_json(&self) -> String {
    // a struct of strings and a bool cannot fail to serialize
    serde_json::to_string(self).unwrap_or_default()
  }
}

/// A version as Jira returns it from lookups and creation
///
/// Only `id`, `self` and `name` are interpreted. Everything else the
/// API sends is kept in `extra` so new fields never break parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
  /// Opaque identifier, numeric ids are kept as text
  #[serde(deserialize_with = "id_as_text")]
  pub id: String,
  /// Canonical resource URL
  #[serde(rename = "self")]
  pub self_url: String,
  /// Version name
  pub name: String,
  /// Fields this crate does not interpret
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

fn id_as_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  match Value::deserialize(deserializer)? {
    Value::String(s) => Ok(s),
    Value::Number(n) => Ok(n.to_string()),
    other => Err(serde::de::Error::custom(format!("expected a string or number id, found {}", other))),
  }
}

/// Error body returned by Jira for rejected requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraErrorPayload {
  /// General messages not tied to a field
  #[serde(default)]
  pub error_messages: Vec<String>,
  /// Messages keyed by the offending field
  #[serde(default)]
  pub errors: Map<String, Value>,
}

impl JiraErrorPayload {
  /// Parse an error body, `None` if it is not Jira's error shape
  pub fn parse(body: &str) -> Option<Self> {
    let payload: Self = serde_json::from_str(body).ok()?;
    if payload.is_empty() {
      return None;
    }
    Some(payload)
  }

  /// True when neither general nor field messages are present
  pub fn is_empty(&self) -> bool {
    self.error_messages.is_empty() && self.errors.is_empty()
  }

  /// One line summary, e.g. `A version with this name already exists; name: required`
  pub fn summary(&self) -> String {
    let fields = self.errors.iter().map(|(field, message)| match message {
      Value::String(s) => format!("{}: {}", field, s),
      other => format!("{}: {}", field, other),
    });
    self.error_messages.iter()
      .cloned()
      .chain(fields)
      .collect::<Vec<_>>()
      .join("; ")
  }
}
