use backon::{Sleeper, TokioSleeper};
use crate::api::{ApiResponse, VersionApi};
use crate::errors::VersionError;
use crate::inputs::VersionInputs;
use crate::retry::{send_with_retry, RetryPolicy};
use crate::schemas::{JiraErrorPayload, VersionCreateRequest, VersionRecord};

/// Name of the output carrying the version id
pub const OUTPUT_VERSION_ID: &str = "version-id";
/// Name of the output carrying the version URL
pub const OUTPUT_VERSION_URL: &str = "version-url";

/// How a successful run obtained its version
#[derive(Debug, Clone, PartialEq)]
pub enum VersionOutcome {
  /// A version with the requested name was already in the project
  Existing(VersionRecord),
  /// The version was created by this run
  Created(VersionRecord),
}

impl VersionOutcome {
  /// The version this run resolved to
  pub fn record(&self) -> &VersionRecord {
    match self {
      VersionOutcome::Existing(record) => record,
      VersionOutcome::Created(record) => record,
    }
  }

  /// Whether this run created the version
  pub fn was_created(&self) -> bool {
    matches!(self, VersionOutcome::Created(_))
  }

  /// The values published when the run succeeds
  pub fn outputs(&self) -> VersionOutputs {
    let record = self.record();
    VersionOutputs {
      version_id: record.id.clone(),
      version_url: record.self_url.clone(),
    }
  }
}

/// Step outputs, only ever produced on success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionOutputs {
  /// `version-id`
  pub version_id: String,
  /// `version-url`
  pub version_url: String,
}

impl VersionOutputs {
  /// Outputs as `(name, value)` pairs
  pub fn pairs(&self) -> [(&'static str, &str); 2] {
    [
      (OUTPUT_VERSION_ID, self.version_id.as_str()),
      (OUTPUT_VERSION_URL, self.version_url.as_str()),
    ]
  }
}

/// First version whose name is exactly `name` (case-sensitive)
pub fn find_by_name<I: IntoIterator<Item = VersionRecord>>(versions: I, name: &str) -> Option<VersionRecord> {
  versions.into_iter().find(|v| v.name == name)
}

/// Turn the final create response into a version or a failure
///
/// Any 2xx must carry a version, otherwise it is a parse failure.
/// Other statuses are reported with Jira's error messages when the
/// body has that shape, or with the raw body.
pub fn classify_response(response: ApiResponse) -> Result<VersionRecord, VersionError> {
  if response.is_success() {
    return serde_json::from_str(&response.body).map_err(VersionError::Parse);
  }
  let detail = match JiraErrorPayload::parse(&response.body) {
    Some(payload) => format!("Error: {}", payload.summary()),
    None => format!("Response: {}", response.body),
  };
  log::debug!("Jira error body: {}", response.body);
  Err(VersionError::Http { status: response.status, detail })
}

/// Looks up and creates versions through a [`VersionApi`]
///
/// Generic over the sleeper used between retries so tests can run the
/// full schedule without waiting.
#[derive(Debug, Clone)]
pub struct VersionWorkflow<A, S = TokioSleeper> {
  api: A,
  policy: RetryPolicy,
  sleeper: S,
}

impl<A: VersionApi> VersionWorkflow<A> {
  /// Workflow with the default retry policy and tokio's timer
  pub fn new(api: A) -> Self {
    Self {
      api,
      policy: RetryPolicy::default(),
      sleeper: TokioSleeper,
    }
  }
}

impl<A: VersionApi, S: Sleeper + Clone> VersionWorkflow<A, S> {
  /// Replace the retry policy
  pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Replace the sleeper used between retries
  pub fn with_sleeper<S2: Sleeper + Clone>(self, sleeper: S2) -> VersionWorkflow<A, S2> {
    VersionWorkflow {
      api: self.api,
      policy: self.policy,
      sleeper,
    }
  }

  /// The underlying api
  pub fn api(&self) -> &A {
    &self.api
  }

  /// The active retry policy
  pub fn policy(&self) -> &RetryPolicy {
    &self.policy
  }

  /// Run the whole step: optional lookup, then creation
  pub async fn run(&self, inputs: &VersionInputs) -> Result<VersionOutcome, VersionError> {
    if inputs.check_if_exists {
      if let Some(record) = self.find_existing(&inputs.project_key, &inputs.version_name).await? {
        log::info!("Version {} already exists with ID {}", record.name, record.id);
        return Ok(VersionOutcome::Existing(record));
      }
    }

    let record = self.create(&inputs.create_request()).await?;
    log::info!("Created version {} with ID {}", record.name, record.id);
    Ok(VersionOutcome::Created(record))
  }

  /// Look for a version named `name` in the project
  ///
  /// Only a transport fault is an error. A non-200 status or a body
  /// that is not a list of versions counts as "not found".
  pub async fn find_existing(&self, project_key: &str, name: &str) -> Result<Option<VersionRecord>, VersionError> {
    log::info!("Checking if version {} exists in project {}", name, project_key);
    let response = self.api.list_versions(project_key).await?;
    if response.status != 200 {
      log::warn!(
        "Could not list versions of project {} (status {}), continuing with creation",
        project_key,
        response.status
      );
      return Ok(None);
    }
    let versions: Vec<VersionRecord> = match serde_json::from_str(&response.body) {
      Ok(versions) => versions,
      Err(e) => {
        log::warn!("Could not parse versions of project {}: {}, continuing with creation", project_key, e);
        return Ok(None);
      },
    };
    log::debug!("Project {} has {} versions", project_key, versions.len());
    Ok(find_by_name(versions, name))
  }

  /// Create a version, retrying while rate limited
  pub async fn create(&self, request: &VersionCreateRequest) -> Result<VersionRecord, VersionError> {
    log::info!("Creating version {} in project {}", request.name, request.project_key);
    let body = request.to_json();
    let response = send_with_retry(
      &self.policy,
      self.sleeper.clone(),
      || self.api.create_version(&body),
    ).await?;
    classify_response(response)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::errors::TransportError;
  use crate::inputs::{test::raw, RawInputs};
  use async_trait::async_trait;
  use std::collections::VecDeque;
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  #[derive(Default)]
  struct ScriptedApi {
    list: Mutex<Option<Result<ApiResponse, TransportError>>>,
    posts: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    list_calls: Mutex<Vec<String>>,
    post_bodies: Mutex<Vec<String>>,
  }

  impl ScriptedApi {
    fn with_list(self, response: Result<ApiResponse, TransportError>) -> Self {
      *self.list.lock().unwrap() = Some(response);
      self
    }

    fn with_posts(self, responses: Vec<ApiResponse>) -> Self {
      *self.posts.lock().unwrap() = responses.into_iter().map(Ok).collect();
      self
    }

    fn post_count(&self) -> usize {
      self.post_bodies.lock().unwrap().len()
    }

    fn list_count(&self) -> usize {
      self.list_calls.lock().unwrap().len()
    }
  }

  #[async_trait]
  impl VersionApi for ScriptedApi {
    async fn list_versions(&self, project_key: &str) -> Result<ApiResponse, TransportError> {
      self.list_calls.lock().unwrap().push(project_key.to_string());
      self.list.lock().unwrap().take().expect("unexpected list call")
    }

    async fn create_version(&self, body: &str) -> Result<ApiResponse, TransportError> {
      self.post_bodies.lock().unwrap().push(body.to_string());
      self.posts.lock().unwrap().pop_front().expect("unexpected post call")
    }
  }

  type Delays = Arc<Mutex<Vec<Duration>>>;

  fn workflow(api: ScriptedApi) -> (Delays, VersionWorkflow<ScriptedApi, impl Sleeper + Clone>) {
    let delays: Delays = Arc::default();
    let recorded = delays.clone();
    let workflow = VersionWorkflow::new(api).with_sleeper(move |delay: Duration| {
      recorded.lock().unwrap().push(delay);
      std::future::ready(())
    });
    (delays, workflow)
  }

  fn created(id: &str, name: &str) -> ApiResponse {
    ApiResponse::new(201, format!(
      r#"{{"id":"{id}","self":"https://x/rest/api/3/version/{id}","name":"{name}","released":false}}"#
    ))
  }

  fn inputs(check_if_exists: bool) -> VersionInputs {
    VersionInputs::try_from(RawInputs { check_if_exists, ..raw() }).unwrap()
  }

  #[tokio::test]
  async fn test_create_without_lookup() {
    let api = ScriptedApi::default().with_posts(vec![created("123", "v1.2.0")]);
    let (delays, workflow) = workflow(api);
    let outcome = workflow.run(&inputs(false)).await.unwrap();

    assert!(outcome.was_created());
    assert_eq!(workflow.api().list_count(), 0);
    assert_eq!(workflow.api().post_count(), 1);
    assert!(delays.lock().unwrap().is_empty());

    let body: serde_json::Value = serde_json::from_str(&workflow.api().post_bodies.lock().unwrap()[0]).unwrap();
    assert_eq!(body, serde_json::json!({
      "name": "v1.2.0",
      "description": "",
      "project": "PROJ",
      "released": false,
    }));
  }

  #[tokio::test]
  async fn test_outputs_from_created_version() {
    let api = ScriptedApi::default().with_posts(vec![
      ApiResponse::new(201, r#"{"id":"123","self":"https://x/y/123","name":"v1.2.0"}"#),
    ]);
    let (_, workflow) = workflow(api);
    let outputs = workflow.run(&inputs(false)).await.unwrap().outputs();
    assert_eq!(outputs.version_id, "123");
    assert_eq!(outputs.version_url, "https://x/y/123");
    assert_eq!(outputs.pairs(), [("version-id", "123"), ("version-url", "https://x/y/123")]);
  }

  #[tokio::test]
  async fn test_existing_version_skips_creation() {
    let list = r#"[
      {"id":"1","self":"https://x/rest/api/3/version/1","name":"v1.1.0"},
      {"id":"2","self":"https://x/rest/api/3/version/2","name":"v1.2.0","archived":false}
    ]"#;
    let api = ScriptedApi::default().with_list(Ok(ApiResponse::new(200, list)));
    let (_, workflow) = workflow(api);
    let outcome = workflow.run(&inputs(true)).await.unwrap();

    assert!(!outcome.was_created());
    assert_eq!(outcome.outputs(), VersionOutputs {
      version_id: "2".into(),
      version_url: "https://x/rest/api/3/version/2".into(),
    });
    assert_eq!(*workflow.api().list_calls.lock().unwrap(), vec!["PROJ".to_string()]);
    assert_eq!(workflow.api().post_count(), 0);
  }

  #[tokio::test]
  async fn test_lookup_is_case_sensitive() {
    let list = r#"[{"id":"9","self":"https://x/rest/api/3/version/9","name":"V1.2.0"}]"#;
    let api = ScriptedApi::default()
      .with_list(Ok(ApiResponse::new(200, list)))
      .with_posts(vec![created("10", "v1.2.0")]);
    let (_, workflow) = workflow(api);
    let outcome = workflow.run(&inputs(true)).await.unwrap();

    assert!(outcome.was_created());
    assert_eq!(outcome.record().id, "10");
    assert_eq!(workflow.api().post_count(), 1);
  }

  #[tokio::test]
  async fn test_lookup_failure_falls_through() {
    let api = ScriptedApi::default()
      .with_list(Ok(ApiResponse::new(404, r#"{"errorMessages":["No project could be found with key 'PROJ'."]}"#)))
      .with_posts(vec![created("11", "v1.2.0")]);
    let (_, workflow) = workflow(api);
    let outcome = workflow.run(&inputs(true)).await.unwrap();

    assert_eq!(outcome.record().id, "11");
    assert_eq!(workflow.api().list_count(), 1);
    assert_eq!(workflow.api().post_count(), 1);
  }

  #[tokio::test]
  async fn test_unparseable_lookup_falls_through() {
    let api = ScriptedApi::default()
      .with_list(Ok(ApiResponse::new(200, "<html></html>")))
      .with_posts(vec![created("12", "v1.2.0")]);
    let (_, workflow) = workflow(api);
    let outcome = workflow.run(&inputs(true)).await.unwrap();
    assert_eq!(outcome.record().id, "12");
  }

  #[tokio::test]
  async fn test_lookup_transport_fault_is_fatal() {
    let api = ScriptedApi::default()
      .with_list(Err(TransportError::new("https://x/rest/api/3/project/PROJ/versions", "dns error")));
    let (_, workflow) = workflow(api);
    let err = workflow.run(&inputs(true)).await.unwrap_err();

    assert!(matches!(err, VersionError::Transport(_)));
    assert_eq!(workflow.api().post_count(), 0);
  }

  #[tokio::test]
  async fn test_rate_limit_then_success() {
    let api = ScriptedApi::default().with_posts(vec![
      ApiResponse::new(429, ""),
      created("123", "v1.2.0"),
    ]);
    let (delays, workflow) = workflow(api);
    let outcome = workflow.run(&inputs(false)).await.unwrap();

    assert_eq!(outcome.record().id, "123");
    assert_eq!(workflow.api().post_count(), 2);
    assert_eq!(*delays.lock().unwrap(), vec![Duration::from_secs(2)]);
    let bodies = workflow.api().post_bodies.lock().unwrap();
    assert_eq!(bodies[0], bodies[1]);
  }

  #[tokio::test]
  async fn test_rate_limit_exhausted() {
    let api = ScriptedApi::default().with_posts(vec![
      ApiResponse::new(429, "Rate limit exceeded"),
      ApiResponse::new(429, "Rate limit exceeded"),
      ApiResponse::new(429, "Rate limit exceeded"),
      ApiResponse::new(429, "Rate limit exceeded"),
    ]);
    let (delays, workflow) = workflow(api);
    let err = workflow.run(&inputs(false)).await.unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert_eq!(workflow.api().post_count(), 4);
    assert_eq!(*delays.lock().unwrap(), vec![
      Duration::from_secs(2),
      Duration::from_secs(4),
      Duration::from_secs(8),
    ]);
  }

  #[tokio::test]
  async fn test_server_error_not_retried() {
    let api = ScriptedApi::default().with_posts(vec![ApiResponse::new(500, "Internal Server Error")]);
    let (delays, workflow) = workflow(api);
    let err = workflow.run(&inputs(false)).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(workflow.api().post_count(), 1);
    assert!(delays.lock().unwrap().is_empty());
    assert_eq!(err.to_string(), "Failed to create version. Status: 500. Response: Internal Server Error");
  }

  #[tokio::test]
  async fn test_structured_error_detail() {
    let api = ScriptedApi::default().with_posts(vec![
      ApiResponse::new(400, r#"{"errorMessages":[],"errors":{"name":"A version with this name already exists in this project."}}"#),
    ]);
    let (_, workflow) = workflow(api);
    let err = workflow.run(&inputs(false)).await.unwrap_err();
    assert_eq!(
      err.to_string(),
      "Failed to create version. Status: 400. Error: name: A version with this name already exists in this project."
    );
  }

  #[tokio::test]
  async fn test_malformed_success_body() {
    let api = ScriptedApi::default().with_posts(vec![ApiResponse::new(201, "not json")]);
    let (_, workflow) = workflow(api);
    let err = workflow.run(&inputs(false)).await.unwrap_err();
    assert!(matches!(err, VersionError::Parse(_)));
  }

  #[tokio::test]
  async fn test_failures_never_mention_credentials() {
    let scripts = vec![
      ScriptedApi::default().with_posts(vec![ApiResponse::new(401, "Unauthorized")]),
      ScriptedApi::default().with_posts(vec![ApiResponse::new(201, "{")]),
      ScriptedApi::default().with_list(Err(TransportError::new("https://x", "timed out"))),
    ];
    let inputs = inputs(true);
    for api in scripts {
      let api = if api.list.lock().unwrap().is_none() {
        api.with_list(Ok(ApiResponse::new(200, "[]")))
      } else {
        api
      };
      let (_, workflow) = workflow(api);
      let err = workflow.run(&inputs).await.unwrap_err();
      let message = format!("{} {:?}", err, err);
      assert!(!message.contains(&inputs.credentials.api_token));
      assert!(!message.contains(&inputs.credentials.email));
    }
  }
}
