use anyhow::Result;
use clap::Parser;
use jira_version_http::{reqwest, JiraClient};
use jira_version_lib::inputs::{parse_boolean, RawInputs, SecretMasker, VersionInputs};
use jira_version_lib::workflow::{VersionOutputs, VersionWorkflow};

fn parse_flag(value: &str) -> Result<bool, String> {
  if value.trim().is_empty() {
    return Ok(false);
  }
  parse_boolean("flag", value).map_err(|e| e.to_string())
}

// Not Debug: holds the API token
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
  /// Base URL of the Jira site, e.g. https://example.atlassian.net
  #[arg(long, env = "INPUT_JIRA-BASE-URL", default_value = "")]
  pub jira_base_url: String,
  /// Key of the project the version belongs to
  #[arg(long, env = "INPUT_JIRA-PROJECT-KEY", default_value = "")]
  pub jira_project_key: String,
  /// Email of the Jira account
  #[arg(long, env = "INPUT_JIRA-USER-EMAIL", default_value = "", hide_env_values = true)]
  pub jira_user_email: String,
  /// API token of the Jira account
  #[arg(long, env = "INPUT_JIRA-API-TOKEN", default_value = "", hide_env_values = true)]
  pub jira_api_token: String,
  /// Name of the version to find or create
  #[arg(long, env = "INPUT_VERSION-NAME", default_value = "")]
  pub version_name: String,
  /// Description for a newly created version
  #[arg(long, env = "INPUT_VERSION-DESCRIPTION")]
  pub version_description: Option<String>,
  /// Mark a newly created version as released
  #[arg(long, env = "INPUT_RELEASED", default_value = "false", value_parser = parse_flag, action = clap::ArgAction::Set)]
  pub released: bool,
  /// Reuse an existing version with the same name instead of creating one
  #[arg(long, env = "INPUT_CHECK-IF-EXISTS", default_value = "false", value_parser = parse_flag, action = clap::ArgAction::Set)]
  pub check_if_exists: bool,
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,
  #[arg(short, long)]
  pub quiet: bool,
}

impl Cli {
  pub fn inputs(&self) -> Result<VersionInputs> {
    let raw = RawInputs {
      base_url: self.jira_base_url.clone(),
      project_key: self.jira_project_key.clone(),
      user_email: self.jira_user_email.clone(),
      api_token: self.jira_api_token.clone(),
      version_name: self.version_name.clone(),
      version_description: self.version_description.clone(),
      released: self.released,
      check_if_exists: self.check_if_exists,
    };
    Ok(VersionInputs::try_from(raw)?)
  }

  pub async fn run(&self, masker: &dyn SecretMasker) -> Result<VersionOutputs> {
    let inputs = self.inputs()?;
    inputs.mask_secrets(masker);

    let http = reqwest::Client::builder()
      .user_agent(concat!("jira-version/", env!("CARGO_PKG_VERSION")))
      .build()?;
    let client = JiraClient::new(http, inputs.base_url.clone(), &inputs.credentials)?;
    log::debug!("Using Jira at {}", client.base_url());

    let workflow = VersionWorkflow::new(client);
    let outcome = workflow.run(&inputs).await?;
    Ok(outcome.outputs())
  }
}
