use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use anyhow::Result;
use jira_version_lib::inputs::SecretMasker;
use jira_version_lib::workflow::VersionOutputs;

const HEREDOC_DELIMITER: &str = "JIRA_VERSION_OUTPUT_EOF";

// workflow command data must not break the line
fn escape_data(value: &str) -> String {
  value.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// Registers secrets with the runner via `::add-mask::`
#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerMasker;

impl SecretMasker for RunnerMasker {
  fn mask(&self, secret: &str) {
    if !secret.is_empty() {
      println!("::add-mask::{}", escape_data(secret));
    }
  }
}

/// Where step outputs go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
  /// Appended to the runner's output file
  File(PathBuf),
  /// Printed as `name=value` lines
  Stdout,
}

impl OutputSink {
  pub fn from_env() -> Self {
    match std::env::var_os("GITHUB_OUTPUT") {
      Some(path) if !path.is_empty() => OutputSink::File(PathBuf::from(path)),
      _ => OutputSink::Stdout,
    }
  }

  pub fn write(&self, outputs: &VersionOutputs) -> Result<()> {
    let mut text = String::new();
    for (name, value) in outputs.pairs() {
      text.push_str(&format_output(name, value)?);
    }
    match self {
      OutputSink::File(path) => {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(text.as_bytes())?;
      },
      OutputSink::Stdout => print!("{}", text),
    }
    Ok(())
  }
}

fn format_output(name: &str, value: &str) -> Result<String> {
  if !value.contains('\n') && !value.contains('\r') {
    return Ok(format!("{}={}\n", name, value));
  }
  if value.contains(HEREDOC_DELIMITER) {
    return Err(anyhow::anyhow!("Output {} contains the delimiter {}", name, HEREDOC_DELIMITER));
  }
  Ok(format!("{name}<<{HEREDOC_DELIMITER}\n{value}\n{HEREDOC_DELIMITER}\n"))
}

/// Report the run as failed
pub fn fail(error: &anyhow::Error) {
  let message = format!("{:#}", error);
  log::error!("{}", message);
  println!("::error::{}", escape_data(&message));
}
