use std::process::ExitCode;
use clap::Parser;
use simplelog::{ConfigBuilder, TermLogger};

mod actions;
mod cli;

#[tokio::main]
async fn main() -> ExitCode {
  let cli = cli::Cli::parse();
  let log_level = match (cli.quiet, cli.verbose) {
    (true, _) => log::LevelFilter::Off,
    (_, 0) => log::LevelFilter::Info,
    (_, 1) => log::LevelFilter::Debug,
    (_, _) => log::LevelFilter::Trace,
  };
  let config = ConfigBuilder::new()
    .set_time_level(log::LevelFilter::Debug)
    .set_target_level(log::LevelFilter::Trace)
    .set_location_level(log::LevelFilter::Off)
    .set_max_level(log::LevelFilter::Debug)
    .add_filter_ignore_str("reqwest")
    .add_filter_ignore_str("hyper_util")
    .add_filter_ignore_str("tokio_util")
    .build();
  let mode = simplelog::TerminalMode::Mixed;
  let color_choice = simplelog::ColorChoice::Auto;
  if let Err(e) = TermLogger::init(log_level, config, mode, color_choice) {
    eprintln!("Could not initialize logging: {}", e);
  }

  let masker = actions::RunnerMasker;
  let result = match cli.run(&masker).await {
    Ok(outputs) => actions::OutputSink::from_env().write(&outputs),
    Err(e) => Err(e),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      actions::fail(&e);
      ExitCode::FAILURE
    },
  }
}
