//! `oag` command-line front end

mod cli;
mod commands;

use anyhow::Context;
use clap::ArgMatches;
use oag_core::{Engine, EngineConfig};
use oag_validate::AcceptancePolicy;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<EngineConfig> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::new(),
    };
    let mut config = config.with_env_overrides();
    if let Some(dir) = matches.get_one::<PathBuf>("data-dir") {
        config = config.with_data_dir(dir.clone());
    }
    if matches.get_flag("strict") {
        config = config.with_acceptance(AcceptancePolicy::Strict);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli::command().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(2);
        }
    };
    let engine = Engine::open(config);

    match commands::run(&engine, &matches).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
