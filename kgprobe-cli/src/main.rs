use std::process::ExitCode;

use kgprobe_cli::{Harness, StagePlan, render_report};
use kgprobe_core::{Config, ConfigSource, load_configuration};
use kgprobe_pipeline::BackendRegistry;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let source = ConfigSource::from_env();
    let loaded = load_configuration(&source);
    let (config, fallback_error) = match &loaded {
        Ok(config) => (config.clone(), None),
        Err(_) => Config::from_process_env(),
    };

    // Initialize tracing; RUST_LOG wins over the settings file
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(config.settings.logging.level.as_str())
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = loaded {
        error!(
            "Failed to load configuration: {}; continuing with the process environment",
            err
        );
    }
    if let Some(err) = fallback_error {
        warn!("Falling back to default settings: {}", err);
    }

    let plan = match StagePlan::from_settings(&config.settings) {
        Ok(plan) => plan,
        Err(err) => {
            error!("Invalid stage plan: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut harness = Harness::new(config, BackendRegistry::with_builtins());
    let report = harness.run(&plan).await;
    println!("{}", render_report(&report));

    let (passed, failed, skipped) = report.tally();
    info!(
        "Plan '{}' finished: {} passed, {} failed, {} skipped",
        report.plan, passed, failed, skipped
    );
    if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
