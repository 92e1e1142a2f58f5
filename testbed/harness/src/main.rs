//! Runs the base conformance suite against one action container image.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use conformer_core::{
    base_suite, ContainerManager, HarnessConfig, ScenarioOutcome, ScenarioReport, ScenarioRunner,
    SuiteConfig,
};
use log::LevelFilter;
use std::fs;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Conformance harness for action container images")]
struct Cli {
    /// Image to test, e.g. openwhisk/action-nodejs-v14
    #[clap(long, short)]
    image: String,

    #[clap(long, short, help = "YAML file with the runtime's scenario data")]
    config: PathBuf,

    #[clap(long, help = "Run only the named scenario (repeatable)")]
    only: Vec<String>,

    #[clap(long, short, default_value_t = 1, help = "Scenarios to run concurrently")]
    jobs: usize,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(e) => {
            eprintln!("Harness Error:\n{:#}", e);
            exit(1);
        }
    }
}

/// Returns whether every scenario that ran passed.
async fn run(cli: Cli) -> Result<bool> {
    let content = fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read suite config at '{}'", cli.config.display()))?;
    let suite_config: SuiteConfig = serde_yaml::from_str(&content)
        .with_context(|| "Failed to parse YAML from suite config")?;

    let mut suite = base_suite(&suite_config).context("Invalid suite config")?;
    if !cli.only.is_empty() {
        if let Some(unknown) = cli.only.iter().find(|name| !suite.iter().any(|s| &s.name == *name)) {
            return Err(anyhow!("No scenario named '{}' in this suite", unknown));
        }
        suite.retain(|scenario| cli.only.contains(&scenario.name));
    }

    let config = Arc::new(HarnessConfig::from_env().context("Failed to resolve harness configuration")?);
    log::info!(
        "Using {} with {:?} networking",
        config.tool.program(),
        config.network
    );
    let manager = ContainerManager::new(config);
    manager
        .check_tool()
        .await
        .context("Container tool is not usable")?;

    println!("--- Testing {} ({} scenarios) ---", cli.image, suite.len());
    let runner = ScenarioRunner::new(manager, cli.image);
    let reports = runner
        .run_suite(&suite, cli.jobs)
        .await
        .context("Suite aborted")?;

    for report in &reports {
        print_report(report);
    }

    let failed = reports.iter().filter(|r| r.failed()).count();
    let skipped = reports
        .iter()
        .filter(|r| matches!(r.outcome, ScenarioOutcome::Skipped(_)))
        .count();
    println!(
        "--- {} passed, {} failed, {} skipped ---",
        reports.len() - failed - skipped,
        failed,
        skipped
    );
    Ok(failed == 0)
}

fn print_report(report: &ScenarioReport) {
    match &report.outcome {
        ScenarioOutcome::Passed => println!("PASS {}", report.name),
        ScenarioOutcome::Skipped(reason) => println!("SKIP {} ({})", report.name, reason),
        ScenarioOutcome::Failed(failures) => {
            println!("FAIL {}", report.name);
            for failure in failures {
                println!("     {}", failure);
            }
        }
    }
}
