use super::Settings;
use crate::output::{print_json, print_table};
use anyhow::Context;
use charm_suite::{Scenario, SuiteConfig, SuiteReport, SuiteRunner, TestMatrix};
use clap::Args;
use juju_driver::{JujuCli, Model};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Args)]
pub struct RunArgs {
    /// Only run these series (repeatable)
    #[arg(long = "series", value_name = "SERIES")]
    pub series: Vec<String>,

    /// Only run these scenarios (repeatable, see `charm-ft scenarios`)
    #[arg(long = "only", value_name = "SCENARIO")]
    pub only: Vec<Scenario>,

    /// Seconds between two status polls
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Give up waiting for a status after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Run in a fresh model, destroyed afterwards
    #[arg(long)]
    pub temp_model: bool,

    /// Keep the temporary model for inspection
    #[arg(long, requires = "temp_model")]
    pub keep_model: bool,

    /// Wait for `deploy` / `upgrade-charm` and fail on a non-zero exit
    #[arg(long)]
    pub check_invocations: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(settings: &Settings, args: RunArgs) -> anyhow::Result<()> {
    let mut config = settings.suite_config()?;
    if let Some(interval) = args.interval {
        config.polling.interval_secs = interval;
    }
    if let Some(timeout) = args.timeout {
        config.polling.max_wait_secs = timeout;
    }
    if args.check_invocations {
        config.check_invocations = true;
    }
    if config.polling.interval_secs == 0 {
        anyhow::bail!("--interval must be greater than zero");
    }

    let mut matrix = settings.matrix(&config)?;
    matrix
        .filter_series(&args.series)
        .context("invalid --series")?;

    let mut juju =
        JujuCli::discover(settings.juju()).context("failed to locate the juju binary")?;
    // Unscoped juju commands in the background must hit the same model.
    if let (Some(model), false) = (&settings.model, args.temp_model) {
        juju = juju.with_env("JUJU_MODEL", model.as_str());
    }

    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let report = rt.block_on(execute(
        juju,
        settings.model.as_deref(),
        config,
        matrix,
        &args,
    ))?;

    if settings.json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    let failed = report.summary().failed;
    if failed > 0 {
        anyhow::bail!("{failed} scenario(s) failed");
    }
    Ok(())
}

async fn execute(
    juju: JujuCli,
    model_name: Option<&str>,
    config: SuiteConfig,
    matrix: TestMatrix,
    args: &RunArgs,
) -> anyhow::Result<SuiteReport> {
    let model = if args.temp_model {
        let name = temp_model_name();
        Model::create(juju, &name)
            .await
            .with_context(|| format!("failed to create model {name}"))?
    } else {
        Model::connect(juju, model_name)
            .await
            .context("failed to connect to model")?
    };

    let runner = SuiteRunner::new(model, config, matrix).select(&args.only);
    let report = runner.run().await;

    if args.temp_model {
        let model = runner.into_model();
        if args.keep_model {
            info!(model = %model.name(), "keeping temporary model");
        } else if let Err(e) = model.destroy().await {
            warn!(error = %e, "failed to destroy temporary model");
        }
    }

    Ok(report)
}

fn temp_model_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("charm-ft-{}", &id[..8])
}

fn print_report(report: &SuiteReport) {
    let rows = report
        .results
        .iter()
        .map(|r| {
            vec![
                r.application.clone(),
                r.scenario.to_string(),
                r.outcome.label().to_string(),
                format!("{:.1}s", r.duration_ms as f64 / 1000.0),
                r.outcome.reason().unwrap_or("").to_string(),
            ]
        })
        .collect();
    print_table(
        &["APPLICATION", "SCENARIO", "OUTCOME", "TIME", "DETAIL"],
        rows,
    );

    let elapsed = report.finished_at - report.started_at;
    println!();
    println!(
        "{} in model {} ({}s)",
        report.summary(),
        report.model,
        elapsed.num_seconds()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_model_names_are_valid_and_distinct() {
        let a = temp_model_name();
        let b = temp_model_name();
        assert!(a.starts_with("charm-ft-"));
        assert_eq!(a.len(), "charm-ft-".len() + 8);
        assert!(a.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert_ne!(a, b);
    }
}
