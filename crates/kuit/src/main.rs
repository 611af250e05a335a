use anyhow::{Context, bail};
use clap::Parser;
use futures::FutureExt;
use kuit_engine::config::ConfigLoader;
use kuit_engine::fixtures;
use kuit_engine::scenario::ScenarioReport;
use kuit_engine::suite::{self, Domain, ScenarioTag, Selection, SuiteContext, run_selected};
use kuit_webdriver::with_session;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kuit", version, about = "End-to-end UI tests for the Kytos dashboard")]
struct Args {
    /// Config file (defaults to ./kuit.yaml, then ~/.kuit/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// KEY=VALUE overrides applied on top of the config file
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Only run scenarios of this domain (repeatable)
    #[arg(long)]
    domain: Vec<Domain>,

    /// Only run the scenario with this exact name (repeatable)
    #[arg(long)]
    scenario: Vec<String>,

    /// Only run scenarios carrying this tag (repeatable)
    #[arg(long)]
    tag: Vec<ScenarioTag>,

    /// Print the selected scenarios and exit
    #[arg(long)]
    list: bool,

    /// Stop after the first failing scenario
    #[arg(long)]
    fail_fast: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Delete every circuit and maintenance window a run may leave behind,
    /// then exit
    #[arg(long)]
    cleanup: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let selection = Selection {
        domains: args.domain.clone(),
        names: args.scenario.clone(),
        tags: args.tag.clone(),
    };
    let entries = selection.apply(suite::catalog());

    if args.list {
        for entry in &entries {
            let tags: Vec<String> = entry.tags.iter().map(|t| t.to_string()).collect();
            println!(
                "{:<12} {:<40} {}",
                entry.domain.to_string(),
                entry.name,
                tags.join(",")
            );
        }
        return Ok(());
    }

    let mut config = ConfigLoader::load(args.config.as_deref(), Some(&args.env_file))
        .await
        .context("Failed to load configuration")?;
    if args.headed {
        config.browser.headless = false;
    }
    let context = SuiteContext::new(config).context("Failed to build the API client")?;

    if args.cleanup {
        sweep(&context).await;
        return Ok(());
    }

    if entries.is_empty() {
        bail!("No scenario matches the selection");
    }
    info!(
        "Running {} scenario(s) against {}",
        entries.len(),
        context.config.ui.base_url
    );

    let browser = context.config.browser.clone();
    let fail_fast = args.fail_fast;
    let reports = with_session(&browser, move |session| {
        async move { run_selected(session, &context, &entries, fail_fast).await }.boxed()
    })
    .await?;

    summarize(&reports);
    let failed = reports.iter().filter(|r| !r.passed()).count();
    if failed > 0 {
        bail!("{} of {} scenario(s) failed", failed, reports.len());
    }
    Ok(())
}

async fn sweep(context: &SuiteContext) {
    let api = &context.api;
    let circuits = api
        .cleanup_circuits(&fixtures::circuits::cleanup_names())
        .await;

    let descriptions = fixtures::maintenance::descriptions(chrono::Utc::now());
    let windows = api
        .cleanup_windows(|w| {
            w.description
                .as_ref()
                .is_some_and(|d| descriptions.contains(d))
        })
        .await;
    info!(
        "Removed {} circuit(s) and {} maintenance window(s)",
        circuits, windows
    );
}

fn summarize(reports: &[ScenarioReport]) {
    println!();
    for report in reports {
        match &report.outcome {
            Ok(()) => println!("PASS {} ({:.1?})", report.name, report.elapsed),
            Err(e) => {
                println!(
                    "FAIL {} ({:.1?}) at {}: {}",
                    report.name,
                    report.elapsed,
                    report.reached(),
                    e
                );
            }
        }
        if report.cleaned > 0 {
            println!("     cleaned up {} resource(s)", report.cleaned);
        }
    }
    let passed = reports.iter().filter(|r| r.passed()).count();
    println!("\n{} passed, {} failed", passed, reports.len() - passed);
    if passed < reports.len() {
        warn!("Some scenarios failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_flags() {
        let args = Args::try_parse_from([
            "kuit",
            "--domain",
            "evc",
            "--domain",
            "status",
            "--tag",
            "negative",
            "--scenario",
            "circuit_basic",
            "--fail-fast",
        ])
        .unwrap();
        assert_eq!(args.domain, vec![Domain::Circuit, Domain::Status]);
        assert_eq!(args.tag, vec![ScenarioTag::Negative]);
        assert_eq!(args.scenario, vec!["circuit_basic"]);
        assert!(args.fail_fast);
        assert_eq!(args.env_file, PathBuf::from(".env"));
    }

    #[test]
    fn test_unknown_domain_is_rejected() {
        assert!(Args::try_parse_from(["kuit", "--domain", "billing"]).is_err());
    }
}
