//! TriageMate - Main CLI Entry Point

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use futures_util::stream::{self, StreamExt};
use triagemate::{
    agent::OrchestratorConfig,
    cli::{Args, Commands, Verbosity},
    config::Config,
    directory::CustomerDirectory,
    knowledge::KnowledgeStore,
    provider::{ChatProviderClient, RetryManager},
    repl::{DisplayManager, TriageRuntime, TriageSession},
    telemetry::{TelemetryCollector, TelemetryDisplay},
    types::{Ticket, TriageOutcome, TriageReport},
};

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Wire providers, stores and budgets into a runtime, plus the ticket queue
fn build_runtime(config: &Config, verbosity: Verbosity) -> Result<(TriageRuntime, Vec<Ticket>)> {
    let data_dir = config.data_dir();

    let directory = CustomerDirectory::load(&data_dir)
        .with_context(|| format!("loading customer data from {}", data_dir.display()))?;
    let store = KnowledgeStore::load(&data_dir)
        .with_context(|| format!("loading knowledge base from {}", data_dir.display()))?;
    let tickets = Ticket::load_all(&data_dir.join("sample_tickets.json"))
        .with_context(|| format!("loading tickets from {}", data_dir.display()))?;

    let primary = ChatProviderClient::from_settings(&config.provider.primary)?;
    let fallback = ChatProviderClient::from_settings(&config.provider.fallback)?;

    let runtime = TriageRuntime {
        primary: Arc::new(primary),
        fallback: Arc::new(fallback),
        directory: Arc::new(directory),
        store: Arc::new(store),
        retry: RetryManager::from_config(&config.retry),
        telemetry: TelemetryCollector::new(),
        config: OrchestratorConfig::from_config(config).with_verbose(verbosity.show_events()),
    };

    Ok((runtime, tickets))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();

    let mut config = load_config(&args)?;
    if let Some(dir) = &args.data_dir {
        config.set_data_dir(dir.clone());
    }

    match &args.command {
        Some(Commands::Run { ticket }) => {
            run_single(&config, verbosity, ticket).await?;
        }
        Some(Commands::Batch { jobs }) => {
            run_batch(&config, verbosity, *jobs).await?;
        }
        Some(Commands::Config) => {
            show_config(&config, &args)?;
        }
        None => {
            // No subcommand - interactive picker over the sample tickets
            run_session(&config, verbosity).await?;
        }
    }

    Ok(())
}

async fn run_single(config: &Config, verbosity: Verbosity, ticket_id: &str) -> Result<()> {
    let (runtime, tickets) = build_runtime(config, verbosity)?;
    let mut display = DisplayManager::new(verbosity);

    let ticket = tickets
        .iter()
        .find(|t| t.id == ticket_id)
        .cloned()
        .ok_or_else(|| anyhow!("no ticket '{}' in the sample set", ticket_id))?;

    display.start_ticket(&ticket.id);
    let mut orchestrator = runtime.orchestrator();
    let report = orchestrator.run_ticket(&ticket).await;
    display.finish_ticket();

    display.show_report(&report);

    if verbosity.show_usage() {
        TelemetryDisplay::new(runtime.telemetry.clone(), verbosity).display_summary();
    }

    if matches!(report.outcome, TriageOutcome::Failed { .. }) {
        std::process::exit(1);
    }

    Ok(())
}

async fn run_batch(config: &Config, verbosity: Verbosity, jobs: usize) -> Result<()> {
    let (runtime, tickets) = build_runtime(config, verbosity)?;
    let display = DisplayManager::new(verbosity);

    if tickets.is_empty() {
        display.show_warning("no tickets to triage");
        return Ok(());
    }

    let jobs = jobs.max(1);
    if verbosity.show_progress() {
        display.show_info(&format!(
            "triaging {} tickets, {} at a time",
            tickets.len(),
            jobs
        ));
    }

    // Concurrent runs share one runtime; buffered keeps reports in input order
    let runtime = Arc::new(runtime);
    let mut runs = stream::iter(tickets)
        .map(|ticket| {
            let runtime = Arc::clone(&runtime);
            async move {
                let mut orchestrator = runtime.orchestrator();
                orchestrator.run_ticket(&ticket).await
            }
        })
        .buffered(jobs);

    let mut reports: Vec<TriageReport> = Vec::new();
    while let Some(report) = runs.next().await {
        display.show_report(&report);
        reports.push(report);
    }

    display.show_batch_summary(&reports);

    if verbosity.show_usage() {
        TelemetryDisplay::new(runtime.telemetry.clone(), verbosity).display_summary();
    }

    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, TriageOutcome::Failed { .. }))
        .count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

async fn run_session(config: &Config, verbosity: Verbosity) -> Result<()> {
    let (runtime, tickets) = build_runtime(config, verbosity)?;
    let mut session = TriageSession::new(runtime, tickets, verbosity)?;
    session.run().await
}

fn show_config(config: &Config, args: &Args) -> Result<()> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };

    println!();
    println!("TriageMate Configuration");
    println!("  File: {}", path.display());
    println!();

    println!("Providers:");
    println!(
        "  Primary:  {} / {} at {}",
        config.provider.primary.name, config.provider.primary.model, config.provider.primary.base_url
    );
    println!("            key from ${}", config.provider.primary.api_key_env);
    println!(
        "  Fallback: {} / {} at {}",
        config.provider.fallback.name, config.provider.fallback.model, config.provider.fallback.base_url
    );
    println!("            key from ${}", config.provider.fallback.api_key_env);
    println!();

    println!("Budgets:");
    println!("  Max rounds:     {}", config.budgets.max_rounds);
    println!("  Policy retries: {}", config.budgets.policy_retries);
    println!("  Schema retries: {}", config.budgets.schema_retries);
    println!();

    println!("Retry:");
    println!("  Max retries: {}", config.retry.max_retries);
    println!("  Base delay:  {}ms", config.retry.base_delay_ms);
    println!("  Max delay:   {}ms", config.retry.max_delay_ms);
    println!("  Jitter:      {}", if config.retry.enable_jitter { "enabled" } else { "disabled" });
    println!();

    println!("Data directory: {}", config.data_dir().display());
    println!();

    Ok(())
}
