//! Interactive session for ticket-by-ticket triage
//!
//! Presents the loaded tickets, runs the selected ones through the
//! orchestrator, and keeps a bounded history of finished runs for the
//! stats view.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::agent::{OrchestratorConfig, TriageOrchestrator};
use crate::cli::Verbosity;
use crate::directory::CustomerDirectory;
use crate::knowledge::KnowledgeStore;
use crate::provider::{ProviderClient, RetryManager};
use crate::repl::display::DisplayManager;
use crate::telemetry::{TelemetryCollector, TelemetryDisplay};
use crate::tools::ToolRegistry;
use crate::types::{Ticket, TriageOutcome, TriageReport};

/// Maximum number of finished runs kept for the stats view
const MAX_HISTORY_SIZE: usize = 100;

/// Shared handles every triage run is built from
///
/// Providers and stores are immutable after startup, so one runtime
/// serves sequential sessions and concurrent batch runs alike.
pub struct TriageRuntime {
    pub primary: Arc<dyn ProviderClient>,
    pub fallback: Arc<dyn ProviderClient>,
    pub directory: Arc<CustomerDirectory>,
    pub store: Arc<KnowledgeStore>,
    pub retry: RetryManager,
    pub telemetry: TelemetryCollector,
    pub config: OrchestratorConfig,
}

impl TriageRuntime {
    /// Fresh orchestrator for one ticket
    pub fn orchestrator(&self) -> TriageOrchestrator {
        TriageOrchestrator::new(
            Arc::clone(&self.primary),
            Arc::clone(&self.fallback),
            ToolRegistry::standard(Arc::clone(&self.directory), Arc::clone(&self.store)),
            self.retry.clone(),
            self.telemetry.clone(),
            self.config.clone(),
        )
    }
}

/// What the user asked for at the picker prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Ticket(usize),
    All,
    Stats,
    Quit,
    Invalid,
}

fn parse_choice(input: &str, ticket_count: usize) -> Choice {
    match input.trim().to_lowercase().as_str() {
        "q" | "quit" | "exit" => Choice::Quit,
        "a" | "all" => Choice::All,
        "s" | "stats" => Choice::Stats,
        other => match other.parse::<usize>() {
            Ok(n) if n >= 1 && n <= ticket_count => Choice::Ticket(n - 1),
            _ => Choice::Invalid,
        },
    }
}

/// Interactive triage session
pub struct TriageSession {
    runtime: TriageRuntime,
    tickets: Vec<Ticket>,
    display: DisplayManager,
    editor: DefaultEditor,
    history: VecDeque<TriageReport>,
    processed: usize,
}

impl TriageSession {
    pub fn new(runtime: TriageRuntime, tickets: Vec<Ticket>, verbosity: Verbosity) -> Result<Self> {
        let editor = DefaultEditor::new()?;
        Ok(TriageSession {
            runtime,
            tickets,
            display: DisplayManager::new(verbosity),
            editor,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            processed: 0,
        })
    }

    /// Main session loop; returns when the user quits
    pub async fn run(&mut self) -> Result<()> {
        if self.display.verbosity().show_progress() {
            let _ = self.display.clear_screen();
        }
        self.display.show_banner(
            env!("CARGO_PKG_VERSION"),
            self.runtime.primary.name(),
            self.runtime.fallback.name(),
            self.tickets.len(),
        );
        self.probe_providers().await;

        if self.tickets.is_empty() {
            self.display
                .show_warning("No tickets loaded; nothing to triage");
            return Ok(());
        }

        loop {
            self.display.show_ticket_table(&self.tickets);
            let Some(line) = self.read_choice()? else {
                break;
            };
            if line.is_empty() {
                continue;
            }

            match parse_choice(&line, self.tickets.len()) {
                Choice::Quit => break,
                Choice::Ticket(index) => self.run_one(index).await,
                Choice::All => self.run_all().await,
                Choice::Stats => self.show_stats(),
                Choice::Invalid => self
                    .display
                    .show_warning(&format!("Unrecognized choice: {}", line)),
            }
        }

        if self.display.verbosity() != Verbosity::Quiet {
            TelemetryDisplay::new(self.runtime.telemetry.clone(), self.display.verbosity())
                .display_summary();
        }
        Ok(())
    }

    /// Warn up front when a provider endpoint is unreachable
    async fn probe_providers(&self) {
        if !self.runtime.primary.probe().await {
            self.display.show_warning(&format!(
                "Primary provider '{}' is not reachable; runs will fail over",
                self.runtime.primary.name()
            ));
        }
        if !self.runtime.fallback.probe().await {
            self.display.show_warning(&format!(
                "Fallback provider '{}' is not reachable",
                self.runtime.fallback.name()
            ));
        }
    }

    fn read_choice(&mut self) -> Result<Option<String>> {
        match self.editor.readline(">triagemate: ") {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(trimmed);
                }
                Ok(Some(trimmed.to_string()))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(anyhow::anyhow!("readline error: {}", err)),
        }
    }

    async fn run_one(&mut self, index: usize) {
        let ticket = self.tickets[index].clone();
        self.display.start_ticket(&ticket.id);
        let mut orchestrator = self.runtime.orchestrator();
        let report = orchestrator.run_ticket(&ticket).await;
        self.display.finish_ticket();
        self.display.show_report(&report);
        self.record(report);
    }

    async fn run_all(&mut self) {
        let tickets = self.tickets.clone();
        let mut reports = Vec::with_capacity(tickets.len());
        for ticket in &tickets {
            self.display.start_ticket(&ticket.id);
            let mut orchestrator = self.runtime.orchestrator();
            let report = orchestrator.run_ticket(ticket).await;
            self.display.finish_ticket();
            self.display.show_report(&report);
            reports.push(report);
        }
        self.display.show_batch_summary(&reports);
        for report in reports {
            self.record(report);
        }
    }

    fn show_stats(&self) {
        let decided = self.count_outcomes(|o| matches!(o, TriageOutcome::Decision { .. }));
        let escalated = self.count_outcomes(|o| matches!(o, TriageOutcome::Escalated { .. }));
        let failed = self.count_outcomes(|o| matches!(o, TriageOutcome::Failed { .. }));
        self.display.show_info(&format!(
            "{} runs this session: {} decided, {} escalated, {} failed",
            self.processed, decided, escalated, failed
        ));
        TelemetryDisplay::new(self.runtime.telemetry.clone(), self.display.verbosity())
            .display_summary();
    }

    fn count_outcomes(&self, pred: impl Fn(&TriageOutcome) -> bool) -> usize {
        self.history.iter().filter(|r| pred(&r.outcome)).count()
    }

    fn record(&mut self, report: TriageReport) {
        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(report);
        self.processed += 1;
    }

    /// Total runs recorded this session
    pub fn processed(&self) -> usize {
        self.processed
    }
}
