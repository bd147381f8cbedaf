//! Display manager for the interactive terminal UI
//!
//! Spinners while a ticket is in flight, the ticket picker table, and
//! the formatted run report: tool trace, decision panel, suggested
//! reply, and token usage.

use colored::*;
use crossterm::{
    cursor,
    execute,
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::io;
use std::time::Duration;

use crate::cli::Verbosity;
use crate::provider::AttemptOutcome;
use crate::tools::{ToolTrace, FETCH_CUSTOMER_DATA, QUERY_KNOWLEDGE_BASE};
use crate::types::{Ticket, TriageDecision, TriageOutcome, TriageReport};

/// Display manager for the triage UI
pub struct DisplayManager {
    spinner: Option<ProgressBar>,
    verbosity: Verbosity,
    tick_interval: Duration,
}

impl DisplayManager {
    pub fn new(verbosity: Verbosity) -> Self {
        DisplayManager {
            spinner: None,
            verbosity,
            tick_interval: Duration::from_millis(100),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Show welcome banner
    pub fn show_banner(&self, version: &str, primary: &str, fallback: &str, tickets: usize) {
        if !self.verbosity.show_progress() {
            return;
        }
        let width = 64;
        println!("\n{}", "=".repeat(width).cyan());
        println!(
            "{}",
            format!("  TriageMate {} - Support Ticket Triage", version)
                .bold()
                .cyan()
        );
        println!(
            "{}",
            format!(
                "  Primary: {} | Fallback: {} | Tickets loaded: {}",
                primary, fallback, tickets
            )
            .dimmed()
        );
        println!("{}\n", "=".repeat(width).cyan());
        println!(
            "Pick a ticket by number, {} for all, {} for stats, {} to quit\n",
            "a".green(),
            "s".green(),
            "q".green()
        );
    }

    /// Spinner shown while a ticket runs
    pub fn start_ticket(&mut self, ticket_id: &str) {
        if !self.verbosity.show_progress() {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} Triaging {msg}...")
                .unwrap(),
        );
        pb.set_message(ticket_id.to_string());
        pb.enable_steady_tick(self.tick_interval);
        self.spinner = Some(pb);
    }

    /// Clear the active spinner
    pub fn finish_ticket(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    /// Ticket picker table
    pub fn show_ticket_table(&self, tickets: &[Ticket]) {
        println!("\n{}", "Loaded tickets".bold().cyan());
        println!("{}", "-".repeat(60).cyan());
        for (i, ticket) in tickets.iter().enumerate() {
            let subject = ticket.subject.as_deref().unwrap_or("(no subject)");
            println!(
                "  {}. {} {} {}",
                (i + 1).to_string().cyan(),
                ticket.id.bold(),
                format!("[{}]", ticket.customer_id).dimmed(),
                subject
            );
        }
        println!();
    }

    /// Full run report
    pub fn show_report(&self, report: &TriageReport) {
        if self.verbosity == Verbosity::Quiet {
            self.show_quiet_line(report);
            return;
        }

        println!("\n{}", format!("Ticket {}", report.ticket_id).bold().cyan());
        println!("{}", "-".repeat(60).cyan());
        self.show_traces(&report.tool_traces);

        match &report.outcome {
            TriageOutcome::Decision { decision } => self.show_decision(decision, false),
            TriageOutcome::Escalated { decision } => self.show_decision(decision, true),
            TriageOutcome::Failed { code, detail } => {
                println!(
                    "\n{} {} {}",
                    "✗".red().bold(),
                    "Triage failed".red().bold(),
                    format!("[{}]", code).dimmed()
                );
                println!("  {}", detail.red());
            }
        }

        if report.failed_over {
            println!(
                "\n{} {}",
                "⚠".yellow(),
                "Fallback provider completed this run".yellow()
            );
        }
        self.show_usage_line(report);
        if self.verbosity.show_usage() {
            self.show_attempts(report);
        }
        println!();
    }

    /// One line per run for quiet mode
    fn show_quiet_line(&self, report: &TriageReport) {
        match &report.outcome {
            TriageOutcome::Decision { decision } | TriageOutcome::Escalated { decision } => {
                println!("{} {}", report.ticket_id, decision.summary_line());
            }
            TriageOutcome::Failed { code, .. } => {
                println!("{} failed [{}]", report.ticket_id, code);
            }
        }
    }

    fn show_traces(&self, traces: &[ToolTrace]) {
        for (i, trace) in traces.iter().enumerate() {
            let mark = if trace.success {
                "✓".green()
            } else {
                "✗".red()
            };
            println!(
                "  {}. {} {} {}",
                (i + 1).to_string().cyan(),
                trace.tool,
                mark,
                format!("({}ms)", trace.duration_ms).dimmed()
            );
            for line in trace_summary(trace) {
                if trace.success {
                    println!("     {}", line.dimmed());
                } else {
                    println!("     {}", line.red());
                }
            }
        }
    }

    fn show_decision(&self, decision: &TriageDecision, escalated: bool) {
        if escalated {
            println!("\n{} {}", "⚠".yellow(), "Escalated to human".yellow().bold());
        } else {
            println!("\n{} {}", "✓".green(), "Decision".green().bold());
        }
        println!("  Department: {}", decision.department.as_str().bold());
        println!("  Priority:   {}", priority_colored(decision.priority_score));
        println!(
            "  Escalate:   {}",
            if decision.escalate {
                "yes".yellow()
            } else {
                "no".normal()
            }
        );
        println!("  Reason:     {}", decision.reason);
        if !decision.kb_articles_used.is_empty() {
            println!(
                "  Articles:   {}",
                decision.kb_articles_used.join(", ").dimmed()
            );
        }
        if let Some(summary) = &decision.summary {
            println!("  Summary:    {}", summary);
        }
        if let Some(reply) = &decision.suggested_reply {
            println!("\n{}", "Suggested reply".bold().cyan());
            for line in reply.lines() {
                println!("  {}", line);
            }
        }
    }

    fn show_usage_line(&self, report: &TriageReport) {
        println!(
            "\n{}",
            format!(
                "tokens: {} prompt + {} completion = {} total | rounds: {} | {}ms",
                report.usage.prompt_tokens,
                report.usage.completion_tokens,
                report.usage.total_tokens,
                report.rounds,
                report.elapsed_ms
            )
            .dimmed()
        );
    }

    fn show_attempts(&self, report: &TriageReport) {
        println!("\n{}", "Provider attempts".bold().cyan());
        for (i, attempt) in report.provider_attempts.iter().enumerate() {
            let status = match &attempt.outcome {
                AttemptOutcome::Success => "ok".green(),
                AttemptOutcome::RateLimited => "rate limited".yellow(),
                AttemptOutcome::Error { kind } => kind.as_str().red(),
            };
            println!(
                "  {}. {} {} {} {}",
                (i + 1).to_string().cyan(),
                attempt.role.as_str(),
                attempt.provider.dimmed(),
                attempt.model.dimmed(),
                status
            );
        }
    }

    /// Batch run summary
    pub fn show_batch_summary(&self, reports: &[TriageReport]) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        let decided = reports
            .iter()
            .filter(|r| matches!(r.outcome, TriageOutcome::Decision { .. }))
            .count();
        let escalated = reports
            .iter()
            .filter(|r| matches!(r.outcome, TriageOutcome::Escalated { .. }))
            .count();
        let failed = reports
            .iter()
            .filter(|r| matches!(r.outcome, TriageOutcome::Failed { .. }))
            .count();
        let tokens: u32 = reports.iter().map(|r| r.usage.total_tokens).sum();
        let elapsed: u64 = reports.iter().map(|r| r.elapsed_ms).sum();

        println!("\n{}", "Batch summary".bold().cyan());
        println!("{}", "-".repeat(60).cyan());
        println!(
            "  {} decided | {} escalated | {} failed",
            decided.to_string().green(),
            escalated.to_string().yellow(),
            failed.to_string().red()
        );
        println!(
            "  {}",
            format!("{} tokens | {}ms total", tokens, elapsed).dimmed()
        );
        println!();
    }

    /// Display error message
    pub fn show_error(&self, error: &str) {
        println!("{} {}", "Error:".red().bold(), error.red());
    }

    /// Display warning message
    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    /// Display info message
    pub fn show_info(&self, info: &str) {
        println!("{} {}", "Info:".cyan(), info);
    }

    /// Clear screen
    pub fn clear_screen(&self) -> io::Result<()> {
        execute!(io::stdout(), Clear(ClearType::All), cursor::MoveTo(0, 0))
    }
}

fn priority_colored(score: f64) -> ColoredString {
    let label = format!("{:.2}", score);
    if score >= 0.9 {
        label.red().bold()
    } else if score >= 0.5 {
        label.yellow()
    } else {
        label.green()
    }
}

/// Compact per-tool lines under a trace entry
fn trace_summary(trace: &ToolTrace) -> Vec<String> {
    if !trace.success {
        let code = trace
            .outcome
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("error");
        let message = trace
            .outcome
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("tool failed");
        return vec![format!("{}: {}", code, message)];
    }

    match trace.tool.as_str() {
        FETCH_CUSTOMER_DATA => {
            let name = trace
                .outcome
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("?");
            let plan = trace
                .outcome
                .pointer("/plan_details/label")
                .and_then(Value::as_str)
                .or_else(|| trace.outcome.get("plan").and_then(Value::as_str))
                .unwrap_or("?");
            let region = trace
                .outcome
                .get("region")
                .and_then(Value::as_str)
                .unwrap_or("?");
            vec![format!("{} | plan: {} | region: {}", name, plan, region)]
        }
        QUERY_KNOWLEDGE_BASE => match trace.outcome.as_array() {
            Some(hits) if !hits.is_empty() => hits
                .iter()
                .map(|hit| {
                    format!(
                        "{} {} (score {:.2})",
                        hit.get("article_id").and_then(Value::as_str).unwrap_or("?"),
                        hit.get("topic").and_then(Value::as_str).unwrap_or("?"),
                        hit.get("relevance_score")
                            .and_then(Value::as_f64)
                            .unwrap_or(0.0)
                    )
                })
                .collect(),
            _ => vec!["no matching articles".to_string()],
        },
        _ => vec![trace.outcome.to_string()],
    }
}
