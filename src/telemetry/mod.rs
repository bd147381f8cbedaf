//! Telemetry for triage runs
//!
//! Every state transition, tool invocation, provider attempt, and failover
//! lands here. The collector is cheap to clone and safe to share across
//! concurrent batch workers.

use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Everything a triage run emits
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    // Orchestrator events
    StateTransition {
        from: String,
        to: String,
        timestamp: Instant,
    },
    CorrectionIssued {
        kind: String,
        detail: String,
        timestamp: Instant,
    },
    RunCompleted {
        ticket_id: String,
        outcome: String,
        rounds: u32,
        timestamp: Instant,
    },

    // Tool events
    ToolStarted {
        tool: String,
        timestamp: Instant,
    },
    ToolCompleted {
        tool: String,
        duration_ms: u64,
        success: bool,
        error_kind: Option<String>,
        timestamp: Instant,
    },

    // Provider events
    ProviderAttempted {
        role: String,
        provider: String,
        success: bool,
        error_kind: Option<String>,
        timestamp: Instant,
    },
    RetryScheduled {
        provider: String,
        attempt: u32,
        delay_ms: u64,
        timestamp: Instant,
    },
    Failover {
        from: String,
        to: String,
        reason: String,
        timestamp: Instant,
    },
}

impl TelemetryEvent {
    /// Short label for the event stream view
    pub fn label(&self) -> &'static str {
        match self {
            TelemetryEvent::StateTransition { .. } => "state",
            TelemetryEvent::CorrectionIssued { .. } => "correction",
            TelemetryEvent::RunCompleted { .. } => "run",
            TelemetryEvent::ToolStarted { .. } => "tool_start",
            TelemetryEvent::ToolCompleted { .. } => "tool_done",
            TelemetryEvent::ProviderAttempted { .. } => "provider",
            TelemetryEvent::RetryScheduled { .. } => "retry",
            TelemetryEvent::Failover { .. } => "failover",
        }
    }
}

/// Running counters over the event log
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub state_transitions: usize,
    pub corrections_issued: usize,
    pub runs_completed: usize,
    pub tools_executed: usize,
    pub tools_succeeded: usize,
    pub tools_failed: usize,
    pub provider_attempts: usize,
    pub provider_failures: usize,
    pub retries_scheduled: usize,
    pub failovers: usize,
}

impl TelemetryStats {
    fn apply(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::StateTransition { .. } => self.state_transitions += 1,
            TelemetryEvent::CorrectionIssued { .. } => self.corrections_issued += 1,
            TelemetryEvent::RunCompleted { .. } => self.runs_completed += 1,
            TelemetryEvent::ToolStarted { .. } => self.tools_executed += 1,
            TelemetryEvent::ToolCompleted { success, .. } => {
                if *success {
                    self.tools_succeeded += 1;
                } else {
                    self.tools_failed += 1;
                }
            }
            TelemetryEvent::ProviderAttempted { success, .. } => {
                self.provider_attempts += 1;
                if !success {
                    self.provider_failures += 1;
                }
            }
            TelemetryEvent::RetryScheduled { .. } => self.retries_scheduled += 1,
            TelemetryEvent::Failover { .. } => self.failovers += 1,
        }
    }
}

/// Shared event log; clones point at the same storage
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record one event, updating the counters in the same call
    pub fn record(&self, event: TelemetryEvent) {
        self.stats.lock().unwrap().apply(&event);
        self.events.lock().unwrap().push(event);
    }

    /// Snapshot of the counters
    pub fn get_stats(&self) -> TelemetryStats {
        self.stats.lock().unwrap().clone()
    }

    /// Time since the collector was created
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Last n events, oldest first
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = self.events.lock().unwrap();
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Fraction of completed tool calls that succeeded; 1.0 when none ran
    pub fn tool_success_rate(&self) -> f64 {
        let stats = self.stats.lock().unwrap();
        let total = stats.tools_succeeded + stats.tools_failed;
        if total == 0 {
            1.0
        } else {
            stats.tools_succeeded as f64 / total as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Events shown in the trailing stream view at -vv
const EVENT_STREAM_TAIL: usize = 40;

/// End-of-session summary rendering
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: crate::cli::Verbosity,
}

impl TelemetryDisplay {
    pub fn new(collector: TelemetryCollector, verbosity: crate::cli::Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Print the session counters, plus the event tail at -vv
    pub fn display_summary(&self) {
        let stats = self.collector.get_stats();
        let elapsed = self.collector.elapsed();

        println!("
📊 Triage Session Summary");
        println!("─────────────────────────────────────");
        println!("Duration:          {:?}", elapsed);
        println!("Tickets processed: {}", stats.runs_completed);
        println!("Tool invocations:  {}", stats.tools_executed);
        println!("Success rate:      {:.1}%", self.collector.tool_success_rate() * 100.0);
        println!("Provider attempts: {}", stats.provider_attempts);
        println!("Retries:           {}", stats.retries_scheduled);
        println!("Failovers:         {}", stats.failovers);
        println!("Corrections:       {}", stats.corrections_issued);
        println!();

        if self.verbosity.show_events() {
            self.display_event_stream();
        }
    }

    /// Trailing raw event stream, labels only
    fn display_event_stream(&self) {
        let recent = self.collector.recent_events(EVENT_STREAM_TAIL);
        if recent.is_empty() {
            return;
        }
        let labels: Vec<&str> = recent.iter().map(TelemetryEvent::label).collect();
        println!("Recent events:     {}", labels.join(", "));
        println!();
    }
}
