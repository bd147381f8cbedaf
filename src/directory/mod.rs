//! Customer Directory leaf store
//!
//! Read-only lookup of customer profiles by customer id, enriched with
//! plan-tier details at lookup time. Loaded once from `customers.json`
//! and `plan_tiers.json`, then shared immutably across tickets.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::{AgentError, Result};

/// Subscription plan, the closed tier enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Free,
    Pro,
    Enterprise,
}

impl PlanKind {
    pub fn key(&self) -> &'static str {
        match self {
            PlanKind::Free => "free",
            PlanKind::Pro => "pro",
            PlanKind::Enterprise => "enterprise",
        }
    }
}

/// Tier details merged into profiles from `plan_tiers.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanTier {
    pub label: String,
    #[serde(default)]
    pub sla_hours: Option<u32>,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default = "default_channel")]
    pub support_channel: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub auto_escalate: bool,
}

fn default_priority() -> String {
    "low".to_string()
}

fn default_channel() -> String {
    "email".to_string()
}

impl PlanTier {
    /// Fallback when a plan key has no entry in the tiers file
    fn default_for(plan: PlanKind) -> Self {
        Self {
            label: plan.key().to_string(),
            sla_hours: None,
            priority: default_priority(),
            support_channel: default_channel(),
            features: Vec::new(),
            auto_escalate: false,
        }
    }
}

/// One row of `customers.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub plan: PlanKind,
    pub region: String,
    #[serde(default)]
    pub seats: u32,
    #[serde(default)]
    pub tenure_months: u32,
    #[serde(default)]
    pub previous_tickets: u32,
}

/// Enriched profile returned by lookups; transient, never written back
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerProfile {
    #[serde(flatten)]
    pub record: CustomerRecord,
    pub plan_details: PlanTier,
}

/// Id-keyed read-only customer store
#[derive(Debug, Clone)]
pub struct CustomerDirectory {
    customers: HashMap<String, CustomerRecord>,
    tiers: HashMap<String, PlanTier>,
}

impl CustomerDirectory {
    /// Load `customers.json` and `plan_tiers.json` from the data directory
    pub fn load(data_dir: &Path) -> Result<Self> {
        let customers_raw = std::fs::read_to_string(data_dir.join("customers.json"))?;
        let customers: Vec<CustomerRecord> = serde_json::from_str(&customers_raw)?;

        let tiers_raw = std::fs::read_to_string(data_dir.join("plan_tiers.json"))?;
        let tiers: HashMap<String, PlanTier> = serde_json::from_str(&tiers_raw)?;

        Ok(Self::from_parts(customers, tiers))
    }

    /// Build directly from records, used by tests and frozen snapshots
    pub fn from_parts(customers: Vec<CustomerRecord>, tiers: HashMap<String, PlanTier>) -> Self {
        let customers = customers.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self { customers, tiers }
    }

    /// Profile lookup with tier enrichment
    pub fn get(&self, customer_id: &str) -> Result<CustomerProfile> {
        let record = self
            .customers
            .get(customer_id)
            .ok_or_else(|| AgentError::NotFound {
                entity: "customer".to_string(),
                key: customer_id.to_string(),
            })?;

        let plan_details = self
            .tiers
            .get(record.plan.key())
            .cloned()
            .unwrap_or_else(|| PlanTier::default_for(record.plan));

        Ok(CustomerProfile {
            record: record.clone(),
            plan_details,
        })
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}
