//! Rows of the relational store
//!
//! `Component`, `Provision` and `Tag` rows always reference an existing
//! parent; the store writes each document's rows in a single transaction.

use crate::schema::EffectiveDates;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One persisted compensation plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Row id
    pub id: i64,
    /// Plan title
    pub title: String,
    /// Period the plan is in force
    pub effective_dates: EffectiveDates,
    /// Sum of parseable component targets
    pub total_target: Option<f64>,
    /// Source file path the plan was extracted from
    pub source_file: String,
    /// Prose summary
    pub summary: String,
    /// How and when payouts happen
    pub payout_schedule: String,
    /// Creation time as stored by SQLite
    pub created_at: String,
    /// Last modification time, refreshed by trigger
    pub updated_at: String,
}

/// One compensation component belonging to a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Row id
    pub id: i64,
    /// Owning plan
    pub plan_id: i64,
    /// Component name
    pub name: String,
    /// Component type
    #[serde(rename = "type")]
    pub kind: String,
    /// Relative weight, when stated
    pub weight: Option<f64>,
    /// Target amount text
    pub target_amount: String,
    /// Payout frequency
    pub frequency: String,
    /// Metrics list (stored as JSON)
    pub metrics: Vec<String>,
    /// Payout structure (stored as JSON)
    pub structure: serde_json::Value,
}

/// Free-text special provision of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provision {
    /// Row id
    pub id: i64,
    /// Owning plan
    pub plan_id: i64,
    /// Provision text, never parsed further
    pub text: String,
}

/// Label attached to a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Row id
    pub id: i64,
    /// Owning component
    pub component_id: i64,
    /// Tag text
    pub tag: String,
}

/// Pipeline outcome recorded per source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Seen but not finished
    Pending,
    /// Structured rows written
    Completed,
    /// Dropped at some stage
    Failed,
}

impl ProcessingStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ProcessingStatus::Pending),
            "completed" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            _ => Err(format!("Unknown processing status: {}", s)),
        }
    }
}

/// Processing status ledger row, unique per file path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatusRecord {
    /// Source file path (unique key)
    pub file_path: String,
    /// Current status
    pub status: ProcessingStatus,
    /// Failure message, if failed
    pub error_message: Option<String>,
    /// Creation time as stored by SQLite
    pub created_at: String,
    /// Last modification time, refreshed by trigger
    pub updated_at: String,
}
