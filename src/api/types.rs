//! Request and response types for the dashboard API.

use crate::poller::{BatchResultEntry, BatchSummary, EntryOutcome};
use crate::site::Site;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct SiteResponse {
    pub success: bool,
    pub site: Site,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBalanceResponse {
    pub success: bool,
    pub balance: f64,
    pub total_limit: Option<f64>,
    pub models: Vec<String>,
    pub model_count: usize,
}

/// Wire form of one batch entry: `success` plus either the balance fields
/// or `error`.
#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntryResponse {
    pub id: String,
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BatchResultEntry> for BatchEntryResponse {
    fn from(entry: BatchResultEntry) -> Self {
        match entry.outcome {
            EntryOutcome::Success { balance, model_count } => Self {
                id: entry.id,
                name: entry.name,
                success: true,
                balance: Some(balance),
                model_count: Some(model_count),
                error: None,
            },
            EntryOutcome::Failure { message } => Self {
                id: entry.id,
                name: entry.name,
                success: false,
                balance: None,
                model_count: None,
                error: Some(message),
            },
        }
    }
}

#[derive(Serialize)]
pub struct CheckAllResponse {
    pub success: bool,
    pub results: Vec<BatchEntryResponse>,
    pub summary: BatchSummary,
}
