//! Tracked API sites.
//!
//! A `Site` is one third-party endpoint with its credential and the cached
//! result of the last successful balance check.

use crate::balance::BalanceData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Balance below which a site counts as running low.
pub const LOW_BALANCE_THRESHOLD: f64 = 10.0;

/// A tracked API site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_key: String,
    /// Stored as `null` by older dashboards when the balance field was left blank.
    #[serde(default, deserialize_with = "null_as_default")]
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_limit: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub models: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: SiteStatus,
    pub created_at: DateTime<Utc>,
    pub last_checked: DateTime<Utc>,
}

/// Dashboard flag for a site.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    #[default]
    Active,
    Inactive,
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteStatus::Active => write!(f, "active"),
            SiteStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for SiteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SiteStatus::Active),
            "inactive" => Ok(SiteStatus::Inactive),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// Fields accepted when creating a site.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewSite {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    /// Number or numeric string.
    #[serde(default)]
    pub balance: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<SiteStatus>,
}

/// Fields replaced by an edit.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SiteUpdate {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub balance: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<SiteStatus>,
}

/// Aggregate numbers shown on the dashboard header.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    pub total: usize,
    pub active: usize,
    pub no_balance: usize,
    pub low_balance: usize,
    pub total_balance: f64,
}

impl Site {
    /// Build a new site from a create request.
    pub fn create(request: NewSite, now: DateTime<Utc>) -> Result<Self, String> {
        validate(&request.name, &request.url)?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name,
            url: request.url,
            api_key: request.api_key,
            balance: parse_loose_number(request.balance.as_ref()),
            total_limit: None,
            models: Vec::new(),
            status: request.status.unwrap_or_default(),
            created_at: now,
            last_checked: now,
        })
    }

    /// Apply an edit, keeping identity and cached model data.
    pub fn apply_update(&mut self, update: SiteUpdate, now: DateTime<Utc>) -> Result<(), String> {
        validate(&update.name, &update.url)?;
        self.name = update.name;
        self.url = update.url;
        self.api_key = update.api_key;
        self.balance = parse_loose_number(update.balance.as_ref());
        if let Some(status) = update.status {
            self.status = status;
        }
        self.last_checked = now;
        Ok(())
    }

    /// Overwrite the cached balance group with a fresh resolution.
    pub fn apply_balance(&mut self, data: &BalanceData, checked_at: DateTime<Utc>) {
        self.balance = data.balance;
        self.total_limit = data.total_limit;
        self.models = data.models.clone();
        self.last_checked = checked_at;
    }
}

/// Compute dashboard statistics over a collection.
pub fn compute_stats(sites: &[Site]) -> SiteStats {
    SiteStats {
        total: sites.len(),
        active: sites.iter().filter(|s| s.status == SiteStatus::Active).count(),
        no_balance: sites.iter().filter(|s| s.balance <= 0.0).count(),
        low_balance: sites
            .iter()
            .filter(|s| s.balance > 0.0 && s.balance < LOW_BALANCE_THRESHOLD)
            .count(),
        total_balance: sites.iter().map(|s| s.balance).sum(),
    }
}

fn validate(name: &str, url: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("name must not be empty".to_string());
    }
    if url.trim().is_empty() {
        return Err("url must not be empty".to_string());
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(format!("url must start with http:// or https://: {}", url));
    }
    Ok(())
}

/// Read a missing or `null` field as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Numbers or numeric strings become f64; anything else becomes 0.
fn parse_loose_number(value: Option<&serde_json::Value>) -> f64 {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}
