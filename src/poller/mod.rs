//! Batch balance polling.
//!
//! Sites are checked one at a time, in stored order. Each poll produces a new
//! collection with successful results applied, plus one report entry per site.
//! Saving that collection is the caller's job and happens once per poll.


use crate::balance::{BalanceData, BalanceResolver};
use crate::error::ResolutionError;
use crate::site::Site;
use chrono::Utc;
use serde::Serialize;

/// Outcome of checking one site within a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Success { balance: f64, model_count: usize },
    Failure { message: String },
}

/// One line of the batch report.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResultEntry {
    pub id: String,
    pub name: String,
    pub outcome: EntryOutcome,
}

impl BatchResultEntry {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, EntryOutcome::Success { .. })
    }
}

/// Aggregate counts over a batch report.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Result of a full poll: the updated collection, due for a single save,
/// and the per-site report in input order.
#[derive(Debug, Clone)]
pub struct BatchPoll {
    pub records: Vec<Site>,
    pub results: Vec<BatchResultEntry>,
}

impl BatchPoll {
    pub fn summary(&self) -> BatchSummary {
        let succeeded = self.results.iter().filter(|r| r.is_success()).count();
        BatchSummary {
            total: self.results.len(),
            succeeded,
            failed: self.results.len() - succeeded,
        }
    }
}

/// Check one site. On success the returned site carries the new balance
/// group; on failure it is returned unchanged.
pub async fn poll_one(
    resolver: &BalanceResolver,
    mut site: Site,
) -> (Site, Result<BalanceData, ResolutionError>) {
    let result = resolver.resolve(&site.url, &site.api_key).await;
    if let Ok(data) = &result {
        site.apply_balance(data, Utc::now());
    }
    (site, result)
}

/// Check every site in order. Individual failures never stop the batch.
pub async fn poll_all(resolver: &BalanceResolver, sites: Vec<Site>) -> BatchPoll {
    let mut records = Vec::with_capacity(sites.len());
    let mut results = Vec::with_capacity(sites.len());

    for site in sites {
        let (site, result) = poll_one(resolver, site).await;

        let outcome = match result {
            Ok(data) => {
                tracing::info!(
                    site = %site.name,
                    balance = data.balance,
                    models = data.model_count(),
                    "site checked"
                );
                EntryOutcome::Success {
                    balance: data.balance,
                    model_count: data.model_count(),
                }
            }
            Err(e) => {
                tracing::warn!(site = %site.name, kind = e.kind(), error = %e, "site check failed");
                EntryOutcome::Failure {
                    message: e.to_string(),
                }
            }
        };

        results.push(BatchResultEntry {
            id: site.id.clone(),
            name: site.name.clone(),
            outcome,
        });
        records.push(site);
    }

    let poll = BatchPoll { records, results };
    let summary = poll.summary();
    tracing::info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "batch poll finished"
    );
    poll
}
