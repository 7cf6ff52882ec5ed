//! BalanceResolver - Reads account balance and model lists from API sites.
//!
//! Two chained calls per site:
//! - `/v1/dashboard/billing/subscription`: `hard_limit_usd` is the balance
//! - `/v1/models`: `data[].id` are the available models
//!
//! Only the billing call can fail a resolution. A broken model listing
//! degrades to an empty model list.


use crate::error::ResolutionError;
use crate::http::{create_client_with, ClientOptions};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const SUBSCRIPTION_PATH: &str = "/v1/dashboard/billing/subscription";
const MODELS_PATH: &str = "/v1/models";
const REJECTED_FALLBACK_MESSAGE: &str = "failed to retrieve subscription info";

/// Longest body excerpt written to debug logs.
const LOG_EXCERPT_CHARS: usize = 300;

/// Normalized result of one successful resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceData {
    /// `hard_limit_usd` rounded to cents.
    pub balance: f64,
    /// `hard_limit_usd` exactly as reported.
    pub total_limit: Option<f64>,
    pub models: Vec<String>,
}

impl BalanceData {
    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}

/// The billing response, classified once at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBilling {
    /// `hard_limit_usd` was present. `None` means present but null/non-numeric.
    Accepted { hard_limit_usd: Option<f64> },
    /// `hard_limit_usd` was absent; `error` is the remote's `error.message`.
    Rejected { error: Option<String> },
}

impl ParsedBilling {
    /// Classify a billing response body.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let json: Value = serde_json::from_str(body)?;

        if let Some(limit) = json.get("hard_limit_usd") {
            return Ok(Self::Accepted {
                hard_limit_usd: numeric(limit),
            });
        }

        let error = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(Self::Rejected { error })
    }
}

/// Numbers pass through, numeric strings are parsed, everything else is `None`.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Round to two decimal places.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Strip exactly one trailing `/`.
pub fn normalize_base_url(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Extract model ids from a `/v1/models` body; any unexpected shape yields `[]`.
pub fn parse_model_ids(body: &str) -> Vec<String> {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "model list is not valid JSON");
            return Vec::new();
        }
    };

    match json.get("data").and_then(|d| d.as_array()) {
        Some(entries) => entries
            .iter()
            .filter_map(|m| m.get("id").and_then(|id| id.as_str()))
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(LOG_EXCERPT_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Resolves balance and models for API sites.
#[derive(Clone)]
pub struct BalanceResolver {
    client: Client,
    timeout: Duration,
}

impl BalanceResolver {
    /// Resolver with default options (15s timeout, self-signed certs accepted).
    pub fn new() -> reqwest::Result<Self> {
        Self::with_options(&ClientOptions::default())
    }

    pub fn with_options(options: &ClientOptions) -> reqwest::Result<Self> {
        Ok(Self {
            client: create_client_with(options)?,
            timeout: options.timeout,
        })
    }

    fn get(&self, url: &str, api_key: &str) -> RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
    }

    fn classify(&self, err: reqwest::Error) -> ResolutionError {
        if err.is_timeout() {
            ResolutionError::Timeout(self.timeout)
        } else {
            ResolutionError::Network(err.to_string())
        }
    }

    /// Resolve balance, then models, for one site.
    pub async fn resolve(
        &self,
        base_url: &str,
        api_key: &str,
    ) -> Result<BalanceData, ResolutionError> {
        let base = normalize_base_url(base_url);

        let hard_limit_usd = match self.fetch_subscription(base, api_key).await? {
            ParsedBilling::Accepted { hard_limit_usd } => hard_limit_usd,
            ParsedBilling::Rejected { error } => {
                let message = error.unwrap_or_else(|| REJECTED_FALLBACK_MESSAGE.to_string());
                tracing::warn!(base = %base, error = %message, "subscription lookup rejected");
                return Err(ResolutionError::RemoteRejected(message));
            }
        };

        let balance = round_cents(hard_limit_usd.unwrap_or(0.0));
        tracing::info!(base = %base, balance = %format!("{:.2}", balance), "balance resolved");

        let models = self.fetch_models(base, api_key).await;

        Ok(BalanceData {
            balance,
            total_limit: hard_limit_usd,
            models,
        })
    }

    async fn fetch_subscription(
        &self,
        base: &str,
        api_key: &str,
    ) -> Result<ParsedBilling, ResolutionError> {
        let url = format!("{}{}", base, SUBSCRIPTION_PATH);
        tracing::debug!(url = %url, "checking subscription");

        let response = self
            .get(&url, api_key)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        tracing::debug!(url = %url, status = response.status().as_u16(), "subscription response");

        let body = response.text().await.map_err(|e| self.classify(e))?;
        tracing::debug!(body = excerpt(&body), "subscription body");

        ParsedBilling::parse(&body).map_err(|e| {
            tracing::warn!(url = %url, error = %e, "subscription body is not valid JSON");
            ResolutionError::MalformedResponse(e.to_string())
        })
    }

    /// Never fails: transport and shape problems yield an empty list.
    async fn fetch_models(&self, base: &str, api_key: &str) -> Vec<String> {
        let url = format!("{}{}", base, MODELS_PATH);
        tracing::debug!(url = %url, "listing models");

        let body = match self.get(&url, api_key).send().await {
            Ok(response) => response.text().await,
            Err(e) => Err(e),
        };

        match body {
            Ok(body) => {
                let models = parse_model_ids(&body);
                tracing::debug!(url = %url, count = models.len(), "models listed");
                models
            }
            Err(e) => {
                let err = self.classify(e);
                tracing::warn!(url = %url, error = %err, "model listing failed");
                Vec::new()
            }
        }
    }
}
