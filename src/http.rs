//! Shared HTTP client factory.
//!
//! Every outbound poll goes through a client built here so the TLS policy
//! and user agent stay consistent across the codebase.

use reqwest::Client;
use std::time::Duration;

/// Default per-request timeout for balance polling (15 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Browser-like user agent; several free-tier mirrors reject unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Options for building a polling client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Create a polling client with the default options.
pub fn create_client() -> reqwest::Result<Client> {
    create_client_with(&ClientOptions::default())
}

/// Create a polling client with custom options.
///
/// With `accept_invalid_certs` set, certificate validation is turned off for
/// every request made by this client. Self-hosted mirrors commonly run with
/// self-signed certificates.
pub fn create_client_with(options: &ClientOptions) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(options.timeout)
        .user_agent(options.user_agent.as_str())
        .danger_accept_invalid_certs(options.accept_invalid_certs)
        .build()
}
