//! freeapi-control - Dashboard backend for free AI API sites.
//!
//! Features:
//! - Site records with credentials, balances and model lists
//! - Balance and model polling through OpenAI-style billing endpoints
//! - Sequential batch polling with per-site reporting
//! - JSON file or SQLite storage

pub mod api;
pub mod balance;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod poller;
pub mod service;
pub mod site;
pub mod store;
