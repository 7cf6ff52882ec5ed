//! JSON API for the site dashboard.
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /api/sites - List sites
//! - POST /api/sites - Add a site
//! - PUT /api/sites/{id} - Edit a site
//! - DELETE /api/sites/{id} - Remove a site
//! - GET /api/stats - Balance statistics
//! - POST /api/sites/{id}/check-balance - Poll one site
//! - POST /api/sites/check-all-balances - Poll every site

mod auth;
mod handlers;
mod types;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::SiteService;

pub use auth::ADMIN_TOKEN_HEADER;
pub use types::*;

/// Application state shared across handlers.
pub struct AppState {
    pub service: SiteService,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(service: SiteService) -> Self {
        Self {
            service,
            admin_token: None,
        }
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token;
        self
    }
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/sites", get(handlers::list_sites).post(handlers::create_site))
        .route(
            "/api/sites/check-all-balances",
            post(handlers::check_all_balances),
        )
        .route(
            "/api/sites/{id}",
            put(handlers::update_site).delete(handlers::delete_site),
        )
        .route("/api/sites/{id}/check-balance", post(handlers::check_balance))
        .route("/api/stats", get(handlers::get_stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
