//! Route definitions.

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;

use bondrisk_engine::RiskService;

use crate::handlers;

/// Create the API router.
///
/// # Arguments
/// * `service` - The risk service
pub fn create_router(service: Arc<RiskService>) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))
        .route("/api/status", get(handlers::status))
        .route("/api/status/health", get(handlers::health))
        // Auth
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/delete", delete(handlers::delete_user))
        .route("/api/auth/password", put(handlers::change_password))
        .route("/api/auth/user/:username/id", get(handlers::get_user_id))
        // Market
        .route("/api/market/current-rate", get(handlers::current_rate))
        .route("/api/market/yield-curve", get(handlers::yield_curve))
        .route("/api/market/last-update", get(handlers::last_update))
        // Portfolio
        .route("/api/portfolio/user/:user_id", get(handlers::get_portfolio))
        .route("/api/portfolio/create", post(handlers::create_portfolio))
        .route("/api/portfolio/:portfolio_id/bonds", post(handlers::add_bond))
        .route(
            "/api/portfolio/:portfolio_id/bonds/:bond_id",
            delete(handlers::remove_bond),
        )
        .route(
            "/api/portfolio/:portfolio_id/stress-test",
            post(handlers::stress_test),
        )
        .route(
            "/api/portfolio/:portfolio_id/risk-analysis",
            post(handlers::risk_analysis),
        )
        // Export
        .route("/api/export/portfolio/:user_id/csv", get(handlers::export_csv))
        .with_state(service)
}
