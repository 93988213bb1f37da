//! HTTP API Layer
//!
//! This crate provides the REST API for the expense workflow using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for expenses, rules and reference data
//! - **Middleware**: Bearer authentication resolving the acting principal, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(ports, countries, config);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_expense::adapters::CountryCatalog;
use domain_expense::{ExpenseWorkflow, OrganizationDirectory, RuleAdministration, WorkflowPorts};

use crate::config::ApiConfig;
use crate::handlers::{expenses, health, reference, rules};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<ExpenseWorkflow>,
    pub rules: Arc<RuleAdministration>,
    pub directory: Arc<dyn OrganizationDirectory>,
    pub countries: Arc<CountryCatalog>,
    /// Adapters probed by `/health/ready`
    pub health_checks: Vec<Arc<dyn HealthCheckable>>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(ports: WorkflowPorts, countries: CountryCatalog, config: ApiConfig) -> Self {
        Self {
            rules: Arc::new(RuleAdministration::new(ports.rules.clone(), ports.directory.clone())),
            directory: ports.directory.clone(),
            workflow: Arc::new(ExpenseWorkflow::new(ports)),
            countries: Arc::new(countries),
            health_checks: Vec::new(),
            config,
        }
    }

    pub fn with_health_check(mut self, adapter: Arc<dyn HealthCheckable>) -> Self {
        self.health_checks.push(adapter);
        self
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let expense_routes = Router::new()
        .route("/", post(expenses::create_expense).get(expenses::list_expenses))
        .route("/:id", get(expenses::get_expense).put(expenses::update_expense))
        .route("/:id/submit", post(expenses::submit_expense))
        .route("/:id/approve", post(expenses::approve_expense))
        .route("/:id/reject", post(expenses::reject_expense))
        .route("/:id/cancel", post(expenses::cancel_expense));

    let rule_routes = Router::new()
        .route("/", get(rules::list_rules).post(rules::create_rule))
        .route("/:id", put(rules::update_rule).delete(rules::delete_rule));

    let reference_routes = Router::new().route("/countries", get(reference::list_countries));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/expenses", expense_routes)
        .nest("/rules", rule_routes)
        .nest("/reference", reference_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
