//! HTTP API Layer
//!
//! REST API for the reimbursement system using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: claims, events and users, reports, health
//! - **Middleware**: bearer authentication, audit logging
//! - **DTOs**: request bodies and query strings
//! - **Error Handling**: domain error categories mapped onto status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(store, files, config);
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{FileStore, RecordStore};
use domain_directory::DirectoryService;
use domain_reimbursement::{Clock, ReimbursementService};
use domain_reporting::ReportingService;

use crate::config::ApiConfig;
use crate::handlers::{claims, directory, health, reports};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub directory: DirectoryService,
    pub claims: ReimbursementService,
    pub reports: ReportingService,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the services over the given collaborators
    pub fn new(store: Arc<dyn RecordStore>, files: Arc<dyn FileStore>, config: ApiConfig) -> Self {
        let directory = DirectoryService::new(store.clone());
        let claims = ReimbursementService::new(store.clone(), files, directory.clone(), config.lifecycle());
        let reports = ReportingService::new(store.clone(), directory.clone(), config.currency, config.timezone);
        Self {
            store,
            directory,
            claims,
            reports,
            config,
        }
    }

    /// Replaces the wall clock of both engines
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.claims = self.claims.with_clock(clock.clone());
        self.reports = self.reports.with_clock(clock);
        self
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let claims_routes = Router::new()
        .route("/", post(claims::create_claim).get(claims::list_claims))
        .route("/:id", get(claims::get_claim))
        .route("/:id/approve", post(claims::approve))
        .route("/:id/reject", post(claims::reject))
        .route("/:id/clarification", post(claims::request_clarification))
        .route("/:id/clarification/response", post(claims::respond_to_clarification))
        .route("/:id/resubmit", post(claims::resubmit))
        .route("/:id/note", put(claims::set_validator_note))
        .route("/:id/items/:item_id/decision", post(claims::decide_item))
        .route("/:id/items/:item_id/note", put(claims::annotate_item))
        .route("/:id/items/:item_id/receipt", get(claims::receipt_url));

    let event_routes = Router::new()
        .route("/", post(directory::create_event).get(directory::list_events))
        .route(
            "/:id",
            get(directory::get_event)
                .put(directory::update_event)
                .delete(directory::delete_event),
        );

    let user_routes = Router::new()
        .route("/", post(directory::create_user).get(directory::list_users))
        .route("/me", get(directory::current_user))
        .route("/:id", get(directory::get_user).put(directory::update_user))
        .route("/:id/deactivate", post(directory::deactivate_user));

    let report_routes = Router::new()
        .route("/summary", get(reports::summary))
        .route("/breakdown", get(reports::breakdown))
        .route("/export", post(reports::export));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/claims", claims_routes)
        .route("/receipts", post(claims::upload_receipt))
        .nest("/events", event_routes)
        .nest("/users", user_routes)
        .nest("/reports", report_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
