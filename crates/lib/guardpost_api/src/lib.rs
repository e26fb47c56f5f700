//! # guardpost_api
//!
//! HTTP API library for Guardpost.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use guardpost_core::duty::{DutySessionManager, SessionQuery};
use guardpost_core::identity::{AuthGateway, CredentialVerifier, IdentityResolver, ProfileSource};
use guardpost_core::store::{DutyStore, UserStore};

use crate::config::ApiConfig;
use crate::handlers::{duty, health, profile};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Entry gate binding each request to a local user.
    pub gateway: AuthGateway,
    /// Clock-in / clock-out transitions.
    pub duty: DutySessionManager,
    /// Read side of duty sessions.
    pub sessions: SessionQuery,
    /// Backing store, for health checks.
    pub store: Arc<dyn DutyStore>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Wire the services over the given stores and identity provider seams.
    pub fn new(
        config: ApiConfig,
        users: Arc<dyn UserStore>,
        store: Arc<dyn DutyStore>,
        verifier: Arc<dyn CredentialVerifier>,
        profiles: Arc<dyn ProfileSource>,
    ) -> Self {
        let resolver = IdentityResolver::new(users, profiles);
        let gateway = AuthGateway::new(verifier, resolver).with_timeout(config.identity.timeout);
        Self {
            gateway,
            duty: DutySessionManager::new(store.clone()),
            sessions: SessionQuery::new(store.clone()),
            store,
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `guardpost_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    guardpost_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new().route(routes::GET_API_HEALTH, get(health::health_handler));

    // Every other route authenticates through the gateway, after body validation.
    let mobile = Router::new()
        .route(
            routes::GET_MOBILE_DUTY_ACTIVE,
            get(duty::active_session_handler),
        )
        .route(routes::POST_MOBILE_DUTY_CLOCK_IN, post(duty::clock_in_handler))
        .route(
            routes::POST_MOBILE_DUTY_CLOCK_OUT,
            post(duty::clock_out_handler),
        )
        .route(routes::GET_MOBILE_ME, get(profile::me_handler))
        .route(
            routes::POST_MOBILE_PROFILE_SYNC,
            post(profile::sync_profile_handler),
        );

    Router::new()
        .merge(public)
        .merge(mobile)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
