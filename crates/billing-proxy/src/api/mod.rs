//! HTTP API for the billing proxy.

mod accounts;
mod middleware;
mod topup;
mod types;

pub use accounts::*;
pub use middleware::{handle_panic, logging_middleware, not_found};
pub use topup::*;
pub use types::*;

use crate::auth::TokenIssuer;
use crate::error::ProxyError;
use crate::store::{Store, UserDirectory};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use itel_billing_client::{BillingClient, BillingError, IP_NOT_ALLOWED};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Local user records
    pub users: Arc<RwLock<UserDirectory>>,
    /// Persistent storage backend
    pub store: Arc<Store>,
    /// iTelBilling client
    pub billing: Arc<BillingClient>,
    /// Access token issuer
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(
        users: UserDirectory,
        store: Store,
        billing: BillingClient,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            users: Arc::new(RwLock::new(users)),
            store: Arc::new(store),
            billing: Arc::new(billing),
            tokens: Arc::new(tokens),
        }
    }

    /// Apply `update` under the write lock and persist the result.
    ///
    /// If the save fails the in-memory directory is rolled back.
    pub async fn commit<R>(
        &self,
        update: impl FnOnce(&mut UserDirectory) -> Result<R, ProxyError>,
    ) -> Result<R, ProxyError> {
        let mut users = self.users.write().await;
        let snapshot = users.clone();
        let result = update(&mut *users)?;

        if let Err(e) = self.store.save(&users).await {
            *users = snapshot;
            return Err(e);
        }
        Ok(result)
    }

    /// Decode a provider rejection, logging what the operator needs to act on.
    pub(crate) fn rejected(&self, operation: &str, description: &str) -> ProxyError {
        let err = ProxyError::provider(description);
        if let ProxyError::Provider { code, message, .. } = &err {
            if code == IP_NOT_ALLOWED {
                warn!(
                    operation,
                    allowed_ip = ?self.billing.allowed_ip(),
                    "iTelBilling refused our source IP; check the provider whitelist"
                );
            } else {
                warn!(operation, code = %code, message = %message, "iTelBilling rejected request");
            }
        }
        err
    }

    pub(crate) fn billing_failure(&self, operation: &str, e: BillingError) -> ProxyError {
        match e {
            BillingError::Rejected(envelope) => self.rejected(operation, &envelope.description),
            other => other.into(),
        }
    }
}

/// Map a body that failed to parse into a validation error.
pub(crate) fn invalid_body(rejection: JsonRejection) -> ProxyError {
    ProxyError::Validation(format!("Invalid request body: {}", rejection.body_text()))
}

/// Health check endpoint.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Local accounts
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login))
        // Provider verify/signup flows
        .route("/auth/pin/verify", post(accounts::verify_pin_user))
        .route("/auth/pin/signup", post(accounts::sign_up_pin_user))
        .route("/auth/client/verify", post(accounts::verify_client))
        .route("/auth/client/signup", post(accounts::sign_up_client))
        // Recharge
        .route("/topup/ip-client", post(topup::top_up_ip_client))
        .route("/topup/pin-user", post(topup::top_up_pin_user))
        .route("/topup/status/:recharge_id", get(topup::top_up_status))
        .fallback(middleware::not_found)
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
