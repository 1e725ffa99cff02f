use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};
use tokio_util::sync::CancellationToken;

use super::api::api_router;
use crate::auth::ClaimsVerifier;
use crate::authz::{ChatParticipantGate, ScopeAuthorizer};
use crate::config::ServerConfig;
use crate::ingest::{DocumentTypeClassifier, ExtensionClassifier, Ingestion};
use crate::store::{Store, StoreRoster};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub ingestion: Arc<dyn Ingestion>,
    pub classifier: Arc<dyn DocumentTypeClassifier>,
    pub verifier: Arc<dyn ClaimsVerifier>,
    pub authorizer: ScopeAuthorizer,
    /// Shared client for per-request directory lookups.
    pub http: reqwest::Client,
    pub config: ServerConfig,
    /// Cancelled on shutdown. Each request's principal holds a child token,
    /// so pending directory and roster lookups deny instead of waiting.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        ingestion: Arc<dyn Ingestion>,
        verifier: Arc<dyn ClaimsVerifier>,
        config: ServerConfig,
    ) -> Self {
        let roster = Arc::new(StoreRoster(Arc::clone(&store)));
        let gate = ChatParticipantGate::new(roster).with_timeout(config.roster_timeout());

        Self {
            store,
            ingestion,
            classifier: Arc::new(ExtensionClassifier::default()),
            verifier,
            authorizer: ScopeAuthorizer::new(gate),
            http: reqwest::Client::new(),
            config,
            shutdown: CancellationToken::new(),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.request_size_limit;

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
