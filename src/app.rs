//! Router assembly.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};

/// Largest accepted form submission.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

fn page_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route(
            "/cadastrar/",
            get(handlers::create_form).post(handlers::create_lead),
        )
        .route("/lista/", get(handlers::list_leads))
        .route("/visualizar/:id/", get(handlers::view_lead))
        .route(
            "/editar/:id/",
            get(handlers::edit_form).post(handlers::update_lead),
        )
        .route(
            "/excluir/:id/",
            get(handlers::delete_confirm).post(handlers::delete_lead),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

fn finish(pages: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    // Health check stays outside the page layers so probes are never throttled.
    Router::new()
        .route("/health", get(handlers::health))
        .route("/health/", get(handlers::health))
        .merge(pages)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Full application without rate limiting. Used by tests, which drive the
/// router without a peer address.
pub fn router(state: Arc<AppState>) -> Router {
    finish(page_routes(), state)
}

/// Production router: page routes limited to 10 req/s per client IP, burst of 20.
///
/// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`
/// so the limiter can fall back to the peer address.
pub fn rate_limited_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let pages = page_routes().layer(ServiceBuilder::new().layer(GovernorLayer {
        config: governor_conf,
    }));
    Ok(finish(pages, state))
}
