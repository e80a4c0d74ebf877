use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use unauth_gate::{Gate, GateRouterExt};

use crate::upstream::{api_router, TokenPolicy};

/// Demo API behind the gate plus an ungated health probe.
///
/// Serve with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_router(gate: Arc<Gate>, tokens: Arc<TokenPolicy>) -> Router {
    let gated = api_router(tokens).with_unauth_gate(gate);
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .merge(gated)
        .layer(TraceLayer::new_for_http())
}
