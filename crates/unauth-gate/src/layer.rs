//! axum adapter for [`Gate`].
//!
//! The router must be served with
//! `into_make_service_with_connect_info::<SocketAddr>()` so the remote address
//! is available to the middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use crate::client::ClientAddr;
use crate::gate::Gate;

pub async fn unauth_gate_middleware(
    State(gate): State<Arc<Gate>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let client = ClientAddr::from_socket(remote);
    if !gate.admit(&client).is_admitted() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    // the response head is owned here, so reading the status leaves it untouched
    let response = next.run(req).await;
    gate.record_outcome(&client, response.status());
    response
}

pub trait GateRouterExt {
    /// Put every route registered so far behind the gate.
    fn with_unauth_gate(self, gate: Arc<Gate>) -> Self;
}

impl<S> GateRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_unauth_gate(self, gate: Arc<Gate>) -> Self {
        self.layer(middleware::from_fn_with_state(gate, unauth_gate_middleware))
    }
}
