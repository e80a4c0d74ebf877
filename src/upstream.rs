//! Token-protected demo API that sits behind the gate.
//!
//! `/api/whoami` answers `401` without a known token, `/api/admin` answers
//! `401` without a known token and `403` for a token that is not an admin one.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use url::form_urlencoded;

pub const TOKEN_HEADER: &str = "x-unauth-guard-token";

#[derive(Clone, Debug, Default)]
pub struct TokenPolicy {
    user_tokens: HashSet<String>,
    admin_tokens: HashSet<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    User,
    Admin,
}

impl TokenPolicy {
    pub fn new<U, A>(user_tokens: U, admin_tokens: A) -> Self
    where
        U: IntoIterator<Item = String>,
        A: IntoIterator<Item = String>,
    {
        let admin_tokens: HashSet<String> = normalize(admin_tokens);
        // admins may call user endpoints too
        let mut user_tokens = normalize(user_tokens);
        user_tokens.extend(admin_tokens.iter().cloned());
        Self {
            user_tokens,
            admin_tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_tokens.is_empty()
    }

    pub fn access(&self, token: Option<&str>) -> Access {
        match token {
            Some(token) if self.admin_tokens.contains(token) => Access::Admin,
            Some(token) if self.user_tokens.contains(token) => Access::User,
            _ => Access::Anonymous,
        }
    }
}

fn normalize(tokens: impl IntoIterator<Item = String>) -> HashSet<String> {
    tokens
        .into_iter()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

pub fn extract_token(req: &Request<Body>) -> Option<String> {
    let headers = req.headers();
    if let Some(raw) = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    if let Some(raw) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = raw.strip_prefix("Bearer ") {
            let trimmed = token.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    let query = req.uri().query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, value)| (key == "token" || key == "auth_token") && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
}

pub fn api_router(tokens: Arc<TokenPolicy>) -> Router {
    Router::new()
        .route("/api/whoami", get(whoami))
        .route("/api/admin", get(admin))
        .with_state(tokens)
}

async fn whoami(State(tokens): State<Arc<TokenPolicy>>, req: Request<Body>) -> Response {
    match tokens.access(extract_token(&req).as_deref()) {
        Access::Anonymous => StatusCode::UNAUTHORIZED.into_response(),
        Access::User => Json(json!({ "role": "user" })).into_response(),
        Access::Admin => Json(json!({ "role": "admin" })).into_response(),
    }
}

async fn admin(State(tokens): State<Arc<TokenPolicy>>, req: Request<Body>) -> Response {
    match tokens.access(extract_token(&req).as_deref()) {
        Access::Anonymous => StatusCode::UNAUTHORIZED.into_response(),
        Access::User => StatusCode::FORBIDDEN.into_response(),
        Access::Admin => Json(json!({ "ok": true })).into_response(),
    }
}
