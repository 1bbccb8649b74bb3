//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::web::state::{AppState, SessionData};

/// What an authenticated handler gets from the middleware: the caller's
/// bearer token (forwarded to every backend call) and the session handle.
#[derive(Clone)]
pub struct AuthContext {
    pub access_token: String,
    pub session: Arc<RwLock<SessionData>>,
}

/// Middleware that validates the bearer token and resolves its session.
///
/// If valid, inserts an [`AuthContext`] into request extensions for
/// handlers to use. If missing or unknown, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let access_token = bearer_token(&req).ok_or(StatusCode::UNAUTHORIZED)?;

    let session = state
        .session(&access_token)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(AuthContext {
        access_token,
        session,
    });

    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}
