//! services/api/src/web/auth.rs
//!
//! Login, logout and session refresh. The client completes the OAuth
//! consent flow itself and hands the resulting access token to this
//! service, which verifies the identity, enforces the hosted-domain
//! restriction and loads the session collections from the backend.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use recruit_core::ports::PortError;
use recruit_core::roster::Roster;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::web::middleware::AuthContext;
use crate::web::rest::port_error_response;
use crate::web::state::{AppState, SessionData};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// OAuth access token obtained by the client's consent flow.
    pub access_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub email: String,
    pub name: String,
    pub picture: String,
    pub hd: Option<String>,
    pub student_count: usize,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct RefreshResponse {
    pub student_count: usize,
    pub loaded_at: DateTime<Utc>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Verify the token, load all collections, open a session
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Token rejected by the identity provider"),
        (status = 403, description = "Account outside the allowed domain"),
        (status = 502, description = "Backend fetch failed")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Resolve the identity behind the token.
    let user = state
        .identity
        .user_info(&req.access_token)
        .await
        .map_err(|e| {
            error!("Failed to resolve user info: {:?}", e);
            (
                StatusCode::UNAUTHORIZED,
                "ログインに失敗しました。再度お試しください".to_string(),
            )
        })?;

    // 2. Enforce the hosted-domain restriction.
    if let Some(domain) = &state.config.allowed_domain {
        if !user.domain_matches(domain) {
            return Err((
                StatusCode::FORBIDDEN,
                format!("@{domain} のアカウントのみログイン可能です"),
            ));
        }
    }

    // 3. Load every collection. A failure here aborts back to the
    //    logged-out state; nothing partially loaded is kept.
    let snapshot = state
        .store
        .fetch_all(&req.access_token)
        .await
        .map_err(|e| {
            error!("Failed to load spreadsheet data: {:?}", e);
            fetch_error_response(&e)
        })?;

    let roster = Roster::from(snapshot);
    for warning in roster.config.validate() {
        warn!("config: {warning}");
    }

    let data = SessionData::new(user.clone(), roster);
    let response = LoginResponse {
        email: user.email,
        name: user.name,
        picture: user.picture,
        hd: user.hd,
        student_count: data.roster.students.len(),
        loaded_at: data.loaded_at,
    };
    state.insert_session(req.access_token, data).await;
    info!("session opened for {}", response.email);

    Ok((StatusCode::OK, Json(response)))
}

/// POST /auth/logout - Drop the session for this token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.remove_session(&ctx.access_token).await;
    Ok(StatusCode::OK)
}

/// POST /auth/refresh - Re-fetch every collection for the current session.
/// This is the manual recovery path after a failed write: reload, re-edit.
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let snapshot = state
        .store
        .fetch_all(&ctx.access_token)
        .await
        .map_err(|e| {
            error!("Failed to reload spreadsheet data: {:?}", e);
            port_error_response(&e)
        })?;

    let mut session = ctx.session.write().await;
    session.roster = Roster::from(snapshot);
    session.loaded_at = Utc::now();
    for warning in session.roster.config.validate() {
        warn!("config: {warning}");
    }

    Ok(Json(RefreshResponse {
        student_count: session.roster.students.len(),
        loaded_at: session.loaded_at,
    }))
}

/// Maps a load failure to a user-facing message that distinguishes a
/// missing sheet/range from an access problem.
fn fetch_error_response(err: &PortError) -> (StatusCode, String) {
    match err {
        PortError::NotFound(what) => (
            StatusCode::BAD_GATEWAY,
            format!("スプレッドシートの構成が見つかりません: {what}"),
        ),
        PortError::PermissionDenied(_) => (
            StatusCode::FORBIDDEN,
            "スプレッドシートへのアクセスが拒否されました".to_string(),
        ),
        PortError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            "認証の有効期限が切れました。再度ログインしてください".to_string(),
        ),
        PortError::Unexpected(_) => (
            StatusCode::BAD_GATEWAY,
            "データの読み込みに失敗しました".to_string(),
        ),
    }
}
