//! POST /api/auth/login : verify credentials, set the session cookie
//! POST /api/auth/logout: drop the cookie client-side
//! GET  /api/auth/me    : current identity

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::info;

use super::{clear_session_cookie, set_session_cookie, with_cookie, AppState};
use crate::error::AppResult;
use crate::identity::{AuthProvider, LoginRequest};

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let auth = state.auth.clone();
    // Argon2 verification is CPU-bound
    let resp = tokio::task::spawn_blocking(move || auth.login(&payload))
        .await
        .map_err(|e| anyhow::anyhow!("login task failed: {}", e))??;
    info!(target: "auth", user_id = %resp.identity.id, role = %resp.identity.role, "login");
    let headers = with_cookie(HeaderMap::new(), set_session_cookie(&resp.token, state.secure_cookies)?);
    Ok((headers, Json(json!({"status": "ok", "user": resp.identity, "token": resp.token}))))
}

/// There is no server-side revocation list; the credential stays valid until
/// expiry if a client keeps a copy.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(id) = state.identity(&headers) {
        info!(target: "auth", user_id = %id.id, "logout");
    }
    let h = with_cookie(HeaderMap::new(), clear_session_cookie(state.secure_cookies));
    (h, Json(json!({"status": "ok"})))
}

pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let id = state.require_identity(&headers)?;
    Ok(Json(json!({"status": "ok", "user": id})))
}
