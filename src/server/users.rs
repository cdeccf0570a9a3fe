//! GET  /api/users: manager and above
//! POST /api/users: admins only

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::activity::{ActivityAction, NewActivity};
use crate::error::{AppError, AppResult};
use crate::identity::{require_at_least, require_one_of, NewUser, Role};

pub async fn list_users(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let viewer = state.identity(&headers);
    require_at_least(viewer.as_ref(), Role::Manager)?;
    Ok(Json(json!({"status": "ok", "users": state.users.list()})))
}

pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let viewer = state.identity(&headers);
    let actor = require_one_of(viewer.as_ref(), &[Role::Admin])?.clone();
    let Json(payload) = payload?;

    let users = state.users.clone();
    let created = tokio::task::spawn_blocking(move || users.create_user(payload))
        .await
        .map_err(|e| AppError::internal("create_user_task".to_string(), e.to_string()))??;

    state
        .activities
        .record(
            &actor,
            NewActivity::new(
                ActivityAction::Created,
                "user",
                created.id.clone(),
                format!("Created user {} ({})", created.email, created.role),
            )
            .with_metadata(json!({"role": created.role})),
        )
        .await;

    Ok((StatusCode::CREATED, Json(json!({"status": "ok", "user": created}))))
}
