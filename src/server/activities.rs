//! GET  /api/activities: scoped, newest-first history
//! POST /api/activities: record a note authored by the caller

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::activity::{ActivityAction, ActivityQuery, NewActivity};
use crate::error::{AppError, AppResult};
use crate::identity::activity_scope;

pub async fn list_activities(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ActivityQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let viewer = state.require_identity(&headers)?;
    let Query(mut query) = query?;
    // The requested user id is folded into the scope, not the query
    let scope = activity_scope(&viewer, query.user_id.take().as_deref());
    let rows = state.activities.query(&scope, &query).await;
    Ok(Json(json!({"status": "ok", "count": rows.len(), "activities": rows})))
}

pub async fn create_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    entry: Result<Json<NewActivity>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let actor = state.require_identity(&headers)?;
    let Json(entry) = entry?;
    // State-change facts come from the operations themselves; callers may only annotate
    if entry.action != ActivityAction::NoteAdded {
        return Err(AppError::user("invalid_activity", "only note_added entries may be posted"));
    }
    if entry.entity_type.trim().is_empty() || entry.entity_id.trim().is_empty() {
        return Err(AppError::user("invalid_activity", "entityType and entityId are required"));
    }
    state.activities.record(&actor, entry).await;
    Ok((StatusCode::CREATED, Json(json!({"status": "ok"}))))
}
