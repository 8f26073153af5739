use axum::extract::{Json, State};
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::auth;
use crate::db;
use crate::error::AppError;
use crate::models::{
    ok, ApiResponse, InviteResponseRequest, MarkNotificationReadRequest, Reaction,
};
use crate::state::AppState;

pub async fn get_all_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    let notifications = db::list_notifications_for_user(&state.pool, &user.id).await?;
    Ok(ok(
        "Notifications fetch successful",
        json!({ "notifications": notifications }),
    ))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<MarkNotificationReadRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    let updated =
        db::mark_notification_read(&state.pool, &payload.notification_id, &user.id).await?;
    if !updated {
        return Err(AppError::NotFound);
    }
    Ok(ok("Notification marked as read", json!({})))
}

/// Answer a workspace invite. The notification's reaction and the membership
/// row's status are updated together.
pub async fn accept_reject_workspace_invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<InviteResponseRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    if !matches!(payload.reaction, Reaction::Accepted | Reaction::Rejected) {
        return Err(AppError::BadRequest(
            "reaction must be accepted or rejected".to_string(),
        ));
    }

    db::respond_to_invite(&state.pool, &payload.notification_id, &user, payload.reaction).await?;
    tracing::info!(
        notification_id = %payload.notification_id,
        user_id = %user.id,
        reaction = payload.reaction.as_str(),
        "invite answered"
    );

    Ok(ok("Invite response recorded", json!({})))
}
