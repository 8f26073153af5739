use axum::extract::{Json, Query, State};
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::auth;
use crate::db;
use crate::error::AppError;
use crate::models::{
    ok, ApiResponse, ChangePrivilegeRequest, MemberStatus, PrintQuery, RemoveMemberRequest,
    WorkspaceIdRequest,
};
use crate::state::AppState;

/// Membership roster of a workspace, split into accepted members and
/// outstanding invitations.
pub async fn all_team_members(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(print): Query<PrintQuery>,
    Json(payload): Json<WorkspaceIdRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    if !auth::print_bypass(&state.config, print.print, print.secret.as_deref()) {
        auth::authenticate(&state, &headers).await?;
    }
    if payload.workspace_id.trim().is_empty() {
        return Err(AppError::BadRequest("workspaceId is required".to_string()));
    }
    db::get_workspace(&state.pool, &payload.workspace_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let members = db::list_team_members(&state.pool, &payload.workspace_id).await?;
    let (in_team, invited): (Vec<_>, Vec<_>) = members
        .into_iter()
        .partition(|member| member.status == MemberStatus::Accepted);

    Ok(ok(
        "Team members fetched successfully",
        json!({ "in_team": in_team, "invited": invited }),
    ))
}

/// Remove a member: the row is deleted, their notifications for this
/// workspace flip to revoked, and they get told about it.
pub async fn remove_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RemoveMemberRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    let workspace = db::get_workspace(&state.pool, &payload.workspace_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !db::is_admin(&state.pool, &user.id, &workspace.id).await? {
        return Err(AppError::Forbidden);
    }

    let email = payload.email.trim().to_lowercase();
    db::remove_member(&state.pool, &user, &workspace, &email).await?;
    state.metrics.add_notifications_created(1);
    tracing::info!(workspace_id = %workspace.id, %email, "member removed");

    Ok(ok("Member removed", json!({})))
}

pub async fn change_privilege(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChangePrivilegeRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    let workspace = db::get_workspace(&state.pool, &payload.workspace_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !db::is_admin(&state.pool, &user.id, &workspace.id).await? {
        return Err(AppError::Forbidden);
    }

    let email = payload.email.trim().to_lowercase();
    let changed =
        db::change_privilege(&state.pool, &workspace.id, &email, payload.privilege).await?;
    if !changed {
        return Err(AppError::NotFound);
    }

    Ok(ok("Privilege updated", json!({})))
}
