use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;

use crate::auth;
use crate::db;
use crate::error::AppError;
use crate::models::{
    ok, ApiResponse, CreateWorkspaceRequest, InviteSummary, InviteTeamMemberRequest, PrintQuery,
    UpdateWorkspaceNameRequest, WorkspaceIdRequest, WorkspaceView,
};
use crate::state::AppState;

/// Create a workspace. The creator lands in the membership ledger as an
/// accepted admin, and any initial team list is invited in the same
/// operation.
pub async fn create_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateWorkspaceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    let name = payload.name.trim();
    let description = payload.description.trim();
    if name.is_empty() || description.is_empty() {
        return Err(AppError::BadRequest(
            "workspace name and description are required".to_string(),
        ));
    }

    let (workspace, invites) = db::create_workspace(
        &state.pool,
        &user,
        name,
        description,
        &payload.team_members,
        payload.message.as_deref(),
    )
    .await?;
    record_invites(&state, &invites);
    tracing::info!(workspace_id = %workspace.id, creator = %user.id, "workspace created");

    Ok((
        StatusCode::CREATED,
        ok(
            "Workspace created successfully",
            json!({
                "workspace": WorkspaceView::from(&workspace),
                "invites": invites,
            }),
        ),
    ))
}

pub async fn get_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(print): Query<PrintQuery>,
    Json(payload): Json<WorkspaceIdRequest>,
) -> Result<Json<ApiResponse<WorkspaceView>>, AppError> {
    if !auth::print_bypass(&state.config, print.print, print.secret.as_deref()) {
        auth::authenticate(&state, &headers).await?;
    }
    let workspace = db::get_workspace(&state.pool, &payload.workspace_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ok("Workspace data found", WorkspaceView::from(&workspace)))
}

pub async fn get_all_workspaces(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<WorkspaceView>>>, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    let workspaces = db::list_workspaces_for_user(&state.pool, &user.id).await?;
    Ok(ok(
        "Workspaces fetched successfully",
        workspaces.iter().map(WorkspaceView::from).collect(),
    ))
}

pub async fn update_workspace_name(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateWorkspaceNameRequest>,
) -> Result<Json<ApiResponse<WorkspaceView>>, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("workspace name is required".to_string()));
    }

    let mut workspace = db::get_workspace(&state.pool, &payload.workspace_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !db::is_admin(&state.pool, &user.id, &workspace.id).await? {
        return Err(AppError::Forbidden);
    }

    db::update_workspace_name(&state.pool, &workspace.id, name).await?;
    workspace.name = name.to_string();
    Ok(ok("Workspace updated", WorkspaceView::from(&workspace)))
}

/// Invite a batch of emails; answers with the categorized summary.
pub async fn invite_team_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<InviteTeamMemberRequest>,
) -> Result<Json<ApiResponse<InviteSummary>>, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    let workspace = db::get_workspace(&state.pool, &payload.workspace_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !db::is_admin(&state.pool, &user.id, &workspace.id).await? {
        return Err(AppError::Forbidden);
    }

    let summary = db::invite_members(
        &state.pool,
        &workspace.id,
        &user,
        &payload.team_members,
        payload.message.as_deref(),
    )
    .await?;
    record_invites(&state, &summary);

    Ok(ok("Invitations processed", summary))
}

fn record_invites(state: &AppState, summary: &InviteSummary) {
    let sent = (summary.new_invites.len() + summary.re_invited.len()) as u64;
    if sent > 0 {
        state.metrics.add_invites_sent(sent);
        state.metrics.add_notifications_created(sent);
    }
}
