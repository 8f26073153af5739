use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth;
use crate::db;
use crate::error::AppError;
use crate::models::{
    ok, ApiResponse, CreateTaskRequest, DeleteTaskRequest, Task, TaskDetailQuery, TaskDetailView,
    TaskListQuery, TaskSummaryView, UpdateTaskRequest,
};
use crate::state::AppState;

pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    let title = payload.title.trim().to_string();
    let description = payload.description.trim().to_string();
    if title.is_empty() || description.is_empty() {
        return Err(AppError::BadRequest(
            "title and description are required".to_string(),
        ));
    }
    let due_date = parse_due_date(&payload.due_date)?;
    let assignees = parse_assignees(&payload.assignees)?;

    db::get_workspace(&state.pool, &payload.workspace_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let now = Utc::now().timestamp();
    let task = Task {
        id: Uuid::new_v4().to_string(),
        workspace_id: payload.workspace_id,
        created_by: user.id,
        title,
        description,
        due_date,
        priority: payload.priority,
        status: payload.status,
        assignees,
        tags: payload.tags,
        created_at: now,
        updated_at: now,
    };
    db::create_task(&state.pool, &task).await?;

    Ok((
        StatusCode::CREATED,
        ok("Task created successfully", TaskDetailView::from(&task)),
    ))
}

/// Partial patch: absent fields keep their stored value, present ones are
/// re-validated the same way creation validates them.
pub async fn update_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<ApiResponse<TaskDetailView>>, AppError> {
    auth::authenticate(&state, &headers).await?;
    if payload.task_id.trim().is_empty() {
        return Err(AppError::BadRequest("task id is required".to_string()));
    }

    let mut task = db::get_task(&state.pool, &payload.task_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(title) = payload.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::BadRequest("title cannot be empty".to_string()));
        }
        task.title = title;
    }
    if let Some(description) = payload.description {
        task.description = description.trim().to_string();
    }
    if let Some(due_date) = payload.due_date {
        task.due_date = parse_due_date(&due_date)?;
    }
    if let Some(priority) = payload.priority {
        task.priority = priority;
    }
    if let Some(status) = payload.status {
        task.status = status;
    }
    if let Some(assignees) = payload.assignees {
        task.assignees = parse_assignees(&assignees)?;
    }
    if let Some(tags) = payload.tags {
        task.tags = tags;
    }
    task.updated_at = Utc::now().timestamp();

    db::update_task(&state.pool, &task).await?;
    Ok(ok("Task updated successfully", TaskDetailView::from(&task)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DeleteTaskRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    auth::authenticate(&state, &headers).await?;
    if Uuid::parse_str(&payload.task_id).is_err() {
        return Err(AppError::BadRequest("invalid task id".to_string()));
    }

    let deleted = db::delete_task(&state.pool, &payload.task_id).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    Ok(ok("Task deletion successful", json!({})))
}

pub async fn get_all_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    if !auth::print_bypass(&state.config, query.print, query.secret.as_deref()) {
        auth::authenticate(&state, &headers).await?;
    }
    db::get_workspace(&state.pool, &query.workspace_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let tasks = db::list_tasks(&state.pool, &query.workspace_id).await?;
    let views: Vec<TaskSummaryView> = tasks.iter().map(TaskSummaryView::from).collect();
    Ok(ok("Tasks fetched successfully", json!({ "tasks": views })))
}

/// Full task record, gated on accepted membership of its workspace.
pub async fn detail_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TaskDetailQuery>,
) -> Result<Json<ApiResponse<TaskDetailView>>, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    let task = db::get_task(&state.pool, &query.task_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !db::is_accepted_member(&state.pool, &user.id, &task.workspace_id).await? {
        return Err(AppError::Forbidden);
    }

    Ok(ok("Task detail found", TaskDetailView::from(&task)))
}

fn parse_due_date(value: &str) -> Result<String, AppError> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("invalid due date format".to_string()))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

fn parse_assignees(values: &[String]) -> Result<Vec<String>, AppError> {
    values
        .iter()
        .map(|value| {
            Uuid::parse_str(value.trim())
                .map(|id| id.to_string())
                .map_err(|_| AppError::BadRequest("invalid assignee id".to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TaskStatus};
    use crate::testing;

    async fn seed_workspace(state: &AppState) -> (String, String) {
        let user_id = testing::seed_user(state, "Ada", "ada@example.com").await;
        let user = db::get_user_by_id(&state.pool, &user_id).await.unwrap().unwrap();
        let (workspace, _) =
            db::create_workspace(&state.pool, &user, "Apollo", "moonshot", &[], None)
                .await
                .unwrap();
        (user_id, workspace.id)
    }

    fn create_request(workspace_id: &str, due_date: &str) -> Json<CreateTaskRequest> {
        Json(CreateTaskRequest {
            workspace_id: workspace_id.to_string(),
            title: "Design the lander".to_string(),
            description: "Weight budget and thrust profile".to_string(),
            due_date: due_date.to_string(),
            priority: Priority::High,
            status: TaskStatus::Todo,
            assignees: Vec::new(),
            tags: vec!["engineering".to_string()],
        })
    }

    #[tokio::test]
    async fn create_rejects_malformed_date_and_assignees() {
        let state = testing::state().await;
        let (user_id, workspace_id) = seed_workspace(&state).await;
        let headers = testing::login_headers(&state, &user_id);

        let err = create_task(
            State(state.clone()),
            headers.clone(),
            create_request(&workspace_id, "09/01/2026"),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let mut request = create_request(&workspace_id, "2026-09-01");
        request.0.assignees = vec!["not-a-uuid".to_string()];
        let err = create_task(State(state.clone()), headers, request)
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn create_unknown_workspace_is_not_found() {
        let state = testing::state().await;
        let (user_id, _) = seed_workspace(&state).await;
        let headers = testing::login_headers(&state, &user_id);

        let err = create_task(
            State(state),
            headers,
            create_request("missing-workspace", "2026-09-01"),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn update_patches_only_present_fields() {
        let state = testing::state().await;
        let (user_id, workspace_id) = seed_workspace(&state).await;
        let headers = testing::login_headers(&state, &user_id);
        create_task(
            State(state.clone()),
            headers.clone(),
            create_request(&workspace_id, "2026-09-01"),
        )
        .await
        .map(|_| ())
        .unwrap();
        let task = db::list_tasks(&state.pool, &workspace_id).await.unwrap().remove(0);

        let body = update_task(
            State(state.clone()),
            headers.clone(),
            Json(UpdateTaskRequest {
                task_id: task.id.clone(),
                title: None,
                description: None,
                due_date: None,
                priority: None,
                status: Some(TaskStatus::InProgress),
                assignees: Some(vec![user_id.clone()]),
                tags: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(body.0.payload.status, TaskStatus::InProgress);
        assert_eq!(body.0.payload.title, "Design the lander");
        assert_eq!(body.0.payload.assignees, vec![user_id.clone()]);
        assert_eq!(body.0.payload.tags, vec!["engineering".to_string()]);

        let err = update_task(
            State(state),
            headers,
            Json(UpdateTaskRequest {
                task_id: task.id,
                title: None,
                description: None,
                due_date: Some("not-a-date".to_string()),
                priority: None,
                status: None,
                assignees: None,
                tags: None,
            }),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn delete_validates_id_format() {
        let state = testing::state().await;
        let (user_id, workspace_id) = seed_workspace(&state).await;
        let headers = testing::login_headers(&state, &user_id);

        let err = delete_task(
            State(state.clone()),
            headers.clone(),
            Json(DeleteTaskRequest {
                task_id: "not-a-uuid".to_string(),
            }),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = delete_task(
            State(state.clone()),
            headers.clone(),
            Json(DeleteTaskRequest {
                task_id: Uuid::new_v4().to_string(),
            }),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        create_task(
            State(state.clone()),
            headers.clone(),
            create_request(&workspace_id, "2026-09-01"),
        )
        .await
        .map(|_| ())
        .unwrap();
        let task = db::list_tasks(&state.pool, &workspace_id).await.unwrap().remove(0);
        delete_task(
            State(state),
            headers,
            Json(DeleteTaskRequest { task_id: task.id }),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn list_supports_print_bypass() {
        let state = testing::state().await;
        let (user_id, workspace_id) = seed_workspace(&state).await;
        let headers = testing::login_headers(&state, &user_id);
        create_task(
            State(state.clone()),
            headers,
            create_request(&workspace_id, "2026-09-01"),
        )
        .await
        .map(|_| ())
        .unwrap();

        let body = get_all_tasks(
            State(state.clone()),
            HeaderMap::new(),
            Query(TaskListQuery {
                workspace_id: workspace_id.clone(),
                print: true,
                secret: Some(state.config.print_secret.clone()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.0.payload["tasks"].as_array().unwrap().len(), 1);

        let err = get_all_tasks(
            State(state),
            HeaderMap::new(),
            Query(TaskListQuery {
                workspace_id,
                print: false,
                secret: None,
            }),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn detail_requires_accepted_membership() {
        let state = testing::state().await;
        let (user_id, workspace_id) = seed_workspace(&state).await;
        let headers = testing::login_headers(&state, &user_id);
        create_task(
            State(state.clone()),
            headers.clone(),
            create_request(&workspace_id, "2026-09-01"),
        )
        .await
        .map(|_| ())
        .unwrap();
        let task = db::list_tasks(&state.pool, &workspace_id).await.unwrap().remove(0);

        let body = detail_task(
            State(state.clone()),
            headers,
            Query(TaskDetailQuery {
                task_id: task.id.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.0.payload.description, "Weight budget and thrust profile");

        let outsider_id = testing::seed_user(&state, "Eve", "eve@example.com").await;
        let err = detail_task(
            State(state.clone()),
            testing::login_headers(&state, &outsider_id),
            Query(TaskDetailQuery { task_id: task.id }),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }
}
