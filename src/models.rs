use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub payload: T,
}

pub fn ok<T: Serialize>(message: &str, payload: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.to_string(),
        payload,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    Admin,
    User,
}

impl Privilege {
    pub fn as_str(self) -> &'static str {
        match self {
            Privilege::Admin => "admin",
            Privilege::User => "user",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "admin" => Ok(Privilege::Admin),
            "user" => Ok(Privilege::User),
            other => Err(AppError::BadRequest(format!("invalid privilege: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Pending,
    Accepted,
    Rejected,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Pending => "pending",
            MemberStatus::Accepted => "accepted",
            MemberStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "pending" => Ok(MemberStatus::Pending),
            "accepted" => Ok(MemberStatus::Accepted),
            "rejected" => Ok(MemberStatus::Rejected),
            other => Err(AppError::BadRequest(format!("invalid status: {}", other))),
        }
    }
}

/// Outcome field on a notification, mirrored from the related membership's
/// status; `revoked` marks superseded or withdrawn invitations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Pending,
    Accepted,
    Rejected,
    Revoked,
}

impl Reaction {
    pub fn as_str(self) -> &'static str {
        match self {
            Reaction::Pending => "pending",
            Reaction::Accepted => "accepted",
            Reaction::Rejected => "rejected",
            Reaction::Revoked => "revoked",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "pending" => Ok(Reaction::Pending),
            "accepted" => Ok(Reaction::Accepted),
            "rejected" => Ok(Reaction::Rejected),
            "revoked" => Ok(Reaction::Revoked),
            other => Err(AppError::BadRequest(format!("invalid reaction: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Request,
    Info,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Request => "request",
            NotificationKind::Info => "info",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "request" => Ok(NotificationKind::Request),
            "info" => Ok(NotificationKind::Info),
            other => Err(AppError::BadRequest(format!(
                "invalid notification type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(AppError::BadRequest(format!("invalid priority: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    InReview,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::InReview => "in_review",
            TaskStatus::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "blocked" => Ok(TaskStatus::Blocked),
            "in_review" => Ok(TaskStatus::InReview),
            "done" => Ok(TaskStatus::Done),
            other => Err(AppError::BadRequest(format!("invalid task status: {}", other))),
        }
    }
}

// Database records.

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub description: String,
    pub creator_id: String,
}

#[derive(Debug, Clone)]
pub struct TeamMember {
    pub id: String,
    pub user_id: Option<String>,
    pub email: String,
    pub workspace_id: String,
    pub status: MemberStatus,
    pub privilege: Privilege,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: Option<String>,
    #[allow(dead_code)]
    pub to_email: String,
    pub workspace_id: Option<String>,
    #[allow(dead_code)]
    pub message_id: Option<String>,
    pub kind: NotificationKind,
    pub reaction: Reaction,
    pub is_read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub workspace_id: String,
    pub created_by: String,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub assignees: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

// Request bodies. Field names mirror the public API.

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct WorkspaceIdRequest {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteMember {
    pub email: String,
    pub privilege: Privilege,
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub team_members: Vec<InviteMember>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWorkspaceNameRequest {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteTeamMemberRequest {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    pub team_members: Vec<InviteMember>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMemberRequest {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePrivilegeRequest {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    pub email: String,
    pub privilege: Privilege,
}

#[derive(Debug, Deserialize)]
pub struct MarkNotificationReadRequest {
    #[serde(rename = "notificationId")]
    pub notification_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteResponseRequest {
    #[serde(rename = "notificationId")]
    pub notification_id: String,
    pub reaction: Reaction,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "dueDate")]
    pub due_date: String,
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub task_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "dueDate")]
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub assignees: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTaskRequest {
    #[serde(rename = "taskId")]
    pub task_id: String,
}

/// Query parameters shared by the board-read endpoints that the headless
/// renderer is allowed to hit without a bearer token.
#[derive(Debug, Default, Deserialize)]
pub struct PrintQuery {
    #[serde(default)]
    pub print: bool,
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    #[serde(default)]
    pub print: bool,
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskDetailQuery {
    #[serde(rename = "taskId")]
    pub task_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
}

// Response views.

#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkspaceView {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    pub name: String,
    pub description: String,
    pub creator: String,
}

impl From<&Workspace> for WorkspaceView {
    fn from(workspace: &Workspace) -> Self {
        Self {
            workspace_id: workspace.id.clone(),
            name: workspace.name.clone(),
            description: workspace.description.clone(),
            creator: workspace.creator_id.clone(),
        }
    }
}

/// Membership row joined with the member's display name, when resolved.
#[derive(Debug, Serialize)]
pub struct TeamMemberView {
    pub member_id: String,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub email: String,
    pub status: MemberStatus,
    pub privilege: Privilege,
    pub updated_at: i64,
    pub name: Option<String>,
}

/// Notification joined with sender name, workspace name, and message body.
#[derive(Debug, Serialize)]
pub struct NotificationView {
    pub notification_id: String,
    #[serde(rename = "fromUser")]
    pub from_user: String,
    #[serde(rename = "toUser")]
    pub to_user: Option<String>,
    #[serde(rename = "workspaceId")]
    pub workspace_id: Option<String>,
    pub workspace_name: Option<String>,
    pub is_read: bool,
    pub name: Option<String>,
    pub message_content: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub reaction: Reaction,
    pub created_at: i64,
}

/// Board-column shape: everything the card needs, nothing more.
#[derive(Debug, Serialize)]
pub struct TaskSummaryView {
    pub task_id: String,
    pub title: String,
    pub due_date: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub assignees: Vec<String>,
    pub tags: Vec<String>,
}

impl From<&Task> for TaskSummaryView {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            due_date: task.due_date.clone(),
            priority: task.priority,
            status: task.status,
            assignees: task.assignees.clone(),
            tags: task.tags.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskDetailView {
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub assignees: Vec<String>,
    pub tags: Vec<String>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&Task> for TaskDetailView {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date.clone(),
            priority: task.priority,
            status: task.status,
            assignees: task.assignees.clone(),
            tags: task.tags.clone(),
            created_by: task.created_by.clone(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Categorized outcome of an invite batch.
#[derive(Debug, Default, Serialize)]
pub struct InviteSummary {
    pub already_in_team: Vec<String>,
    pub re_invited: Vec<String>,
    pub new_invites: Vec<String>,
}
