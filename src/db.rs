use crate::error::AppError;
use crate::models::{
    InviteMember, InviteSummary, MemberStatus, Notification, NotificationKind, NotificationView,
    Privilege, Reaction, Task, TeamMember, TeamMemberView, User, Workspace,
};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

pub async fn init_db(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create users table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS workspaces (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            creator_id TEXT NOT NULL REFERENCES users(id),
            created_at INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create workspaces table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_members (
            id TEXT PRIMARY KEY,
            user_id TEXT REFERENCES users(id),
            email TEXT NOT NULL,
            workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'pending',
            privilege TEXT NOT NULL DEFAULT 'user',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (workspace_id, email)
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create team_members table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create messages table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            from_user_id TEXT NOT NULL REFERENCES users(id),
            to_user_id TEXT REFERENCES users(id),
            to_email TEXT NOT NULL,
            workspace_id TEXT REFERENCES workspaces(id) ON DELETE CASCADE,
            message_id TEXT REFERENCES messages(id),
            kind TEXT NOT NULL,
            reaction TEXT NOT NULL DEFAULT 'pending',
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create notifications table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
            created_by TEXT NOT NULL REFERENCES users(id),
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            due_date TEXT NOT NULL,
            priority TEXT NOT NULL,
            status TEXT NOT NULL,
            assignees TEXT NOT NULL DEFAULT '[]',
            tags TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create tasks table: {}", e)))?;

    Ok(())
}

// Row mappers. Enum values read back from storage are trusted; a parse
// failure here means the database is corrupt, not that the request was bad.

fn map_user(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
    }
}

fn map_workspace(row: &SqliteRow) -> Workspace {
    Workspace {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        creator_id: row.get("creator_id"),
    }
}

fn map_member(row: &SqliteRow) -> Result<TeamMember, AppError> {
    let status: String = row.get("status");
    let privilege: String = row.get("privilege");
    Ok(TeamMember {
        id: row.get("id"),
        user_id: row.get("user_id"),
        email: row.get("email"),
        workspace_id: row.get("workspace_id"),
        status: MemberStatus::parse(&status)
            .map_err(|_| AppError::Internal(format!("corrupt member status: {}", status)))?,
        privilege: Privilege::parse(&privilege)
            .map_err(|_| AppError::Internal(format!("corrupt member privilege: {}", privilege)))?,
        updated_at: row.get("updated_at"),
    })
}

fn map_notification(row: &SqliteRow) -> Result<Notification, AppError> {
    let kind: String = row.get("kind");
    let reaction: String = row.get("reaction");
    Ok(Notification {
        id: row.get("id"),
        from_user_id: row.get("from_user_id"),
        to_user_id: row.get("to_user_id"),
        to_email: row.get("to_email"),
        workspace_id: row.get("workspace_id"),
        message_id: row.get("message_id"),
        kind: NotificationKind::parse(&kind)
            .map_err(|_| AppError::Internal(format!("corrupt notification type: {}", kind)))?,
        reaction: Reaction::parse(&reaction)
            .map_err(|_| AppError::Internal(format!("corrupt notification reaction: {}", reaction)))?,
        is_read: row.get::<i64, _>("is_read") != 0,
        created_at: row.get("created_at"),
    })
}

fn map_task(row: &SqliteRow) -> Result<Task, AppError> {
    let priority: String = row.get("priority");
    let status: String = row.get("status");
    let assignees: String = row.get("assignees");
    let tags: String = row.get("tags");
    Ok(Task {
        id: row.get("id"),
        workspace_id: row.get("workspace_id"),
        created_by: row.get("created_by"),
        title: row.get("title"),
        description: row.get("description"),
        due_date: row.get("due_date"),
        priority: crate::models::Priority::parse(&priority)
            .map_err(|_| AppError::Internal(format!("corrupt task priority: {}", priority)))?,
        status: crate::models::TaskStatus::parse(&status)
            .map_err(|_| AppError::Internal(format!("corrupt task status: {}", status)))?,
        assignees: serde_json::from_str(&assignees)
            .map_err(|e| AppError::Internal(format!("corrupt assignee list: {}", e)))?,
        tags: serde_json::from_str(&tags)
            .map_err(|e| AppError::Internal(format!("corrupt tag list: {}", e)))?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// Users.

/// Create the account and retroactively link any membership rows and
/// notifications that were addressed to this email before it registered.
pub async fn register_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    let user_id = Uuid::new_v4().to_string();
    let now = Utc::now().timestamp();

    let mut tx = begin(pool).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5);
        "#,
    )
    .bind(&user_id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .execute(&mut *tx)
    .await;

    if let Err(err) = result {
        let message = err.to_string();
        if message.contains("UNIQUE") {
            return Err(AppError::BadRequest("email already registered".to_string()));
        }
        return Err(AppError::Internal(format!("create user: {}", err)));
    }

    sqlx::query(
        r#"
        UPDATE team_members
        SET user_id = ?1, updated_at = ?2
        WHERE email = ?3 AND user_id IS NULL;
        "#,
    )
    .bind(&user_id)
    .bind(now)
    .bind(email)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("link memberships: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE notifications
        SET to_user_id = ?1, updated_at = ?2
        WHERE to_email = ?3 AND to_user_id IS NULL;
        "#,
    )
    .bind(&user_id)
    .bind(now)
    .bind(email)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("link notifications: {}", e)))?;

    commit(tx).await?;

    Ok(User {
        id: user_id,
        name: name.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
    })
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT id, name, email, password_hash
        FROM users
        WHERE email = ?1;
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("query user: {}", e)))?;

    Ok(row.map(|row| map_user(&row)))
}

pub async fn get_user_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<User>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT id, name, email, password_hash
        FROM users
        WHERE id = ?1;
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("query user by id: {}", e)))?;

    Ok(row.map(|row| map_user(&row)))
}

// Workspaces.

/// Create a workspace with its creator as an accepted admin member and,
/// optionally, an initial invite batch. One transaction for the whole fan-out.
pub async fn create_workspace(
    pool: &SqlitePool,
    creator: &User,
    name: &str,
    description: &str,
    team_members: &[InviteMember],
    message: Option<&str>,
) -> Result<(Workspace, InviteSummary), AppError> {
    let workspace_id = Uuid::new_v4().to_string();
    let now = Utc::now().timestamp();

    let mut tx = begin(pool).await?;

    sqlx::query(
        r#"
        INSERT INTO workspaces (id, name, description, creator_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5);
        "#,
    )
    .bind(&workspace_id)
    .bind(name)
    .bind(description)
    .bind(&creator.id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("create workspace: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO team_members (id, user_id, email, workspace_id, status, privilege, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, 'accepted', 'admin', ?5, ?5);
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&creator.id)
    .bind(&creator.email)
    .bind(&workspace_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("insert creator membership: {}", e)))?;

    let summary = invite_batch(&mut tx, &workspace_id, creator, team_members, message).await?;

    commit(tx).await?;

    Ok((
        Workspace {
            id: workspace_id,
            name: name.to_string(),
            description: description.to_string(),
            creator_id: creator.id.clone(),
        },
        summary,
    ))
}

pub async fn get_workspace(
    pool: &SqlitePool,
    workspace_id: &str,
) -> Result<Option<Workspace>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT id, name, description, creator_id
        FROM workspaces
        WHERE id = ?1;
        "#,
    )
    .bind(workspace_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("query workspace: {}", e)))?;

    Ok(row.map(|row| map_workspace(&row)))
}

/// Workspaces where the user is an accepted member, newest first.
pub async fn list_workspaces_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Workspace>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT w.id, w.name, w.description, w.creator_id
        FROM workspaces w
        JOIN team_members m
          ON w.id = m.workspace_id
        WHERE m.user_id = ?1 AND m.status = 'accepted'
        ORDER BY w.created_at DESC;
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Internal(format!("list workspaces: {}", e)))?;

    Ok(rows.iter().map(map_workspace).collect())
}

pub async fn update_workspace_name(
    pool: &SqlitePool,
    workspace_id: &str,
    name: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE workspaces SET name = ?1 WHERE id = ?2;
        "#,
    )
    .bind(name)
    .bind(workspace_id)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("update workspace name: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

// Membership ledger.

pub async fn is_admin(
    pool: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
) -> Result<bool, AppError> {
    let row = sqlx::query(
        r#"
        SELECT 1
        FROM team_members
        WHERE user_id = ?1 AND workspace_id = ?2 AND privilege = 'admin'
        LIMIT 1;
        "#,
    )
    .bind(user_id)
    .bind(workspace_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("check admin: {}", e)))?;

    Ok(row.is_some())
}

pub async fn is_accepted_member(
    pool: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
) -> Result<bool, AppError> {
    let row = sqlx::query(
        r#"
        SELECT 1
        FROM team_members
        WHERE user_id = ?1 AND workspace_id = ?2 AND status = 'accepted'
        LIMIT 1;
        "#,
    )
    .bind(user_id)
    .bind(workspace_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("check membership: {}", e)))?;

    Ok(row.is_some())
}

pub async fn get_member_by_email(
    pool: &SqlitePool,
    workspace_id: &str,
    email: &str,
) -> Result<Option<TeamMember>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, email, workspace_id, status, privilege, updated_at
        FROM team_members
        WHERE workspace_id = ?1 AND email = ?2;
        "#,
    )
    .bind(workspace_id)
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("query member: {}", e)))?;

    row.as_ref().map(map_member).transpose()
}

/// All membership rows of a workspace, joined with member display names.
pub async fn list_team_members(
    pool: &SqlitePool,
    workspace_id: &str,
) -> Result<Vec<TeamMemberView>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT m.id, m.user_id, m.email, m.workspace_id, m.status, m.privilege, m.updated_at,
               u.name AS member_name
        FROM team_members m
        LEFT JOIN users u ON u.id = m.user_id
        WHERE m.workspace_id = ?1
        ORDER BY m.created_at ASC;
        "#,
    )
    .bind(workspace_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Internal(format!("list team members: {}", e)))?;

    rows.iter()
        .map(|row| {
            let member = map_member(row)?;
            Ok(TeamMemberView {
                member_id: member.id,
                user_id: member.user_id,
                email: member.email,
                status: member.status,
                privilege: member.privilege,
                updated_at: member.updated_at,
                name: row.get("member_name"),
            })
        })
        .collect()
}

pub async fn change_privilege(
    pool: &SqlitePool,
    workspace_id: &str,
    email: &str,
    privilege: Privilege,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE team_members
        SET privilege = ?1, updated_at = ?2
        WHERE workspace_id = ?3 AND email = ?4;
        "#,
    )
    .bind(privilege.as_str())
    .bind(Utc::now().timestamp())
    .bind(workspace_id)
    .bind(email)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("change privilege: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

// Invitation workflow.

/// Invite a batch of emails into a workspace. The caller has already passed
/// the admin gate; the whole batch commits or rolls back together.
pub async fn invite_members(
    pool: &SqlitePool,
    workspace_id: &str,
    inviter: &User,
    team_members: &[InviteMember],
    message: Option<&str>,
) -> Result<InviteSummary, AppError> {
    let mut tx = begin(pool).await?;
    let summary = invite_batch(&mut tx, workspace_id, inviter, team_members, message).await?;
    commit(tx).await?;
    Ok(summary)
}

async fn invite_batch(
    tx: &mut Transaction<'_, Sqlite>,
    workspace_id: &str,
    inviter: &User,
    team_members: &[InviteMember],
    message: Option<&str>,
) -> Result<InviteSummary, AppError> {
    let now = Utc::now().timestamp();
    let mut summary = InviteSummary::default();

    let message_id = match message {
        Some(content) if !content.trim().is_empty() => {
            Some(insert_message(tx, content.trim()).await?)
        }
        _ => None,
    };

    for invitee in team_members {
        let email = invitee.email.trim().to_lowercase();
        if email.is_empty() || email == inviter.email {
            continue;
        }

        let existing = sqlx::query(
            r#"
            SELECT id, user_id, email, workspace_id, status, privilege, updated_at
            FROM team_members
            WHERE workspace_id = ?1 AND email = ?2;
            "#,
        )
        .bind(workspace_id)
        .bind(&email)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(format!("query member: {}", e)))?
        .as_ref()
        .map(map_member)
        .transpose()?;

        let to_user_id = resolve_user_id(tx, &email).await?;

        match existing {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO team_members (id, user_id, email, workspace_id, status, privilege, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?6);
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&to_user_id)
                .bind(&email)
                .bind(workspace_id)
                .bind(invitee.privilege.as_str())
                .bind(now)
                .execute(&mut **tx)
                .await
                .map_err(|e| AppError::Internal(format!("insert member: {}", e)))?;
                summary.new_invites.push(email.clone());
            }
            Some(member) if member.status == MemberStatus::Accepted => {
                summary.already_in_team.push(email.clone());
                continue;
            }
            Some(member) => {
                // Re-invitation: back to pending, and any invite still sitting
                // unanswered in the member's feed is superseded.
                sqlx::query(
                    r#"
                    UPDATE team_members
                    SET status = 'pending', privilege = ?1, updated_at = ?2
                    WHERE id = ?3;
                    "#,
                )
                .bind(invitee.privilege.as_str())
                .bind(now)
                .bind(&member.id)
                .execute(&mut **tx)
                .await
                .map_err(|e| AppError::Internal(format!("reset member: {}", e)))?;

                revoke_pending_requests(tx, workspace_id, &email, now).await?;
                summary.re_invited.push(email.clone());
            }
        }

        insert_notification(
            tx,
            &NewNotification {
                from_user_id: &inviter.id,
                to_user_id: to_user_id.as_deref(),
                to_email: &email,
                workspace_id: Some(workspace_id),
                message_id: message_id.as_deref(),
                kind: NotificationKind::Request,
                reaction: Reaction::Pending,
            },
            now,
        )
        .await?;
    }

    Ok(summary)
}

/// Remove an accepted (or invited) member and tell them about it: the
/// membership row goes away, every notification previously sent for this
/// workspace flips to revoked, and one fresh info notification carries a
/// generated message body.
pub async fn remove_member(
    pool: &SqlitePool,
    actor: &User,
    workspace: &Workspace,
    email: &str,
) -> Result<(), AppError> {
    let now = Utc::now().timestamp();
    let mut tx = begin(pool).await?;

    let member = sqlx::query(
        r#"
        SELECT id, user_id, email, workspace_id, status, privilege, updated_at
        FROM team_members
        WHERE workspace_id = ?1 AND email = ?2;
        "#,
    )
    .bind(&workspace.id)
    .bind(email)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("query member: {}", e)))?
    .as_ref()
    .map(map_member)
    .transpose()?
    .ok_or(AppError::NotFound)?;

    sqlx::query(
        r#"
        DELETE FROM team_members WHERE id = ?1;
        "#,
    )
    .bind(&member.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("delete member: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE notifications
        SET reaction = 'revoked', updated_at = ?1
        WHERE to_email = ?2 AND workspace_id = ?3;
        "#,
    )
    .bind(now)
    .bind(email)
    .bind(&workspace.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("revoke notifications: {}", e)))?;

    let content = format!("You have been removed from {}", workspace.name);
    let message_id = insert_message(&mut tx, &content).await?;

    insert_notification(
        &mut tx,
        &NewNotification {
            from_user_id: &actor.id,
            to_user_id: member.user_id.as_deref(),
            to_email: email,
            workspace_id: Some(&workspace.id),
            message_id: Some(&message_id),
            kind: NotificationKind::Info,
            reaction: Reaction::Revoked,
        },
        now,
    )
    .await?;

    commit(tx).await?;
    Ok(())
}

// Notification feed.

struct NewNotification<'a> {
    from_user_id: &'a str,
    to_user_id: Option<&'a str>,
    to_email: &'a str,
    workspace_id: Option<&'a str>,
    message_id: Option<&'a str>,
    kind: NotificationKind,
    reaction: Reaction,
}

async fn insert_notification(
    tx: &mut Transaction<'_, Sqlite>,
    notification: &NewNotification<'_>,
    now: i64,
) -> Result<String, AppError> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO notifications
            (id, from_user_id, to_user_id, to_email, workspace_id, message_id, kind, reaction, is_read, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9);
        "#,
    )
    .bind(&id)
    .bind(notification.from_user_id)
    .bind(notification.to_user_id)
    .bind(notification.to_email)
    .bind(notification.workspace_id)
    .bind(notification.message_id)
    .bind(notification.kind.as_str())
    .bind(notification.reaction.as_str())
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("insert notification: {}", e)))?;
    Ok(id)
}

async fn revoke_pending_requests(
    tx: &mut Transaction<'_, Sqlite>,
    workspace_id: &str,
    email: &str,
    now: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE notifications
        SET reaction = 'revoked', updated_at = ?1
        WHERE to_email = ?2 AND workspace_id = ?3 AND kind = 'request' AND reaction = 'pending';
        "#,
    )
    .bind(now)
    .bind(email)
    .bind(workspace_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("revoke pending requests: {}", e)))?;
    Ok(())
}

async fn insert_message(
    tx: &mut Transaction<'_, Sqlite>,
    content: &str,
) -> Result<String, AppError> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO messages (id, content) VALUES (?1, ?2);
        "#,
    )
    .bind(&id)
    .bind(content)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("insert message: {}", e)))?;
    Ok(id)
}

async fn resolve_user_id(
    tx: &mut Transaction<'_, Sqlite>,
    email: &str,
) -> Result<Option<String>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT id FROM users WHERE email = ?1;
        "#,
    )
    .bind(email)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("resolve user: {}", e)))?;
    Ok(row.map(|row| row.get("id")))
}

/// The caller's feed, newest first, joined with sender name, workspace name,
/// and the shared message body when present.
pub async fn list_notifications_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<NotificationView>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT n.id, n.from_user_id, n.to_user_id, n.to_email, n.workspace_id, n.message_id,
               n.kind, n.reaction, n.is_read, n.created_at,
               f.name AS sender_name, w.name AS workspace_name, msg.content AS message_content
        FROM notifications n
        JOIN users f ON f.id = n.from_user_id
        LEFT JOIN workspaces w ON w.id = n.workspace_id
        LEFT JOIN messages msg ON msg.id = n.message_id
        WHERE n.to_user_id = ?1
        ORDER BY n.created_at DESC;
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Internal(format!("list notifications: {}", e)))?;

    rows.iter()
        .map(|row| {
            let notification = map_notification(row)?;
            Ok(NotificationView {
                notification_id: notification.id,
                from_user: notification.from_user_id,
                to_user: notification.to_user_id,
                workspace_id: notification.workspace_id,
                workspace_name: row.get("workspace_name"),
                is_read: notification.is_read,
                name: row.get("sender_name"),
                message_content: row.get("message_content"),
                kind: notification.kind,
                reaction: notification.reaction,
                created_at: notification.created_at,
            })
        })
        .collect()
}

pub async fn mark_notification_read(
    pool: &SqlitePool,
    notification_id: &str,
    user_id: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET is_read = 1, updated_at = ?1
        WHERE id = ?2 AND to_user_id = ?3;
        "#,
    )
    .bind(Utc::now().timestamp())
    .bind(notification_id)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("mark notification read: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

/// Record the user's answer to a workspace invite: the notification's
/// reaction and the membership's status move together or not at all.
pub async fn respond_to_invite(
    pool: &SqlitePool,
    notification_id: &str,
    user: &User,
    reaction: Reaction,
) -> Result<(), AppError> {
    let now = Utc::now().timestamp();
    let mut tx = begin(pool).await?;

    let notification = sqlx::query(
        r#"
        SELECT id, from_user_id, to_user_id, to_email, workspace_id, message_id,
               kind, reaction, is_read, created_at
        FROM notifications
        WHERE id = ?1;
        "#,
    )
    .bind(notification_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("query notification: {}", e)))?
    .as_ref()
    .map(map_notification)
    .transpose()?
    .ok_or(AppError::NotFound)?;

    sqlx::query(
        r#"
        UPDATE notifications
        SET reaction = ?1, is_read = 1, updated_at = ?2
        WHERE id = ?3;
        "#,
    )
    .bind(reaction.as_str())
    .bind(now)
    .bind(notification_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("update notification: {}", e)))?;

    let workspace_id = notification.workspace_id.ok_or(AppError::NotFound)?;
    let status = match reaction {
        Reaction::Accepted => MemberStatus::Accepted,
        Reaction::Rejected => MemberStatus::Rejected,
        _ => return Err(AppError::BadRequest("invalid reaction".to_string())),
    };

    let result = sqlx::query(
        r#"
        UPDATE team_members
        SET status = ?1, updated_at = ?2
        WHERE workspace_id = ?3 AND user_id = ?4;
        "#,
    )
    .bind(status.as_str())
    .bind(now)
    .bind(&workspace_id)
    .bind(&user.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("update membership: {}", e)))?;

    if result.rows_affected() == 0 {
        // No membership row to mirror into; dropping the transaction
        // rolls the reaction write back.
        return Err(AppError::NotFound);
    }

    commit(tx).await?;
    Ok(())
}

// Task board.

pub async fn create_task(pool: &SqlitePool, task: &Task) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO tasks
            (id, workspace_id, created_by, title, description, due_date, priority, status, assignees, tags, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);
        "#,
    )
    .bind(&task.id)
    .bind(&task.workspace_id)
    .bind(&task.created_by)
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.due_date)
    .bind(task.priority.as_str())
    .bind(task.status.as_str())
    .bind(encode_list(&task.assignees)?)
    .bind(encode_list(&task.tags)?)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("create task: {}", e)))?;
    Ok(())
}

pub async fn get_task(pool: &SqlitePool, task_id: &str) -> Result<Option<Task>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT id, workspace_id, created_by, title, description, due_date, priority, status,
               assignees, tags, created_at, updated_at
        FROM tasks
        WHERE id = ?1;
        "#,
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("query task: {}", e)))?;

    row.as_ref().map(map_task).transpose()
}

pub async fn update_task(pool: &SqlitePool, task: &Task) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE tasks
        SET title = ?1, description = ?2, due_date = ?3, priority = ?4, status = ?5,
            assignees = ?6, tags = ?7, updated_at = ?8
        WHERE id = ?9;
        "#,
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.due_date)
    .bind(task.priority.as_str())
    .bind(task.status.as_str())
    .bind(encode_list(&task.assignees)?)
    .bind(encode_list(&task.tags)?)
    .bind(task.updated_at)
    .bind(&task.id)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("update task: {}", e)))?;
    Ok(())
}

pub async fn delete_task(pool: &SqlitePool, task_id: &str) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        DELETE FROM tasks WHERE id = ?1;
        "#,
    )
    .bind(task_id)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("delete task: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_tasks(pool: &SqlitePool, workspace_id: &str) -> Result<Vec<Task>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT id, workspace_id, created_by, title, description, due_date, priority, status,
               assignees, tags, created_at, updated_at
        FROM tasks
        WHERE workspace_id = ?1
        ORDER BY created_at ASC;
        "#,
    )
    .bind(workspace_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Internal(format!("list tasks: {}", e)))?;

    rows.iter().map(map_task).collect()
}

// Helpers.

fn encode_list(values: &[String]) -> Result<String, AppError> {
    serde_json::to_string(values).map_err(|e| AppError::Internal(format!("encode list: {}", e)))
}

async fn begin(pool: &SqlitePool) -> Result<Transaction<'_, Sqlite>, AppError> {
    pool.begin()
        .await
        .map_err(|e| AppError::Internal(format!("begin transaction: {}", e)))
}

async fn commit(tx: Transaction<'_, Sqlite>) -> Result<(), AppError> {
    tx.commit()
        .await
        .map_err(|e| AppError::Internal(format!("commit transaction: {}", e)))
}
