mod auth;
mod config;
mod db;
mod error;
mod export;
mod models;
mod notifications;
mod routes;
mod state;
mod tasks;
mod team;
#[cfg(test)]
mod testing;
mod workspaces;

use std::str::FromStr;
use std::sync::Arc;

use axum::http::{HeaderName, Request};
use axum::routing::{get, post};
use axum::Router;
use config::Config;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use state::AppState;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    if config.jwt_secret == "dev-secret-change-me" {
        if cfg!(debug_assertions) {
            tracing::warn!(
                "KANFLOW_JWT_SECRET is using the default value; do not use this in production."
            );
        } else {
            return Err("KANFLOW_JWT_SECRET must be set for production".into());
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    std::fs::create_dir_all(&config.data_dir)?;

    let connect_options = SqliteConnectOptions::from_str(&config.db_url)
        .map_err(|_| "invalid KANFLOW_DB_URL")?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;
    db::init_db(&pool).await?;

    let bind_addr = config.bind.parse().map_err(|_| "invalid KANFLOW_BIND")?;

    let state = AppState {
        pool,
        config,
        metrics: Arc::new(state::ServerMetrics::new()),
    };

    let trace_layer = TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
        let request_id = req
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "http",
            method = %req.method(),
            uri = %req.uri(),
            request_id = %request_id
        )
    });

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .route("/api/user/register", post(routes::register))
        .route("/api/user/login", post(routes::login))
        .route("/api/user/refresh", post(routes::refresh))
        .route("/api/user/logout", post(routes::logout))
        .route("/api/user/me", get(routes::me))
        .route("/api/user/check_if_admin", post(routes::check_if_admin))
        .route(
            "/api/workspace/create_workspace",
            post(workspaces::create_workspace),
        )
        .route("/api/workspace/get_workspace", post(workspaces::get_workspace))
        .route(
            "/api/workspace/get_all_workspaces",
            get(workspaces::get_all_workspaces),
        )
        .route(
            "/api/workspace/update_workspace_name",
            post(workspaces::update_workspace_name),
        )
        .route(
            "/api/workspace/invite_team_member",
            post(workspaces::invite_team_member),
        )
        .route(
            "/api/team_members/all_team_members",
            post(team::all_team_members),
        )
        .route("/api/team_members/remove_member", post(team::remove_member))
        .route(
            "/api/team_members/change_privilege",
            post(team::change_privilege),
        )
        .route(
            "/api/notifications/get_all_notfications",
            get(notifications::get_all_notifications),
        )
        .route(
            "/api/notifications/mark_notification_read",
            post(notifications::mark_notification_read),
        )
        .route(
            "/api/notifications/accept_reject_workspace_invite",
            post(notifications::accept_reject_workspace_invite),
        )
        .route("/api/tasks/create_task", post(tasks::create_task))
        .route("/api/tasks/update_task", post(tasks::update_task))
        .route("/api/tasks/delete_task", post(tasks::delete_task))
        .route("/api/tasks/get_all_tasks", get(tasks::get_all_tasks))
        .route("/api/tasks/detail_task", get(tasks::detail_task))
        .route("/api/tasks/export-pdf", get(export::export_pdf))
        .with_state(state)
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .layer(trace_layer);
    tracing::info!("Kanflow API listening on {}", bind_addr);
    axum::Server::bind(&bind_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
