use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Response, StatusCode};
use tokio::process::Command;
use urlencoding::encode;
use uuid::Uuid;

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::models::ExportQuery;
use crate::state::AppState;

/// Render a workspace board to PDF. The headless browser loads the board's
/// print-mode URL, which carries the shared secret that lets the renderer
/// read the board without a bearer token.
pub async fn export_pdf(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ExportQuery>,
) -> Result<Response<Body>, AppError> {
    auth::authenticate(&state, &headers).await?;
    let workspace = db::get_workspace(&state.pool, &query.workspace_id)
        .await?
        .ok_or(AppError::NotFound)?;

    state.metrics.inc_export_requests();

    let url = print_url(&state.config, &workspace.id);
    let output_path = scratch_path(&state.config);
    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::Internal(format!("create export dir: {}", e)))?;
    }

    let output = Command::new(&state.config.chromium_bin)
        .arg("--headless")
        .arg("--disable-gpu")
        .arg("--no-pdf-header-footer")
        .arg(format!("--print-to-pdf={}", output_path.display()))
        .arg(&url)
        .output()
        .await
        .map_err(|e| {
            state.metrics.inc_export_failures();
            AppError::Internal(format!("spawn renderer: {}", e))
        })?;

    if !output.status.success() {
        state.metrics.inc_export_failures();
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Internal(format!(
            "renderer exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let bytes = tokio::fs::read(&output_path).await.map_err(|e| {
        state.metrics.inc_export_failures();
        AppError::Internal(format!("read rendered pdf: {}", e))
    })?;
    let _ = tokio::fs::remove_file(&output_path).await;

    tracing::info!(workspace_id = %workspace.id, bytes = bytes.len(), "board exported");

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/pdf")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"workspace-{}.pdf\"", workspace.id),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(format!("build response: {}", e)))
}

fn print_url(config: &Config, workspace_id: &str) -> String {
    format!(
        "{}/workspace/{}?print=true&secret={}",
        config.board_url.trim_end_matches('/'),
        workspace_id,
        encode(&config.print_secret)
    )
}

fn scratch_path(config: &Config) -> PathBuf {
    PathBuf::from(&config.data_dir)
        .join("exports")
        .join(format!("{}.pdf", Uuid::new_v4()))
}
