use std::sync::Arc;

use axum::http::{header, HeaderMap};
use sqlx::sqlite::SqlitePoolOptions;

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::state::{AppState, ServerMetrics};

pub fn config() -> Config {
    Config {
        bind: "127.0.0.1:0".to_string(),
        db_url: "sqlite::memory:".to_string(),
        data_dir: std::env::temp_dir().display().to_string(),
        jwt_secret: "test-secret".to_string(),
        access_ttl_secs: 900,
        refresh_ttl_secs: 60 * 60 * 24,
        print_secret: "test-print-secret".to_string(),
        board_url: "http://localhost:3000".to_string(),
        chromium_bin: "chromium".to_string(),
        cookie_secure: false,
    }
}

/// Fresh app state over a single-connection in-memory database.
pub async fn state() -> AppState {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory database");
    db::init_db(&pool).await.expect("initialize schema");
    AppState {
        pool,
        config: config(),
        metrics: Arc::new(ServerMetrics::new()),
    }
}

pub async fn seed_user(state: &AppState, name: &str, email: &str) -> String {
    let hash = auth::hash_password("password123").expect("hash password");
    db::register_user(&state.pool, name, email, &hash)
        .await
        .expect("seed user")
        .id
}

pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().expect("header value"),
    );
    headers
}

pub fn login_headers(state: &AppState, user_id: &str) -> HeaderMap {
    let pair = auth::issue_tokens(user_id, &state.config).expect("issue tokens");
    bearer_headers(&pair.access_token)
}
