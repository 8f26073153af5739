use axum::extract::{Json, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{AppendHeaders, IntoResponse};
use serde_json::{json, Value};

use crate::auth::{self, TokenType};
use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::models::{ok, ApiResponse, LoginRequest, RegisterRequest, UserView, WorkspaceIdRequest};
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.metrics.snapshot()))
}

type CookieResponse = (
    AppendHeaders<[(HeaderName, String); 1]>,
    Json<ApiResponse<Value>>,
);

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<CookieResponse, AppError> {
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    let password = payload.password.trim().to_string();
    if name.is_empty() || email.is_empty() || !email.contains('@') || password.len() < 6 {
        return Err(AppError::BadRequest(
            "invalid name, email, or password".to_string(),
        ));
    }

    let hash = auth::hash_password(&password)?;
    let user = db::register_user(&state.pool, &name, &email, &hash).await?;
    let tokens = auth::issue_tokens(&user.id, &state.config)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            refresh_cookie(&state.config, &tokens.refresh_token),
        )]),
        ok(
            "Registration successful",
            json!({ "access_token": tokens.access_token }),
        ),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<CookieResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    let password = payload.password.trim().to_string();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("invalid email or password".to_string()));
    }

    let user = db::find_user_by_email(&state.pool, &email)
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !auth::verify_password(&password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let tokens = auth::issue_tokens(&user.id, &state.config)?;
    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            refresh_cookie(&state.config, &tokens.refresh_token),
        )]),
        ok(
            "Login successful",
            json!({ "access_token": tokens.access_token }),
        ),
    ))
}

pub async fn logout() -> CookieResponse {
    (
        AppendHeaders([(header::SET_COOKIE, clear_cookie())]),
        ok("Logout successful", json!({})),
    )
}

/// Rotate the token pair off the http-only refresh cookie.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<CookieResponse, AppError> {
    let token = cookie_value(&headers, "refresh_token")
        .ok_or_else(|| AppError::BadRequest("refresh token missing".to_string()))?;
    let user_id = verify_refresh(&state, &token)?;
    let tokens = auth::issue_tokens(&user_id, &state.config)?;

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            refresh_cookie(&state.config, &tokens.refresh_token),
        )]),
        ok(
            "Refreshing token",
            json!({ "access_token": tokens.access_token }),
        ),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<UserView>>, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    Ok(ok("User data found", UserView::from(&user)))
}

pub async fn check_if_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WorkspaceIdRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let user = auth::authenticate(&state, &headers).await?;
    let admin = db::is_admin(&state.pool, &user.id, &payload.workspace_id).await?;
    Ok(ok("Success response admin/user", json!({ "admin": admin })))
}

fn verify_refresh(state: &AppState, token: &str) -> Result<String, AppError> {
    auth::verify_token(token, TokenType::Refresh, &state.config).map_err(|err| {
        state.metrics.inc_auth_failures();
        tracing::debug!("refresh token rejected: {:?}", err);
        AppError::Unauthorized
    })
}

fn refresh_cookie(config: &Config, token: &str) -> String {
    let mut cookie = format!(
        "refresh_token={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, config.refresh_ttl_secs
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_cookie() -> String {
    "refresh_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0".to_string()
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn register_request(name: &str, email: &str) -> Json<RegisterRequest> {
        Json(RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
        })
    }

    #[tokio::test]
    async fn register_sets_refresh_cookie() {
        let state = testing::state().await;
        let (headers, body) = register(State(state), register_request("Ada", "ada@example.com"))
            .await
            .unwrap();
        assert!(body.0.success);
        assert!(body.0.payload["access_token"].is_string());

        let AppendHeaders([(name, cookie)]) = headers;
        assert_eq!(name, header::SET_COOKIE);
        assert!(cookie.starts_with("refresh_token="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let state = testing::state().await;
        register(State(state.clone()), register_request("Ada", "ada@example.com"))
            .await
            .unwrap();
        let err = register(State(state), register_request("Imposter", "ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let state = testing::state().await;
        let err = register(
            State(state),
            Json(RegisterRequest {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password: "short".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn login_round_trip() {
        let state = testing::state().await;
        register(State(state.clone()), register_request("Ada", "ada@example.com"))
            .await
            .unwrap();

        let (_, body) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "Ada@Example.com".to_string(),
                password: "password123".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(body.0.success);

        let err = login(
            State(state),
            Json(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "wrong-password".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn refresh_rotates_tokens() {
        let state = testing::state().await;
        let user_id = testing::seed_user(&state, "Ada", "ada@example.com").await;
        let pair = auth::issue_tokens(&user_id, &state.config).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("refresh_token={}", pair.refresh_token).parse().unwrap(),
        );
        let (_, body) = refresh(State(state.clone()), headers).await.unwrap();
        assert!(body.0.payload["access_token"].is_string());

        // Missing cookie is a validation failure, not an auth failure.
        let err = refresh(State(state.clone()), HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        // An access token is not accepted in the refresh slot.
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("refresh_token={}", pair.access_token).parse().unwrap(),
        );
        let err = refresh(State(state), headers).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let (headers, body) = logout().await;
        assert!(body.0.success);
        let AppendHeaders([(_, cookie)]) = headers;
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn me_returns_current_user() {
        let state = testing::state().await;
        let user_id = testing::seed_user(&state, "Ada", "ada@example.com").await;
        let headers = testing::login_headers(&state, &user_id);

        let body = me(State(state), headers).await.unwrap();
        assert_eq!(body.0.payload.email, "ada@example.com");
        assert_eq!(body.0.payload.user_id, user_id);
    }

    #[tokio::test]
    async fn check_if_admin_reflects_privilege() {
        let state = testing::state().await;
        let user_id = testing::seed_user(&state, "Ada", "ada@example.com").await;
        let user = db::get_user_by_id(&state.pool, &user_id).await.unwrap().unwrap();
        let (workspace, _) =
            db::create_workspace(&state.pool, &user, "Apollo", "moonshot", &[], None)
                .await
                .unwrap();

        let headers = testing::login_headers(&state, &user_id);
        let body = check_if_admin(
            State(state.clone()),
            headers,
            Json(WorkspaceIdRequest {
                workspace_id: workspace.id.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.0.payload["admin"], true);

        let other_id = testing::seed_user(&state, "Bob", "bob@example.com").await;
        let headers = testing::login_headers(&state, &other_id);
        let body = check_if_admin(
            State(state),
            headers,
            Json(WorkspaceIdRequest {
                workspace_id: workspace.id,
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.0.payload["admin"], false);
    }
}
