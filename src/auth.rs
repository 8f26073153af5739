use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::http::HeaderMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use password_hash::SaltString;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

// Clock skew tolerated when checking token expiry.
const LEEWAY_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Expired tokens are reported separately so callers can prompt
/// re-authentication instead of rejecting outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("hash password: {}", e)))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("parse password hash: {}", e)))?;
    let argon2 = Argon2::default();
    Ok(argon2.verify_password(password.as_bytes(), &parsed).is_ok())
}

pub fn issue_tokens(user_id: &str, config: &Config) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
        access_token: sign_token(user_id, TokenType::Access, config.access_ttl_secs, config)?,
        refresh_token: sign_token(user_id, TokenType::Refresh, config.refresh_ttl_secs, config)?,
    })
}

fn sign_token(
    user_id: &str,
    token_type: TokenType,
    ttl_secs: i64,
    config: &Config,
) -> Result<String, AppError> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        token_type: token_type.as_str().to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("encode token: {}", e)))
}

/// Verify a token's signature, expiry, and type tag, returning the subject.
pub fn verify_token(
    token: &str,
    expected: TokenType,
    config: &Config,
) -> Result<String, TokenError> {
    let mut validation = Validation::default();
    validation.leeway = LEEWAY_SECS;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?;
    if data.claims.token_type != expected.as_str() {
        return Err(TokenError::Invalid);
    }
    Ok(data.claims.sub)
}

/// Resolve the caller of a protected request from its bearer access token.
///
/// Expired and malformed tokens both answer `Unauthorized`; a token whose
/// subject no longer exists answers `NotFound`.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = extract_bearer(headers).ok_or_else(|| {
        state.metrics.inc_auth_failures();
        AppError::Unauthorized
    })?;
    let user_id = verify_token(&token, TokenType::Access, &state.config).map_err(|err| {
        state.metrics.inc_auth_failures();
        tracing::debug!("access token rejected: {:?}", err);
        AppError::Unauthorized
    })?;
    let user = db::get_user_by_id(&state.pool, &user_id).await?;
    user.ok_or(AppError::NotFound)
}

/// Exact-equality check for the headless renderer's shared secret.
pub fn print_bypass(config: &Config, print: bool, secret: Option<&str>) -> bool {
    print && secret == Some(config.print_secret.as_str())
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}
