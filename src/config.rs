use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind: String,
    pub db_url: String,
    pub data_dir: String,
    pub jwt_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub print_secret: String,
    pub board_url: String,
    pub chromium_bin: String,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let bind = env::var("KANFLOW_BIND").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
        let db_url =
            env::var("KANFLOW_DB_URL").unwrap_or_else(|_| "sqlite://data/kanflow.db".to_string());
        let data_dir = env::var("KANFLOW_DATA_DIR").unwrap_or_else(|_| "data".to_string());
        let jwt_secret =
            env::var("KANFLOW_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string());
        let access_ttl_secs = parse_secs("KANFLOW_ACCESS_TTL_SECS", 900);
        let refresh_ttl_secs = parse_secs("KANFLOW_REFRESH_TTL_SECS", 60 * 60 * 24 * 7);
        let print_secret =
            env::var("KANFLOW_PRINT_SECRET").unwrap_or_else(|_| "dev-print-secret".to_string());
        let board_url =
            env::var("KANFLOW_BOARD_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let chromium_bin =
            env::var("KANFLOW_CHROMIUM_BIN").unwrap_or_else(|_| "chromium".to_string());
        let cookie_secure = env::var("KANFLOW_COOKIE_SECURE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            bind,
            db_url,
            data_dir,
            jwt_secret,
            access_ttl_secs,
            refresh_ttl_secs,
            print_secret,
            board_url,
            chromium_bin,
            cookie_secure,
        }
    }
}

fn parse_secs(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
