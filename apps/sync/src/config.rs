use anyhow::{Context, Result};

const DEFAULT_INTRANET_BASE_URL: &str = "https://intranet.hbtn.io";

/// Run configuration loaded from environment variables (and `.env` if
/// present). Constructed once in `main` and passed by reference; nothing
/// else reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub places_api_key: String,
    pub intranet_username: String,
    pub intranet_password: String,
    pub intranet_base_url: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            places_api_key: require_env("PLACES_API_KEY")?,
            intranet_username: require_env("INTRANET_USERNAME")?,
            intranet_password: require_env("INTRANET_PASSWORD")?,
            intranet_base_url: std::env::var("INTRANET_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_INTRANET_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
