use anyhow::{Context, Result};

/// Default endpoint for the external optimizer, an OpenAI-compatible
/// chat-completions API.
const DEFAULT_OPTIMIZER_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OPTIMIZER_MODEL: &str = "gpt-4o";

/// Application configuration loaded from environment variables.
///
/// `OPTIMIZER_API_KEY` is deliberately optional: a missing key is not a
/// startup failure but a per-job "service unavailable" outcome, so the rest
/// of the API (status, download, preview) keeps working.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub optimizer_api_url: String,
    pub optimizer_api_key: Option<String>,
    pub optimizer_model: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            optimizer_api_url: std::env::var("OPTIMIZER_API_URL")
                .unwrap_or_else(|_| DEFAULT_OPTIMIZER_URL.to_string()),
            optimizer_api_key: std::env::var("OPTIMIZER_API_KEY").ok(),
            optimizer_model: std::env::var("OPTIMIZER_MODEL")
                .unwrap_or_else(|_| DEFAULT_OPTIMIZER_MODEL.to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
