use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Base LaTeX resume every tailoring cycle starts from.
    pub template_path: PathBuf,
    /// Directory receiving the `.tex` / `.pdf` artifact pairs.
    pub output_dir: PathBuf,
    pub latex_command: String,
    pub compile_timeout_secs: u64,
    /// Sessions untouched for this long are dropped from memory.
    pub session_idle_ttl_secs: u64,
    pub session_sweep_interval_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            template_path: env_or("TEMPLATE_PATH", "data/templates/resume.tex").into(),
            output_dir: env_or("OUTPUT_DIR", "output").into(),
            latex_command: env_or("LATEX_COMMAND", "pdflatex"),
            compile_timeout_secs: env_or("COMPILE_TIMEOUT_SECS", "120")
                .parse::<u64>()
                .context("COMPILE_TIMEOUT_SECS must be a whole number of seconds")?,
            session_idle_ttl_secs: env_or("SESSION_IDLE_TTL_SECS", "86400")
                .parse::<u64>()
                .context("SESSION_IDLE_TTL_SECS must be a whole number of seconds")?,
            session_sweep_interval_secs: env_or("SESSION_SWEEP_INTERVAL_SECS", "300")
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .context("SESSION_SWEEP_INTERVAL_SECS must be a positive number of seconds")?,
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
