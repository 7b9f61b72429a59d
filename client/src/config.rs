use common::verdict::{VerdictPolicy, DEFAULT_AVERAGE_THRESHOLD};
use directories::ProjectDirs;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub timeout_secs: u64,
    pub auth_scheme: String,
    pub session_path: PathBuf,
    pub verdict_policy: VerdictPolicy,
    pub news_api_url: String,
    pub news_api_key: Option<String>,
    pub log_level: String,
}

/// `session.json` in the platform data directory, or under the working
/// directory when no home directory can be determined
pub fn default_session_path() -> PathBuf {
    ProjectDirs::from("app", "imreal", "imreal")
        .map(|dirs| dirs.data_dir().join("session.json"))
        .unwrap_or_else(|| PathBuf::from(".imreal").join("session.json"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url = env::var("IMREAL_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        reqwest::Url::parse(&api_url)
            .map_err(|e| anyhow::anyhow!("Invalid IMREAL_API_URL {}: {}", api_url, e))?;

        let timeout_secs: u64 = env::var("IMREAL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()?;
        if timeout_secs == 0 {
            anyhow::bail!("IMREAL_TIMEOUT_SECS must be greater than zero");
        }

        let threshold: f64 = env::var("IMREAL_AVG_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_AVERAGE_THRESHOLD.to_string())
            .parse()?;
        let verdict_policy = VerdictPolicy::from_name(
            &env::var("IMREAL_VERDICT_POLICY").unwrap_or_else(|_| "any-face".to_string()),
            threshold,
        )?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout_secs,
            auth_scheme: env::var("IMREAL_AUTH_SCHEME").unwrap_or_else(|_| "Token".to_string()),
            session_path: env::var("IMREAL_SESSION_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_session_path()),
            verdict_policy,
            news_api_url: env::var("NEWS_API_URL")
                .unwrap_or_else(|_| "https://newsapi.org/v2".to_string()),
            news_api_key: env::var("NEWS_API_KEY").ok().filter(|key| !key.is_empty()),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}
