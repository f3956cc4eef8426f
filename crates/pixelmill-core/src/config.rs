//! Configuration module
//!
//! Everything is read from the environment once at startup; the resulting
//! `Config` is the only state shared between in-flight requests.

use std::env;

const DEFAULT_PORT: u16 = 8787;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub max_upload_bytes: usize,
    pub max_concurrent_jobs: usize,
    pub job_timeout_secs: u64,
    /// Explicit TTF path for text rendering; system font paths are probed
    /// when unset.
    pub font_path: Option<String>,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let server_port = parse_env("PORT", DEFAULT_PORT)?;
        let max_upload_bytes = parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let max_concurrent_jobs = parse_env("MAX_CONCURRENT_JOBS", default_parallelism())?;
        let job_timeout_secs = parse_env("JOB_TIMEOUT_SECS", DEFAULT_JOB_TIMEOUT_SECS)?;
        let font_path = env::var("FONT_PATH").ok().filter(|p| !p.is_empty());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        if max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be greater than zero");
        }
        if max_concurrent_jobs == 0 {
            anyhow::bail!("MAX_CONCURRENT_JOBS must be greater than zero");
        }

        Ok(Self {
            server_port,
            max_upload_bytes,
            max_concurrent_jobs,
            job_timeout_secs,
            font_path,
            environment,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_concurrent_jobs: default_parallelism(),
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            font_path: None,
            environment: "development".to_string(),
        }
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}
