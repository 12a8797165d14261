use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::llm::gemini::GeminiSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid listen address '{0}'")]
    ListenAddress(String),

    #[error("{0} must start with http:// or https://")]
    BaseUrl(&'static str),

    #[error("Temperature must be between 0.0 and 2.0, got {0}")]
    Temperature(f32),
}

/// Zonify urban-planning API server.
#[derive(Debug, Clone, Parser)]
#[command(name = "zonify-server", version, about)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "ZONIFY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "ZONIFY_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Gemini API key. Without one every chat reply degrades to the offline reply.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.5-flash")]
    pub gemini_model: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = "https://generativelanguage.googleapis.com")]
    pub gemini_base_url: String,

    /// Sampling temperature for every model call
    #[arg(long, env = "ZONIFY_TEMPERATURE", default_value_t = 0.7)]
    pub temperature: f32,

    /// Google Maps key for the nearby-places lookup. Lookup is skipped when unset.
    #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
    pub maps_api_key: Option<String>,

    #[arg(long, env = "PLACES_BASE_URL", default_value = "https://maps.googleapis.com")]
    pub places_base_url: String,

    /// Directory saved PDF reports are written to and served from
    #[arg(long, env = "ZONIFY_REPORTS_DIR", default_value = "public/reports")]
    pub reports_dir: PathBuf,

    /// Timeout for model and places calls, in seconds
    #[arg(long, env = "ZONIFY_UPSTREAM_TIMEOUT", default_value_t = 60)]
    pub upstream_timeout_secs: u64,

    /// Maximum request body size in MiB (reports arrive base64-encoded)
    #[arg(long, env = "ZONIFY_MAX_BODY_MB", default_value_t = 25)]
    pub max_body_mb: usize,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        check_base_url("gemini-base-url", &self.gemini_base_url)?;
        check_base_url("places-base-url", &self.places_base_url)?;
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Temperature(self.temperature));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::ListenAddress(format!("{}:{}", self.host, self.port)))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb.saturating_mul(1024 * 1024)
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_model.clone(),
            base_url: self.gemini_base_url.clone(),
            temperature: self.temperature,
            timeout: self.upstream_timeout(),
        }
    }

    /// Maps key if the places lookup should run.
    pub fn places_key(&self) -> Option<&str> {
        self.maps_api_key.as_deref().filter(|k| !k.is_empty())
    }
}

fn check_base_url(name: &'static str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::BaseUrl(name))
    }
}
