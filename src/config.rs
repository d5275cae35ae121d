//! Service configuration

use serde::{Deserialize, Serialize};

use crate::mandi::{AlertKind, PriceAlert};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub mandi: MandiConfig,
    #[serde(default)]
    pub schemes: SchemesConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// True unless the environment is explicitly "production"
    pub fn is_development(&self) -> bool {
        self.server.environment != "production"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Deployment environment ("development" or "production")
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            environment: default_environment(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Upload limits for crop images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Accepted MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Largest image the detector will analyze
    #[serde(default = "default_max_image_size")]
    pub max_image_size: usize,

    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Simulated feature-extraction time
    #[serde(default = "default_analysis_delay")]
    pub analysis_delay_ms: u64,

    /// Simulated preprocessing time
    #[serde(default = "default_preprocess_delay")]
    pub preprocess_delay_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_image_size: default_max_image_size(),
            confidence_threshold: default_confidence_threshold(),
            analysis_delay_ms: default_analysis_delay(),
            preprocess_delay_ms: default_preprocess_delay(),
        }
    }
}

/// Mandi price aggregation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MandiConfig {
    /// Interval between scheduled aggregation runs
    #[serde(default = "default_mandi_interval")]
    pub update_interval_secs: u64,

    /// Lower bound of simulated source latency
    #[serde(default = "default_min_latency")]
    pub min_latency_ms: u64,

    /// Upper bound of simulated source latency
    #[serde(default = "default_max_latency")]
    pub max_latency_ms: u64,

    /// Per-source fetch timeout
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,

    /// Price alert subscriptions evaluated after each run
    #[serde(default = "default_alerts")]
    pub alerts: Vec<PriceAlert>,
}

impl Default for MandiConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_mandi_interval(),
            min_latency_ms: default_min_latency(),
            max_latency_ms: default_max_latency(),
            fetch_timeout_ms: default_fetch_timeout(),
            alerts: default_alerts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemesConfig {
    #[serde(default = "default_schemes_interval")]
    pub update_interval_secs: u64,

    /// Simulated delay of the scheme refresh
    #[serde(default = "default_schemes_fetch_delay")]
    pub fetch_delay_ms: u64,

    /// Seed the built-in scheme catalogue at startup
    #[serde(default = "default_true")]
    pub seed_defaults: bool,
}

impl Default for SchemesConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_schemes_interval(),
            fetch_delay_ms: default_schemes_fetch_delay(),
            seed_defaults: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret for session tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_expiry_secs: default_token_expiry(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

pub const DEV_JWT_SECRET: &str = "dev-mode-secret-not-for-production-use-123456";

// Defaults
fn default_http_port() -> u16 { 3000 }
fn default_environment() -> String { "development".to_string() }
fn default_cors_origins() -> Vec<String> { vec!["http://localhost:3000".to_string()] }
fn default_max_file_size() -> usize { 10 * 1024 * 1024 } // 10MB
fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/webp".to_string(),
    ]
}
fn default_max_image_size() -> usize { 5 * 1024 * 1024 } // 5MB
fn default_confidence_threshold() -> f64 { 0.7 }
fn default_analysis_delay() -> u64 { 1500 }
fn default_preprocess_delay() -> u64 { 500 }
fn default_mandi_interval() -> u64 { 60 * 60 }
fn default_min_latency() -> u64 { 1000 }
fn default_max_latency() -> u64 { 3000 }
fn default_fetch_timeout() -> u64 { 10_000 }
fn default_schemes_interval() -> u64 { 24 * 60 * 60 }
fn default_schemes_fetch_delay() -> u64 { 2000 }
fn default_jwt_secret() -> String { DEV_JWT_SECRET.to_string() }
fn default_token_expiry() -> u64 { 7 * 24 * 60 * 60 }
fn default_true() -> bool { true }

fn default_alerts() -> Vec<PriceAlert> {
    vec![
        PriceAlert {
            user_id: "user_001".to_string(),
            crop: "Wheat".to_string(),
            state: Some("Punjab".to_string()),
            market: None,
            kind: AlertKind::PriceIncrease { percentage: 10.0 },
        },
        PriceAlert {
            user_id: "user_002".to_string(),
            crop: "Tomato".to_string(),
            state: None,
            market: None,
            kind: AlertKind::Threshold { threshold: 1200.0 },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_limits() {
        let config = Config::default();

        assert_eq!(config.server.http_port, 3000);
        assert_eq!(config.upload.max_file_size, 10_485_760);
        assert_eq!(config.detection.max_image_size, 5_242_880);
        assert_eq!(config.mandi.update_interval_secs, 3600);
        assert_eq!(config.mandi.alerts.len(), 2);
        assert!(config.scheduler.enabled);
        assert!(config.is_development());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[server]
http_port = 8081
environment = "production"

[mandi]
update_interval_secs = 60
"#,
        )
        .unwrap();

        assert_eq!(config.server.http_port, 8081);
        assert!(!config.is_development());
        assert_eq!(config.mandi.update_interval_secs, 60);
        assert_eq!(config.mandi.fetch_timeout_ms, 10_000);
        assert_eq!(config.schemes.update_interval_secs, 86_400);
    }
}
