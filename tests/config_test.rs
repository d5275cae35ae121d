//! Config loading and defaults integration tests

use crop_support::config::{Config, DEV_JWT_SECRET};
use crop_support::mandi::AlertKind;

/// An empty file yields the built-in defaults.
#[test]
fn test_default_config_values() {
    let config: Config = toml::from_str("").expect("valid TOML");

    assert_eq!(config.server.http_port, 3000);
    assert_eq!(config.server.environment, "development");
    assert!(config.is_development());
    assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
    assert_eq!(config.detection.max_image_size, 5 * 1024 * 1024);
    assert_eq!(config.mandi.update_interval_secs, 3600);
    assert_eq!(config.mandi.fetch_timeout_ms, 10_000);
    assert_eq!(config.schemes.update_interval_secs, 86_400);
    assert!(config.schemes.seed_defaults);
    assert_eq!(config.auth.jwt_secret, DEV_JWT_SECRET);
    assert!(config.scheduler.enabled);
    assert_eq!(config.mandi.alerts.len(), 2);
}

#[test]
fn test_config_with_all_fields() {
    let toml_str = r#"
[server]
http_port = 8080
environment = "production"
cors_origins = ["https://kisan.example.org"]

[upload]
max_file_size = 2097152
allowed_types = ["image/png"]

[detection]
max_image_size = 1048576
confidence_threshold = 0.8
analysis_delay_ms = 0
preprocess_delay_ms = 0

[mandi]
update_interval_secs = 900
min_latency_ms = 10
max_latency_ms = 20
fetch_timeout_ms = 500

[[mandi.alerts]]
user_id = "user_777"
crop = "Onion"
market = "Lasalgaon"
alert_type = "price_decrease"
percentage = 15.0

[schemes]
update_interval_secs = 3600
fetch_delay_ms = 0
seed_defaults = false

[auth]
jwt_secret = "a-production-secret-that-is-long-enough"
token_expiry_secs = 3600

[scheduler]
enabled = false
"#;

    let config: Config = toml::from_str(toml_str).expect("valid TOML");

    assert_eq!(config.server.http_port, 8080);
    assert!(!config.is_development());
    assert_eq!(config.server.cors_origins, vec!["https://kisan.example.org"]);
    assert_eq!(config.upload.allowed_types, vec!["image/png"]);
    assert_eq!(config.detection.analysis_delay_ms, 0);
    assert_eq!(config.mandi.max_latency_ms, 20);
    assert!(!config.schemes.seed_defaults);
    assert_eq!(config.auth.token_expiry_secs, 3600);
    assert!(!config.scheduler.enabled);

    assert_eq!(config.mandi.alerts.len(), 1);
    let alert = &config.mandi.alerts[0];
    assert_eq!(alert.crop, "Onion");
    assert_eq!(alert.market.as_deref(), Some("Lasalgaon"));
    assert!(alert.state.is_none());
    assert!(matches!(alert.kind, AlertKind::PriceDecrease { percentage } if percentage == 15.0));
}

/// Sections left out of the file keep their defaults.
#[test]
fn test_partial_config_keeps_defaults() {
    let toml_str = r#"
[server]
http_port = 4000

[mandi]
fetch_timeout_ms = 2500
"#;

    let config: Config = toml::from_str(toml_str).expect("valid TOML");

    assert_eq!(config.server.http_port, 4000);
    assert_eq!(config.server.environment, "development");
    assert_eq!(config.mandi.fetch_timeout_ms, 2500);
    assert_eq!(config.mandi.update_interval_secs, 3600);
    assert_eq!(config.detection.analysis_delay_ms, 1500);
    assert_eq!(config.mandi.alerts.len(), 2);
}

#[test]
fn test_unknown_alert_type_rejected() {
    let toml_str = r#"
[[mandi.alerts]]
user_id = "user_1"
crop = "Wheat"
alert_type = "sideways"
"#;

    assert!(toml::from_str::<Config>(toml_str).is_err());
}
