//! Configuration loader and validation tests

use mlc_application::cache::OrchestratorConfig;
use mlc_application::invalidation::InvalidationConfig;
use mlc_infrastructure::config::{ConfigBuilder, ConfigLoader, LoggingConfig, validate_app_config};
use mlc_infrastructure::constants::DEFAULT_LOG_LEVEL;
use mlc_providers::distributed::BackendTarget;
use mlc_providers::{DistributedConfig, NamespaceConfig};
use tempfile::TempDir;

/// Prefix no test environment sets, so env overrides never leak in
const ISOLATED_PREFIX: &str = "MLC_CONFIG_TESTS_UNSET";

fn loader() -> ConfigLoader {
    ConfigLoader::new().with_env_prefix(ISOLATED_PREFIX)
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = loader()
        .with_config_path(temp_dir.path().join("absent.toml"))
        .load()
        .unwrap();

    assert_eq!(config.logging.level, DEFAULT_LOG_LEVEL);
    assert_eq!(config.invalidation, InvalidationConfig::default());
    assert_eq!(config.distributed.fallback, BackendTarget::Memory);
}

#[test]
fn test_config_save_load() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("mlc.toml");

    let original = ConfigBuilder::new()
        .with_namespace("prices", NamespaceConfig::default().with_max_entries(200).with_ttl_secs(30))
        .with_distributed(DistributedConfig {
            namespace: "defi".to_string(),
            ..DistributedConfig::in_memory()
        })
        .with_invalidation(InvalidationConfig {
            batch_window_ms: 250,
            ..InvalidationConfig::default()
        })
        .build();

    loader().save_to_file(&original, &config_path).unwrap();
    let loaded = loader().with_config_path(&config_path).load().unwrap();

    assert_eq!(loaded, original);
    assert_eq!(loaded.local.namespace_config("prices").max_entries, 200);
    assert_eq!(loaded.distributed.primary, BackendTarget::Memory);
}

#[test]
fn test_partial_file_keeps_remaining_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("mlc.toml");
    std::fs::write(
        &config_path,
        r#"
[logging]
level = "debug"

[distributed]
namespace = "defi"
primary = { kind = "redis", url = "redis://cache:6379" }
"#,
    )
    .unwrap();

    let config = loader().with_config_path(&config_path).load().unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.distributed.namespace, "defi");
    assert_eq!(
        config.distributed.primary,
        BackendTarget::Redis {
            url: "redis://cache:6379".to_string()
        }
    );
    assert_eq!(config.orchestrator, OrchestratorConfig::default());
}

#[test]
fn test_invalid_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("mlc.toml");
    std::fs::write(&config_path, "[invalidation]\nmax_queue_size = 0\n").unwrap();

    let err = loader().with_config_path(&config_path).load().unwrap_err();
    assert!(err.to_string().contains("max queue size"));
}

#[test]
fn test_config_builder() {
    let config = ConfigBuilder::new()
        .with_logging(LoggingConfig {
            level: "warn".to_string(),
            json_format: true,
            file_output: None,
        })
        .with_orchestrator(OrchestratorConfig {
            warmup_concurrency: 4,
            ..OrchestratorConfig::default()
        })
        .build();

    assert!(config.logging.json_format);
    assert_eq!(config.orchestrator.warmup_concurrency, 4);
    assert!(validate_app_config(&config).is_ok());
}

#[test]
fn test_validation_rejects_bad_values() {
    let bad_level = ConfigBuilder::new()
        .with_logging(LoggingConfig {
            level: "verbose".to_string(),
            ..LoggingConfig::default()
        })
        .build();
    assert!(validate_app_config(&bad_level).is_err());

    let empty_namespace = ConfigBuilder::new()
        .with_namespace("prices", NamespaceConfig::default().with_max_entries(0))
        .build();
    assert!(validate_app_config(&empty_namespace).is_err());

    let bad_url = ConfigBuilder::new()
        .with_distributed(DistributedConfig {
            primary: BackendTarget::Redis {
                url: "http://cache:6379".to_string(),
            },
            ..DistributedConfig::default()
        })
        .build();
    assert!(validate_app_config(&bad_url).is_err());

    let bad_threshold = ConfigBuilder::new()
        .with_orchestrator(OrchestratorConfig {
            refresh_ahead_threshold: 1.5,
            ..OrchestratorConfig::default()
        })
        .build();
    assert!(validate_app_config(&bad_threshold).is_err());
}
