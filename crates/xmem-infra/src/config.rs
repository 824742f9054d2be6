//! Global configuration loader for xmem.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`GlobalConfig`]. Falls back to defaults when the file is missing or
//! malformed.

use std::path::Path;

use secrecy::SecretString;

use xmem_types::config::GlobalConfig;

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Read a credential from the environment variable named in config.
///
/// An empty variable name or an unset/empty variable yields `None`.
pub fn secret_from_env(var: &str) -> Option<SecretString> {
    if var.is_empty() {
        return None;
    }
    std::env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use xmem_types::config::RetrievalStrategy;

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.vector.provider, "none");
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[vector]
provider = "memory"

[retrieval]
strategy = "delegated"
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.vector.provider, "memory");
        assert_eq!(config.retrieval.strategy, RetrievalStrategy::Delegated);
        assert_eq!(config.embedding.cache_ttl_secs, 300);
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not [valid toml")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.retrieval.max_top_k, 100);
    }

    #[test]
    fn secret_from_env_ignores_empty_names() {
        assert!(secret_from_env("").is_none());
        assert!(secret_from_env("XMEM_TEST_SURELY_UNSET_VARIABLE").is_none());
    }
}
