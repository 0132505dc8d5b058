use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "ClaimDesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_VISION_MODEL: &str = "llama3.2-vision";
/// Vision calls on multi-page scans are slow on CPU-only machines.
pub const DEFAULT_OLLAMA_TIMEOUT_SECS: u64 = 300;

const DATA_DIR_ENV: &str = "CLAIMDESK_DATA_DIR";
const OLLAMA_URL_ENV: &str = "CLAIMDESK_OLLAMA_URL";
const VISION_MODEL_ENV: &str = "CLAIMDESK_VISION_MODEL";
const OLLAMA_TIMEOUT_ENV: &str = "CLAIMDESK_OLLAMA_TIMEOUT_SECS";

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "claimdesk=debug,claimdesk_lib=debug,warn"
    } else {
        "claimdesk=info,claimdesk_lib=info,warn"
    }
}

/// Get the application data directory.
///
/// `CLAIMDESK_DATA_DIR` when set, else `~/ClaimDesk/`. Falls back to the
/// working directory when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = env_value(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the claims database.
pub fn database_path() -> PathBuf {
    app_data_dir().join("claims.db")
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Settings for the Ollama vision extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    pub ollama_url: String,
    pub vision_model: String,
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            timeout_secs: DEFAULT_OLLAMA_TIMEOUT_SECS,
        }
    }
}

impl ExtractorConfig {
    /// Defaults overridden by `CLAIMDESK_*` environment variables.
    /// An unparseable timeout keeps the default.
    pub fn from_env() -> Self {
        Self::from_lookup(env_value)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let timeout_secs = match lookup(OLLAMA_TIMEOUT_ENV) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Ignoring invalid {OLLAMA_TIMEOUT_ENV}");
                defaults.timeout_secs
            }),
            None => defaults.timeout_secs,
        };

        Self {
            ollama_url: lookup(OLLAMA_URL_ENV).unwrap_or(defaults.ollama_url),
            vision_model: lookup(VISION_MODEL_ENV).unwrap_or(defaults.vision_model),
            timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_ends_with_app_name_by_default() {
        if std::env::var(DATA_DIR_ENV).is_err() {
            assert!(app_data_dir().ends_with(APP_NAME));
        }
    }

    #[test]
    fn database_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("claims.db"));
    }

    #[test]
    fn app_name_is_claimdesk() {
        assert_eq!(APP_NAME, "ClaimDesk");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }

    #[test]
    fn extractor_config_defaults() {
        let config = ExtractorConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ExtractorConfig::default());
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn extractor_config_reads_overrides() {
        let config = ExtractorConfig::from_lookup(lookup(&[
            ("CLAIMDESK_OLLAMA_URL", "http://127.0.0.1:9999"),
            ("CLAIMDESK_VISION_MODEL", "llava:13b"),
            ("CLAIMDESK_OLLAMA_TIMEOUT_SECS", "45"),
        ]));
        assert_eq!(config.ollama_url, "http://127.0.0.1:9999");
        assert_eq!(config.vision_model, "llava:13b");
        assert_eq!(config.timeout_secs, 45);
    }

    #[test]
    fn invalid_timeout_keeps_default() {
        let config = ExtractorConfig::from_lookup(lookup(&[("CLAIMDESK_OLLAMA_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.timeout_secs, DEFAULT_OLLAMA_TIMEOUT_SECS);
    }

    #[test]
    fn log_filter_names_both_targets() {
        let filter = default_log_filter();
        assert!(filter.contains("claimdesk_lib="));
        assert!(filter.contains("claimdesk="));
    }
}
