//! Configuration System
//!
//! Layered configuration for storage, providers, pipelines, retries, the job queue and
//! logging, with environment variable overrides and validation that reports every problem at
//! once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::logging::LoggingConfig;
use crate::retry::RetryPolicy;

pub use crate::provider::ProviderConfig;
pub use crate::thumbnail::ThumbnailConfig;
pub use crate::tts::TtsConfig;
pub use crate::workflow::QueueConfig;

mod facade;
mod merge;
mod sources;
mod storage;

pub use facade::ConfigLoader;
pub use storage::{ObjectStoreConfig, StorageConfig};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LexicastConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    /// Generation backends by name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub tts: TtsConfig,

    #[serde(default)]
    pub thumbnail: ThumbnailConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Retry budgets for external calls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "RetryPolicy::provider")]
    pub provider: RetryPolicy,
    #[serde(default = "RetryPolicy::upload")]
    pub upload: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            provider: RetryPolicy::provider(),
            upload: RetryPolicy::upload(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Provider(String, String),
    Storage(String),
    Tts(String),
    Thumbnail(String),
    Retry(String),
    Queue(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(name, msg) => write!(f, "Provider '{}': {}", name, msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Tts(msg) => write!(f, "TTS: {}", msg),
            ValidationError::Thumbnail(msg) => write!(f, "Thumbnail: {}", msg),
            ValidationError::Retry(msg) => write!(f, "Retry: {}", msg),
            ValidationError::Queue(msg) => write!(f, "Queue: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl LexicastConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let mut names: Vec<&String> = self.providers.keys().collect();
        names.sort();
        for name in names {
            for msg in self.providers[name].validate() {
                errors.push(ValidationError::Provider(name.clone(), msg));
            }
        }

        if self.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Storage("data_dir cannot be empty".to_string()));
        }
        if let Err(e) = self.storage.objects.validate() {
            errors.push(ValidationError::Storage(e));
        }

        let tts = &self.tts;
        if tts.batch_size == 0 {
            errors.push(ValidationError::Tts("batch_size must be at least 1".to_string()));
        }
        if tts.hard_cap == 0 {
            errors.push(ValidationError::Tts("hard_cap must be at least 1".to_string()));
        }
        if tts.max_budget_usd.is_some_and(|b| b < 0.0) {
            errors.push(ValidationError::Tts("max_budget_usd cannot be negative".to_string()));
        }
        let prices = [tts.prices.openai, tts.prices.google, tts.prices.kokoro];
        if prices.iter().any(|p| *p < 0.0) {
            errors.push(ValidationError::Tts("prices cannot be negative".to_string()));
        }

        let thumbnail = &self.thumbnail;
        if !is_http_url(&thumbnail.app_base_url) {
            errors.push(ValidationError::Thumbnail(format!(
                "app_base_url must be an http(s) URL, got '{}'",
                thumbnail.app_base_url
            )));
        }
        if thumbnail.selector.trim().is_empty() {
            errors.push(ValidationError::Thumbnail("selector cannot be empty".to_string()));
        }
        if thumbnail.timeout_ms == 0 {
            errors.push(ValidationError::Thumbnail("timeout_ms must be positive".to_string()));
        }

        for (name, policy) in [("provider", &self.retry.provider), ("upload", &self.retry.upload)] {
            if policy.max_attempts == 0 {
                errors.push(ValidationError::Retry(format!(
                    "{name}.max_attempts must be at least 1"
                )));
            }
            if policy.base_delay_ms > policy.max_delay_ms {
                errors.push(ValidationError::Retry(format!(
                    "{name}.base_delay_ms exceeds max_delay_ms"
                )));
            }
            if policy.attempt_timeout_ms == 0 {
                errors.push(ValidationError::Retry(format!(
                    "{name}.attempt_timeout_ms must be positive"
                )));
            }
        }

        let queue = &self.queue;
        if queue.workers == 0 || queue.max_concurrent == 0 || queue.max_queue_size == 0 {
            errors.push(ValidationError::Queue(
                "workers, max_concurrent and max_queue_size must be at least 1".to_string(),
            ));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Join validation errors into one message.
pub fn describe_errors(errors: &[ValidationError]) -> String {
    let lines: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!("Configuration validation failed:\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Serializes tests that touch process environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            let saved = vars
                .iter()
                .map(|(name, value)| {
                    let old = std::env::var(name).ok();
                    std::env::set_var(name, value);
                    (*name, old)
                })
                .collect();
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, old) in &self.saved {
                match old {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = LexicastConfig::default();
        assert!(config.providers.is_empty());
        assert_eq!(config.storage.data_dir, PathBuf::from(".lexicast/db"));
        assert_eq!(config.retry.provider.max_attempts, 5);
        assert_eq!(config.retry.upload.max_attempts, 3);
        assert_eq!(config.tts.batch_size, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut config = LexicastConfig::default();
        config.providers.insert(
            "google".to_string(),
            ProviderConfig::Google {
                api_key: String::new(),
                endpoint: Some("ftp://nope".to_string()),
            },
        );
        config.tts.batch_size = 0;
        config.queue.workers = 0;
        config.thumbnail.app_base_url = "localhost".to_string();
        config.logging.format = "xml".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&ValidationError::Tts("batch_size must be at least 1".to_string())));
        let message = describe_errors(&errors);
        assert!(message.contains("Provider 'google': api_key must not be empty"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("lexicast.toml");
        std::fs::write(
            &config_file,
            r#"
[storage]
data_dir = "/var/lib/lexicast"

[storage.objects]
type = "http"
public_base_url = "https://cdn.example.com"
upload_url = "https://upload.example.com"

[providers.openai]
type = "openai"
api_key = "sk-test"

[providers.shots]
type = "headless_render"
url = "http://localhost:4000"

[tts]
target_size = 1200
max_budget_usd = 2.5

[retry.provider]
base_delay_ms = 10
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&config_file).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/lexicast"));
        assert!(matches!(config.storage.objects, ObjectStoreConfig::Http { .. }));
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.tts.target_size, 1200);
        assert_eq!(config.tts.batch_size, 4);
        assert_eq!(config.tts.max_budget_usd, Some(2.5));
        assert_eq!(config.retry.provider.base_delay_ms, 10);
        assert_eq!(config.retry.provider.max_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_workspace_layers_and_environment_override() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = TempDir::new().unwrap();
        let workspace_root = temp_dir.path().join("workspace");
        let config_dir = workspace_root.join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            "[tts]\nbatch_size = 6\ntarget_size = 900\n\n[queue]\nworkers = 3\n",
        )
        .unwrap();
        std::fs::write(config_dir.join("staging.toml"), "[tts]\nbatch_size = 2\n").unwrap();

        let xdg = temp_dir.path().join("xdg");
        std::fs::create_dir_all(xdg.join("lexicast")).unwrap();
        std::fs::write(
            xdg.join("lexicast").join("config.toml"),
            "[thumbnail]\nselector = \"#root\"\n\n[queue]\nworkers = 9\n",
        )
        .unwrap();
        let xdg_str = xdg.to_string_lossy().to_string();

        let _env = EnvGuard::set(&[
            ("XDG_CONFIG_HOME", xdg_str.as_str()),
            ("LEXICAST_ENV", "staging"),
            ("LEXICAST__QUEUE__MAX_CONCURRENT", "7"),
        ]);

        assert_eq!(
            ConfigLoader::global_config_path(),
            Some(xdg.join("lexicast").join("config.toml"))
        );
        let config = ConfigLoader::load(&workspace_root).unwrap();
        // global file
        assert_eq!(config.thumbnail.selector, "#root");
        // workspace file overrides global
        assert_eq!(config.queue.workers, 3);
        assert_eq!(config.tts.target_size, 900);
        // env-specific file overrides base
        assert_eq!(config.tts.batch_size, 2);
        // environment overrides files
        assert_eq!(config.queue.max_concurrent, 7);
    }
}
