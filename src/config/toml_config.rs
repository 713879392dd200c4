use crate::adapters::http::DEFAULT_API_ENDPOINT;
use crate::config::{
    seconds, DEFAULT_BACKOFF_FACTOR, DEFAULT_OUTPUT_PATH, DEFAULT_REQUEST_DELAY_MS,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::{ConfigProvider, FieldDefaults, RetryPolicy};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: Option<PipelineInfo>,
    pub source: SourceConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub api_key: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub backoff_factor_seconds: f64,
    pub max_backoff_seconds: Option<u64>,
    pub status_forcelist: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff_factor_seconds: DEFAULT_BACKOFF_FACTOR,
            max_backoff_seconds: None,
            status_forcelist: RetryPolicy::DEFAULT_STATUSES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub delay_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_REQUEST_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: DEFAULT_OUTPUT_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub region: Option<String>,
    pub settlement_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub verbose: Option<bool>,
}

fn default_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${NOVA_POSHTA_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        validation::validate_required("source.api_key", &self.source.api_key)?;
        if env_var_pattern().is_match(&self.source.api_key) {
            return Err(EtlError::InvalidConfigValueError {
                field: "source.api_key".to_string(),
                value: self.source.api_key.clone(),
                reason: "Referenced environment variable is not set".to_string(),
            });
        }
        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_range("source.timeout_seconds", timeout, 1, 300)?;
        }

        validation::validate_range("retry.attempts", self.retry.attempts, 1, 10)?;
        validation::validate_backoff("retry.backoff_factor_seconds", self.retry.backoff_factor_seconds)?;
        for status in &self.retry.status_forcelist {
            validation::validate_range("retry.status_forcelist", *status, 100, 599)?;
        }

        validation::validate_path("load.output_path", &self.load.output_path)?;

        if let Some(region) = &self.defaults.region {
            validation::validate_non_empty_string("defaults.region", region)?;
        }

        Ok(())
    }

    pub fn verbose(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.verbose)
            .unwrap_or(false)
    }

    pub fn pipeline_name(&self) -> &str {
        self.pipeline
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("novaposhta-etl")
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.source.endpoint
    }

    fn api_key(&self) -> &str {
        &self.source.api_key
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.retry.attempts,
            backoff_factor: seconds(self.retry.backoff_factor_seconds),
            max_backoff: self
                .retry
                .max_backoff_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_backoff),
            retry_statuses: self.retry.status_forcelist.clone(),
        }
    }

    fn request_delay(&self) -> Duration {
        Duration::from_millis(self.throttle.delay_ms)
    }

    fn field_defaults(&self) -> FieldDefaults {
        let mut defaults = FieldDefaults::default();
        if let Some(region) = &self.defaults.region {
            defaults.region = region.clone();
        }
        if let Some(name) = &self.defaults.settlement_name {
            defaults.settlement_name = name.clone();
        }
        defaults
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
