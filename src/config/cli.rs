use crate::adapters::http::DEFAULT_API_ENDPOINT;
use crate::config::{
    seconds, DEFAULT_BACKOFF_FACTOR, DEFAULT_OUTPUT_PATH, DEFAULT_REQUEST_DELAY_MS,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::{ConfigProvider, FieldDefaults, RetryPolicy};
use crate::domain::model::DEFAULT_REGION_LABEL;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "novaposhta-etl")]
#[command(about = "Export the Nova Poshta settlement and branch catalog as one JSON file per region")]
pub struct CliConfig {
    #[arg(long, default_value = DEFAULT_API_ENDPOINT)]
    pub api_endpoint: String,

    #[arg(long, env = "NOVA_POSHTA_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output_path: String,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS, help = "Per-request timeout in seconds")]
    pub timeout_seconds: u64,

    #[arg(long, default_value_t = DEFAULT_RETRY_ATTEMPTS, help = "Attempts per settlement request, including the first")]
    pub retry_attempts: u32,

    #[arg(long, default_value_t = DEFAULT_BACKOFF_FACTOR, help = "Exponential backoff base in seconds")]
    pub backoff_factor: f64,

    #[arg(long, default_value_t = DEFAULT_REQUEST_DELAY_MS, help = "Pause after each settlement in milliseconds")]
    pub request_delay_ms: u64,

    #[arg(long, default_value = DEFAULT_REGION_LABEL)]
    pub fallback_region: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            backoff_factor: seconds(self.backoff_factor),
            ..RetryPolicy::default()
        }
    }

    fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    fn field_defaults(&self) -> FieldDefaults {
        FieldDefaults {
            region: self.fallback_region.clone(),
            ..FieldDefaults::default()
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api_endpoint", &self.api_endpoint)?;
        validation::validate_required("api_key", &self.api_key)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_range("timeout_seconds", self.timeout_seconds, 1, 300)?;
        validation::validate_range("retry_attempts", self.retry_attempts, 1, 10)?;
        validation::validate_backoff("backoff_factor", self.backoff_factor)?;
        validation::validate_non_empty_string("fallback_region", &self.fallback_region)?;
        Ok(())
    }
}
