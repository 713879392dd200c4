#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

pub const DEFAULT_OUTPUT_PATH: &str = "nova_poshta_regions";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.0;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 300;

/// 將秒數轉為 Duration；負數或非有限值視為 0
pub(crate) fn seconds(value: f64) -> std::time::Duration {
    std::time::Duration::try_from_secs_f64(value).unwrap_or_default()
}
