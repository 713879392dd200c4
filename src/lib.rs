pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{http::NovaPoshtaClient, storage::LocalStorage};
pub use core::{etl::EtlEngine, pipeline::RegionPipeline};
pub use domain::model::{EnrichedSettlement, RunSummary, ServicePoint, Settlement};
pub use utils::error::{EtlError, Result};
