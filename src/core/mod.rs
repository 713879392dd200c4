pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{
    EnrichedSettlement, FieldDefaults, Record, RegionGroup, RegionGroups, RetryPolicy,
    RunSummary, ServicePoint, Settlement, TransformResult,
};
pub use crate::domain::ports::{CatalogApi, ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
