use crate::domain::model::{
    FieldDefaults, Record, RetryPolicy, RunSummary, Settlement, TransformResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    /// Writes `data` under the storage root, creating missing directories and
    /// replacing any existing file.
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Location shown to the user for a stored path.
    fn display_path(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn api_key(&self) -> &str;
    fn output_path(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn retry_policy(&self) -> RetryPolicy;
    /// Pause after each settlement to stay under the provider's rate limit.
    fn request_delay(&self) -> Duration;
    fn field_defaults(&self) -> FieldDefaults;
}

/// The two remote calls the pipeline needs.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// `Address/getCities`, single request, no retries.
    async fn fetch_all_settlements(&self) -> Result<Vec<Record>>;
    /// `AddressGeneral/getWarehouses` for one settlement reference.
    async fn fetch_service_points(&self, settlement_ref: &str) -> Result<Vec<Record>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Settlement>>;
    async fn transform(&self, settlements: Vec<Settlement>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<RunSummary>;
}
