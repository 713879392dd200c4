use crate::core::{
    CatalogApi, ConfigProvider, EnrichedSettlement, Pipeline, RegionGroup, RunSummary,
    ServicePoint, Settlement, Storage, TransformResult,
};
use crate::utils::error::{EtlError, Result};
use serde::Serialize;
use std::collections::HashSet;

/// Fetches the settlement catalog, enriches every settlement with its
/// service points and writes one JSON file per region.
pub struct RegionPipeline<S: Storage, A: CatalogApi, C: ConfigProvider> {
    storage: S,
    api: A,
    config: C,
}

impl<S: Storage, A: CatalogApi, C: ConfigProvider> RegionPipeline<S, A, C> {
    pub fn new(storage: S, api: A, config: C) -> Self {
        Self {
            storage,
            api,
            config,
        }
    }

    /// Service points of one settlement. Failures are logged and yield an
    /// empty list; `None` marks the lookup as failed.
    async fn service_points_for(&self, settlement: &Settlement) -> Option<Vec<ServicePoint>> {
        if settlement.reference.is_empty() {
            tracing::warn!(
                "Settlement '{}' has no reference, skipping service point lookup",
                settlement.name
            );
            return None;
        }

        match self.api.fetch_service_points(&settlement.reference).await {
            Ok(records) => Some(records.iter().map(ServicePoint::from_record).collect()),
            Err(EtlError::Timeout(_)) => {
                tracing::warn!(
                    "Service point request for settlement {} timed out",
                    settlement.reference
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch service points for settlement {}: {}",
                    settlement.reference,
                    e
                );
                None
            }
        }
    }
}

/// File name for a region: the literal name plus `.json`, with path
/// separators replaced so the file stays inside the output directory.
pub fn region_file_name(region: &str) -> String {
    format!("{}.json", file_stem(region))
}

fn file_stem(region: &str) -> String {
    region
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect()
}

/// Like [`region_file_name`], but never hands out a name already in `used`.
/// Regions that only differ in replaced separators get a ` (2)`, ` (3)`, ...
/// suffix in the order they are written.
fn unique_file_name(region: &str, used: &mut HashSet<String>) -> String {
    let name = region_file_name(region);
    if used.insert(name.clone()) {
        return name;
    }

    let stem = file_stem(region);
    let mut n = 2;
    loop {
        let candidate = format!("{} ({}).json", stem, n);
        if used.insert(candidate.clone()) {
            tracing::warn!(
                "Region '{}' collides with another region on '{}', writing '{}' instead",
                region,
                name,
                candidate
            );
            return candidate;
        }
        n += 1;
    }
}

/// Pretty JSON with four-space indentation; non-ASCII text is kept as is.
pub fn render_region(group: &RegionGroup) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    group.settlements.serialize(&mut serializer)?;
    Ok(buf)
}

#[async_trait::async_trait]
impl<S: Storage, A: CatalogApi, C: ConfigProvider> Pipeline for RegionPipeline<S, A, C> {
    async fn extract(&self) -> Result<Vec<Settlement>> {
        tracing::info!("Requesting settlement catalog from {}", self.config.api_endpoint());

        let records = match self.api.fetch_all_settlements().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("Failed to fetch settlement catalog: {}", e);
                return Ok(Vec::new());
            }
        };

        let defaults = self.config.field_defaults();
        let settlements: Vec<Settlement> = records
            .iter()
            .map(|record| Settlement::from_record(record, &defaults))
            .collect();

        tracing::info!("Received {} settlements", settlements.len());
        Ok(settlements)
    }

    async fn transform(&self, settlements: Vec<Settlement>) -> Result<TransformResult> {
        let total = settlements.len();
        let delay = self.config.request_delay();
        let mut result = TransformResult::default();

        for (index, settlement) in settlements.into_iter().enumerate() {
            tracing::info!(
                "[{}/{}] Processing: {} ({})",
                index + 1,
                total,
                settlement.name,
                settlement.region
            );

            let warehouses = match self.service_points_for(&settlement).await {
                Some(points) => points,
                None => {
                    result.failed_lookups.push(settlement.reference.clone());
                    Vec::new()
                }
            };
            tracing::debug!(
                "{} service points for {}",
                warehouses.len(),
                settlement.reference
            );

            result
                .groups
                .insert(EnrichedSettlement::new(settlement, warehouses));

            // 節流：避免觸發供應商的速率限制
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<RunSummary> {
        let mut summary = RunSummary {
            settlements: result.groups.settlement_count(),
            service_points: result.service_point_count(),
            regions: result.groups.len(),
            ..RunSummary::default()
        };

        let mut used = HashSet::new();
        for group in result.groups.iter() {
            let file_name = unique_file_name(&group.region, &mut used);
            let data = render_region(group)?;
            self.storage.write_file(&file_name, &data).await?;

            let shown = self.storage.display_path(&file_name);
            tracing::info!("Saved: {}", shown);
            summary.written_files.push(shown);
        }

        summary.failed_lookups = result.failed_lookups;
        Ok(summary)
    }
}
