use crate::core::{Pipeline, RunSummary};
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Runs extract, transform and load once, in that order. An empty catalog
    /// ends the run before anything is written.
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        tracing::info!("Starting catalog export");

        let settlements = self.pipeline.extract().await?;
        if settlements.is_empty() {
            tracing::warn!("No settlements received, nothing to write");
            return Ok(RunSummary::default());
        }

        let result = self.pipeline.transform(settlements).await?;
        tracing::info!(
            "Enriched {} settlements across {} regions ({} failed lookups)",
            result.groups.settlement_count(),
            result.groups.len(),
            result.failed_lookups.len()
        );

        let summary = self.pipeline.load(result).await?;
        tracing::info!(
            "Wrote {} region files with {} service points in {:?}",
            summary.written_files.len(),
            summary.service_points,
            started.elapsed()
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EnrichedSettlement, Settlement, TransformResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPipeline {
        settlements: Vec<Settlement>,
        transforms: AtomicUsize,
        loads: AtomicUsize,
    }

    impl CountingPipeline {
        fn new(settlements: Vec<Settlement>) -> Self {
            Self {
                settlements,
                transforms: AtomicUsize::new(0),
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Pipeline for CountingPipeline {
        async fn extract(&self) -> Result<Vec<Settlement>> {
            Ok(self.settlements.clone())
        }

        async fn transform(&self, settlements: Vec<Settlement>) -> Result<TransformResult> {
            self.transforms.fetch_add(1, Ordering::SeqCst);
            let mut result = TransformResult::default();
            for settlement in settlements {
                result.groups.insert(EnrichedSettlement::new(settlement, vec![]));
            }
            Ok(result)
        }

        async fn load(&self, result: TransformResult) -> Result<RunSummary> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(RunSummary {
                settlements: result.groups.settlement_count(),
                regions: result.groups.len(),
                written_files: result
                    .groups
                    .iter()
                    .map(|g| format!("{}.json", g.region))
                    .collect(),
                ..RunSummary::default()
            })
        }
    }

    fn settlement(name: &str, region: &str) -> Settlement {
        Settlement {
            reference: format!("ref-{}", name),
            name: name.to_string(),
            region: region.to_string(),
            settlement_type: String::new(),
        }
    }

    #[tokio::test]
    async fn test_empty_catalog_skips_transform_and_load() {
        let engine = EtlEngine::new(CountingPipeline::new(vec![]));

        let summary = engine.run().await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(engine.pipeline.transforms.load(Ordering::SeqCst), 0);
        assert_eq!(engine.pipeline.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_executes_each_stage_once() {
        let engine = EtlEngine::new(CountingPipeline::new(vec![
            settlement("Kyiv", "Kyiv Oblast"),
            settlement("Odesa", "Odesa Oblast"),
            settlement("Bila Tserkva", "Kyiv Oblast"),
        ]));

        let summary = engine.run().await.unwrap();

        assert_eq!(summary.settlements, 3);
        assert_eq!(summary.regions, 2);
        assert_eq!(
            summary.written_files,
            vec!["Kyiv Oblast.json".to_string(), "Odesa Oblast.json".to_string()]
        );
        assert_eq!(engine.pipeline.transforms.load(Ordering::SeqCst), 1);
        assert_eq!(engine.pipeline.loads.load(Ordering::SeqCst), 1);
    }
}
