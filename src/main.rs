use clap::Parser;
use novaposhta_etl::core::ConfigProvider;
use novaposhta_etl::utils::{logger, validation::Validate};
use novaposhta_etl::{CliConfig, EtlEngine, LocalStorage, NovaPoshtaClient, RegionPipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting novaposhta-etl");
    tracing::debug!(
        "Endpoint: {}, output: {}, timeout: {:?}, retry: {:?}, delay: {:?}",
        config.api_endpoint(),
        config.output_path(),
        config.request_timeout(),
        config.retry_policy(),
        config.request_delay()
    );

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(1);
    }

    let client = NovaPoshtaClient::from_config(&config)?;
    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = RegionPipeline::new(storage, client, config);
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(summary) => {
            if !summary.failed_lookups.is_empty() {
                tracing::warn!(
                    "{} settlements were saved without service points",
                    summary.failed_lookups.len()
                );
            }
            println!(
                "Done: {} settlements, {} service points, {} region files",
                summary.settlements,
                summary.service_points,
                summary.written_files.len()
            );
        }
        Err(e) => {
            tracing::error!(
                "Export failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("{}", e.user_friendly_message());
            eprintln!("Suggestion: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
