use clap::Parser;
use novaposhta_etl::core::ConfigProvider;
use novaposhta_etl::utils::{logger, validation::Validate};
use novaposhta_etl::{EtlEngine, LocalStorage, NovaPoshtaClient, RegionPipeline, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "Nova Poshta region export driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "novaposhta-etl.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the output directory from config
    #[arg(long)]
    output_path: Option<String>,

    /// Dry run - show the effective configuration without calling the API
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config file '{}': {}", args.config, e);
            eprintln!("Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_cli_logger(args.verbose || config.verbose());
    tracing::info!("Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(output_path) = &args.output_path {
        config.load.output_path = output_path.clone();
        tracing::info!("Output path overridden to: {}", output_path);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, args.dry_run);

    if args.dry_run {
        tracing::info!("Dry run, no requests will be sent");
        return Ok(());
    }

    let client = NovaPoshtaClient::from_config(&config)?;
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = RegionPipeline::new(storage, client, config);
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(summary) => {
            println!(
                "Done: {} settlements, {} service points, {} region files ({} failed lookups)",
                summary.settlements,
                summary.service_points,
                summary.written_files.len(),
                summary.failed_lookups.len()
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

fn display_config_summary(config: &TomlConfig, dry_run: bool) {
    let retry = config.retry_policy();
    let defaults = config.field_defaults();

    println!("Configuration Summary:");
    println!("  Pipeline: {}", config.pipeline_name());
    println!("  Endpoint: {}", config.api_endpoint());
    println!("  Output: {}", config.output_path());
    println!("  Timeout: {:?}", config.request_timeout());
    println!(
        "  Retry: {} attempts, backoff {:?} (max {:?}), statuses {:?}",
        retry.max_attempts, retry.backoff_factor, retry.max_backoff, retry.retry_statuses
    );
    println!("  Delay between settlements: {:?}", config.request_delay());
    println!("  Fallback region: {}", defaults.region);

    if dry_run {
        println!("  DRY RUN MODE ENABLED");
    }

    println!();
}
