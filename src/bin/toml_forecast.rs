use clap::Parser;
use sales_forecast::config::toml_config::TomlConfig;
use sales_forecast::core::ingest::ingest;
use sales_forecast::core::insight::InsightSummarizer;
use sales_forecast::core::ConfigProvider;
use sales_forecast::utils::error::ErrorSeverity;
use sales_forecast::utils::{logger, validation::Validate};
use sales_forecast::{JobRunner, LocalStorage, UploadPipeline};

#[derive(Parser)]
#[command(name = "toml-forecast")]
#[command(about = "Sales forecast driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "forecast-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the forecast horizon from config
    #[arg(long)]
    horizon: Option<usize>,

    /// Dry run - inspect the CSV and show what would be produced
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting TOML-based forecast tool");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if let Some(horizon) = args.horizon {
        config.forecast.horizon = horizon;
        tracing::info!("🔧 Horizon overridden to: {}", horizon);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No outputs will be written");
        perform_dry_run(&config)?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = UploadPipeline::new(LocalStorage::new("."), config)?;
    let runner = JobRunner::new_with_monitoring(pipeline, monitor_enabled);

    match runner.run().await {
        Ok(output_path) => {
            println!("✅ Forecast completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Forecast failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    println!("  Source: {}", config.input_path());
    println!("  Output: {}", config.output_path());
    println!("  Horizon: {} months", config.horizon());
    match config.reference_date() {
        Some(date) => println!("  Reference date: {}", date),
        None => println!("  Reference date: today"),
    }
    println!("  Formats: {}", config.output_formats().join(", "));
    if let Some(endpoint) = config.summary_endpoint() {
        println!("  Summary service: {}", endpoint);
    }
    if let Some(upload) = config.summary_upload_endpoint() {
        println!("  Summary upload: {}", upload);
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let raw = std::fs::read_to_string(config.input_path())?;
    let table = ingest(&raw)?;

    println!("📄 Upload Analysis:");
    println!("  Columns: {}", table.columns.join(", "));
    println!("  Rows read: {}", table.rows_read);
    println!("  Valid rows: {}", table.len());
    for skipped in table.skipped.iter().take(5) {
        println!("  ⚠️ line {}: {}", skipped.line, skipped.reason);
    }

    println!();
    println!("💡 Insight Dimensions:");
    for insight in InsightSummarizer::default().summarize_table(&table).iter() {
        match (&insight.best_label, &insight.info) {
            (Some(best), _) => println!("  {}: best '{}'", insight.dimension, best),
            (None, Some(info)) => println!("  {}: {}", insight.dimension, info),
            (None, None) => println!("  {}: unavailable", insight.dimension),
        }
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if let Some(bundle) = config.bundle_name() {
        println!("  Compression: {} (ZIP)", bundle);
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
