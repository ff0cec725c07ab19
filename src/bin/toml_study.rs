use clap::Parser;
use intersection_los::core::{ConfigProvider, StudyDefinition};
use intersection_los::scenario::validate_changes;
use intersection_los::utils::error::ErrorSeverity;
use intersection_los::utils::{logger, validation::Validate};
use intersection_los::{AnalysisEngine, LocalStorage, StudyConfig, StudyPipeline};

#[derive(Parser)]
#[command(name = "toml-study")]
#[command(about = "Run an intersection LOS study described by a TOML configuration")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "study.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override engine.max_parallel from config
    #[arg(long)]
    max_parallel: Option<usize>,

    /// Validate the study and its change sets without computing anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting TOML-based study runner");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = match StudyConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if let Some(max_parallel) = args.max_parallel {
        config.engine.max_parallel = max_parallel;
        tracing::info!("🔧 max_parallel overridden to: {}", max_parallel);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No computation will occur");
        let valid = perform_dry_run(&config)?;
        if !valid {
            std::process::exit(1);
        }
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(".");
    let pipeline = StudyPipeline::new(storage, config);
    let engine = AnalysisEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Study completed successfully!");
            println!("✅ Study completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Study failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

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

fn display_config_summary(config: &StudyConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Study: {}", config.study.name);
    if let Some(description) = &config.study.description {
        println!("  Description: {}", description);
    }
    println!("  Input: {}", config.input_path());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if let Some(archive) = config.archive_name() {
        println!("  Compression: {} (ZIP)", archive);
    }
    println!("  Max Parallel: {}", config.max_parallel());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

/// 讀取研究檔、驗證所有情境變更組；回傳是否全部有效
fn perform_dry_run(config: &StudyConfig) -> anyhow::Result<bool> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let data = std::fs::read(config.input_path())?;
    let study: StudyDefinition = serde_json::from_slice(&data)?;

    if let Err(e) = study.validate() {
        println!("❌ Study definition invalid: {}", e.user_friendly_message());
        return Ok(false);
    }

    println!("🚦 Intersection: {} ({})", study.intersection, study.analysis_period);
    println!("  Lane groups: {}", study.lane_groups.len());
    for lane_group in &study.lane_groups {
        println!(
            "    {} ({}): {} veh/h, {} lane(s)",
            lane_group.name,
            lane_group.movement_label(),
            lane_group.params.volume,
            lane_group.params.num_lanes
        );
    }

    let base = study.base_document()?;
    let mut valid = true;

    println!();
    println!("🛠️ Scenarios:");
    println!("  {} (baseline)", study.baseline_name);
    for scenario in &study.scenarios {
        let errors = validate_changes(&base, &study.change_set(scenario));
        if errors.is_empty() {
            println!("  ✅ {}: {} change(s)", scenario.name, scenario.changes.len());
        } else {
            valid = false;
            println!("  ❌ {}: {} error(s)", scenario.name, errors.len());
            for error in errors {
                println!("     {}", error);
            }
        }
    }

    if let Some(volumes) = &study.volumes {
        let check = intersection_los::volume::analyze_volumes(volumes);
        println!();
        println!(
            "📊 Volume check: {} warning(s), {} error(s), {} suggestion(s)",
            check.warning_count,
            check.error_count,
            check.suggestions.len()
        );
    }

    println!();
    if valid {
        println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
    } else {
        println!("❌ Dry run found invalid change sets.");
    }

    Ok(valid)
}
