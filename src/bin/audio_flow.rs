use audio_test::utils::{logger, validation::Validate};
use audio_test::{AudioError, AudioService, FlowPlan, FlowRunner, LocalStorage, TomlConfig};
use clap::Parser;

#[derive(Parser)]
#[command(name = "audio-flow")]
#[command(about = "Run audio merge/mix flows without starting the HTTP server")]
struct Args {
    /// Flows to run (default: the built-in flows, custom ones only by name)
    flows: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// ffmpeg executable
    #[arg(long)]
    ffmpeg: Option<String>,

    #[arg(long)]
    resource_dir: Option<String>,

    #[arg(long)]
    output_dir: Option<String>,

    /// Override the repetition count of every selected flow
    #[arg(long)]
    repetitions: Option<usize>,

    /// Build both channels of merge-then-mix flows concurrently
    #[arg(long)]
    parallel: bool,

    /// Sample CPU and memory during flows
    #[arg(long)]
    monitor: bool,

    /// List every available flow, custom ones included, and exit
    #[arg(long)]
    list: bool,

    /// Show what would run without invoking ffmpeg
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            match TomlConfig::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    eprintln!("💡 Make sure the file exists and is valid TOML format");
                    std::process::exit(e.exit_code());
                }
            }
        }
        None => TomlConfig::default(),
    };
    apply_overrides(&args, &mut config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    if args.list {
        display_plans(&config, &config.flows.plans());
        return Ok(());
    }

    let plans = match select_plans(&config, &args) {
        Ok(plans) => plans,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    if args.dry_run {
        display_plans(&config, &plans);
        tracing::info!("🔍 DRY RUN MODE - ffmpeg was not invoked");
        return Ok(());
    }

    let service = AudioService::new(LocalStorage::for_outputs(&config), &config);
    let runner = FlowRunner::new(service, LocalStorage::for_fixtures(&config))
        .with_monitoring(config.monitoring_enabled())
        .with_parallel_channels(config.flows.parallel_channels);

    for plan in &plans {
        match runner.run(plan).await {
            Ok(report) => println!("✅ {}", report.summary()),
            Err(e) => {
                tracing::error!(
                    "❌ Flow {} failed: {} (Category: {:?}, Severity: {:?})",
                    plan.name,
                    e,
                    e.category(),
                    e.severity()
                );
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 建議: {}", e.recovery_suggestion());
                std::process::exit(e.exit_code());
            }
        }
    }

    Ok(())
}

fn apply_overrides(args: &Args, config: &mut TomlConfig) {
    if let Some(ffmpeg) = &args.ffmpeg {
        config.ffmpeg.binary = ffmpeg.clone();
    }
    if let Some(dir) = &args.resource_dir {
        config.storage.resource_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.storage.output_dir = dir.clone();
    }
    if args.parallel {
        config.flows.parallel_channels = true;
    }
    if args.monitor {
        config.monitoring.enabled = true;
    }
}

fn select_plans(config: &TomlConfig, args: &Args) -> Result<Vec<FlowPlan>, AudioError> {
    let mut selected = config.flows.select(&args.flows)?;

    if let Some(repetitions) = args.repetitions {
        for plan in &mut selected {
            plan.repetitions = repetitions;
            plan.validate()?;
        }
    }
    Ok(selected)
}

fn display_plans(config: &TomlConfig, plans: &[FlowPlan]) {
    println!("🎵 ffmpeg: {}", config.ffmpeg.binary);
    println!("📂 Fixtures: {}", config.storage.resource_dir);
    println!("📁 Outputs: {}", config.storage.output_dir);
    println!();
    for plan in plans {
        println!(
            "  {:<8} {:<15} {} + {} x{}  {}",
            plan.name,
            plan.strategy.as_str(),
            plan.first,
            plan.second,
            plan.repetitions,
            plan.description
        );
    }
}
