use audio_test::server::{start_server, AppState};
use audio_test::utils::{logger, validation::Validate};
use audio_test::{AudioService, CliConfig, FlowRunner, LocalStorage};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    logger::init_logger(cli.verbose, config.monitoring.log_json);

    tracing::info!("Starting audio-test server");
    if cli.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    tracing::info!("🎵 ffmpeg: {}", config.ffmpeg.binary);
    tracing::info!("📂 Fixtures: {}", config.storage.resource_dir);
    tracing::info!("📁 Outputs: {}", config.storage.output_dir);

    let service = AudioService::new(LocalStorage::for_outputs(&config), &config);
    let runner = FlowRunner::new(Arc::new(service), LocalStorage::for_fixtures(&config))
    .with_monitoring(config.monitoring_enabled())
    .with_parallel_channels(config.flows.parallel_channels);

    let state = AppState::new(runner, config.flows.plans(), config.max_upload_bytes());
    let addr = start_server(state, &config.server.host, config.server.port).await?;

    // Read by scripts that start the server on port 0
    println!("AUDIO_TEST_PORT={}", addr.port());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, exiting");

    Ok(())
}
