use crate::config::toml_config::TomlConfig;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "audio-test")]
#[command(about = "HTTP service that merges and mixes audio files with FFmpeg")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (0 = auto-assign)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// ffmpeg executable
    #[arg(long)]
    pub ffmpeg: Option<String>,

    /// Directory holding the fixture audio files
    #[arg(long)]
    pub resource_dir: Option<String>,

    /// Directory the merged and mixed outputs are written to
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Sample CPU and memory during flows
    #[arg(long)]
    pub monitor: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 讀取設定檔 (沒有就用預設值)，再套用命令列覆蓋
    pub fn load(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            config.ffmpeg.binary = ffmpeg.clone();
        }
        if let Some(dir) = &self.resource_dir {
            config.storage.resource_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.storage.output_dir = dir.clone();
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }
        if self.log_json {
            config.monitoring.log_json = true;
        }
    }
}
