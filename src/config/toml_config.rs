use crate::core::flow::FlowPlan;
use crate::core::ConfigProvider;
use crate::domain::model::{FlowStrategy, MixDuration, MixOptions};
use crate::utils::error::{AudioError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub ffmpeg: FfmpegConfig,
    pub storage: StorageConfig,
    pub flows: FlowsConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_mb: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    pub binary: String,
    pub mix_duration: MixDuration,
    pub dropout_transition: u32,
    pub work_dir: Option<String>,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            mix_duration: MixDuration::Longest,
            dropout_transition: 0,
            work_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// fixture 音檔所在目錄
    pub resource_dir: String,
    pub output_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            resource_dir: "./resources/audio".to_string(),
            output_dir: ".".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixturePair {
    pub first: String,
    pub second: String,
}

impl FixturePair {
    fn new(first: &str, second: &str) -> Self {
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }
}

/// 不指定 flow 時要跑的內建 flow
pub const BUILTIN_FLOWS: &[&str] = &["flow1", "flow2", "flow3", "flow4", "merge", "mix"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowsConfig {
    pub short_repetitions: usize,
    pub mid_repetitions: usize,
    pub short_fixtures: FixturePair,
    pub mid_fixtures: FixturePair,
    pub long_fixtures: FixturePair,
    pub parallel_channels: bool,
    pub custom: Vec<FlowPlan>,
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            short_repetitions: 60,
            mid_repetitions: 20,
            short_fixtures: FixturePair::new("short_a.mp3", "short_b.mp3"),
            mid_fixtures: FixturePair::new("mid_a.mp3", "mid_b.mp3"),
            long_fixtures: FixturePair::new("long_a.mp3", "long_b.mp3"),
            parallel_channels: false,
            custom: Vec::new(),
        }
    }
}

impl FlowsConfig {
    /// 內建 flow 加上自訂 flow，同名時自訂的取代內建的
    pub fn plans(&self) -> Vec<FlowPlan> {
        let short = &self.short_fixtures;
        let mid = &self.mid_fixtures;
        let long = &self.long_fixtures;

        let mut plans = vec![
            FlowPlan::new(
                "flow1",
                "short fixtures: merge each channel, then mix",
                FlowStrategy::MergeThenMix,
                &short.first,
                &short.second,
                self.short_repetitions,
            ),
            FlowPlan::new(
                "flow2",
                "short fixtures: mix each pair, then merge the mixes",
                FlowStrategy::MixThenMerge,
                &short.first,
                &short.second,
                self.short_repetitions,
            ),
            FlowPlan::new(
                "flow3",
                "mid fixtures: merge each channel, then mix",
                FlowStrategy::MergeThenMix,
                &mid.first,
                &mid.second,
                self.mid_repetitions,
            ),
            FlowPlan::new(
                "flow4",
                "mid fixtures: mix each pair, then merge the mixes",
                FlowStrategy::MixThenMerge,
                &mid.first,
                &mid.second,
                self.mid_repetitions,
            ),
            FlowPlan::new(
                "merge",
                "long fixtures: single merge",
                FlowStrategy::Merge,
                &long.first,
                &long.second,
                1,
            ),
            FlowPlan::new(
                "mix",
                "long fixtures: single mix",
                FlowStrategy::Mix,
                &long.first,
                &long.second,
                1,
            ),
        ];

        for custom in &self.custom {
            match plans.iter_mut().find(|plan| plan.name == custom.name) {
                Some(existing) => *existing = custom.clone(),
                None => plans.push(custom.clone()),
            }
        }
        plans
    }

    /// 依名稱挑選 flow，沒有名稱時只回傳內建 flow
    pub fn select(&self, names: &[String]) -> Result<Vec<FlowPlan>> {
        let available = self.plans();

        if names.is_empty() {
            return Ok(available
                .into_iter()
                .filter(|plan| BUILTIN_FLOWS.contains(&plan.name.as_str()))
                .collect());
        }

        names
            .iter()
            .map(|name| {
                available
                    .iter()
                    .find(|plan| &plan.name == name)
                    .cloned()
                    .ok_or_else(|| AudioError::UnknownFlow { name: name.clone() })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_json: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| AudioError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AudioError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FFMPEG_BIN})，找不到的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AudioError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("server.host", &self.server.host)?;
        validate_range("server.max_upload_mb", self.server.max_upload_mb, 1, 2048)?;

        validate_non_empty_string("ffmpeg.binary", &self.ffmpeg.binary)?;
        validate_range("ffmpeg.dropout_transition", self.ffmpeg.dropout_transition, 0, 60_000)?;

        if let Some(work_dir) = &self.ffmpeg.work_dir {
            validate_path("ffmpeg.work_dir", work_dir)?;
        }
        validate_path("storage.resource_dir", &self.storage.resource_dir)?;
        validate_path("storage.output_dir", &self.storage.output_dir)?;

        validate_positive_number("flows.short_repetitions", self.flows.short_repetitions, 1)?;
        validate_positive_number("flows.mid_repetitions", self.flows.mid_repetitions, 1)?;
        for plan in self.flows.plans() {
            plan.validate()?;
        }

        Ok(())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb * 1024 * 1024
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl ConfigProvider for TomlConfig {
    fn ffmpeg_binary(&self) -> &str {
        &self.ffmpeg.binary
    }

    fn mix_options(&self) -> MixOptions {
        MixOptions {
            duration: self.ffmpeg.mix_duration,
            dropout_transition: self.ffmpeg.dropout_transition,
        }
    }

    fn resource_dir(&self) -> &str {
        &self.storage.resource_dir
    }

    fn output_dir(&self) -> &str {
        &self.storage.output_dir
    }

    fn work_dir(&self) -> Option<&str> {
        self.ffmpeg.work_dir.as_deref()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_builtin_flows() {
        let config = TomlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ffmpeg_binary(), "ffmpeg");

        let plans = config.flows.plans();
        let names: Vec<&str> = plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["flow1", "flow2", "flow3", "flow4", "merge", "mix"]);
        assert_eq!(plans[0].repetitions, 60);
        assert_eq!(plans[2].repetitions, 20);
        assert_eq!(plans[2].first, "mid_a.mp3");
        assert_eq!(plans[5].strategy, FlowStrategy::Mix);
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[server]
port = 9000

[ffmpeg]
binary = "/opt/ffmpeg/bin/ffmpeg"
mix_duration = "shortest"

[flows]
short_repetitions = 5

[[flows.custom]]
name = "quick"
strategy = "merge_then_mix"
first = "short_a.mp3"
second = "short_b.mp3"
repetitions = 2

[[flows.custom]]
name = "mix"
description = "overridden"
strategy = "mix"
first = "mid_a.mp3"
second = "mid_b.mp3"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.mix_options().duration, MixDuration::Shortest);
        assert_eq!(config.ffmpeg_binary(), "/opt/ffmpeg/bin/ffmpeg");

        let plans = config.flows.plans();
        assert_eq!(plans.len(), 7);
        assert_eq!(plans[0].repetitions, 5);
        let mix = plans.iter().find(|p| p.name == "mix").unwrap();
        assert_eq!(mix.description, "overridden");
        assert_eq!(mix.first, "mid_a.mp3");
        assert_eq!(mix.repetitions, 1);
        assert!(plans.iter().any(|p| p.name == "quick"));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("AUDIO_TEST_FFMPEG_BIN", "/usr/bin/ffmpeg");

        let toml_content = r#"
[ffmpeg]
binary = "${AUDIO_TEST_FFMPEG_BIN}"

[storage]
output_dir = "${AUDIO_TEST_UNSET_OUTPUT_DIR}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.ffmpeg.binary, "/usr/bin/ffmpeg");
        assert_eq!(config.storage.output_dir, "${AUDIO_TEST_UNSET_OUTPUT_DIR}");

        std::env::remove_var("AUDIO_TEST_FFMPEG_BIN");
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str("[flows]\nmid_repetitions = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str("[server]\nmax_upload_mb = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str("[ffmpeg]\nbinary = \" \"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config =
            TomlConfig::from_toml_str(include_str!("../../audio-test.toml")).unwrap();
        assert!(config.validate().is_ok());

        let plans = config.flows.plans();
        assert_eq!(plans.len(), 7);
        assert_eq!(plans[6].name, "flow5");
        assert_eq!(plans[6].strategy, FlowStrategy::MergeThenMix);
    }

    #[test]
    fn test_select_defaults_to_builtin_flows() {
        let config =
            TomlConfig::from_toml_str(include_str!("../../audio-test.toml")).unwrap();

        let selected = config.flows.select(&[]).unwrap();
        let names: Vec<&str> = selected.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, BUILTIN_FLOWS);

        let selected = config
            .flows
            .select(&["flow5".to_string(), "mix".to_string()])
            .unwrap();
        assert_eq!(selected[0].name, "flow5");
        assert_eq!(selected[1].strategy, FlowStrategy::Mix);

        let err = config.flows.select(&["flow9".to_string()]).unwrap_err();
        assert!(matches!(err, AudioError::UnknownFlow { name } if name == "flow9"));
    }

    #[test]
    fn test_work_dir_option() {
        let config = TomlConfig::from_toml_str("[ffmpeg]\nwork_dir = \"/var/tmp/audio\"\n").unwrap();
        assert_eq!(config.work_dir(), Some("/var/tmp/audio"));
        assert_eq!(TomlConfig::default().work_dir(), None);

        let config = TomlConfig::from_toml_str("[ffmpeg]\nwork_dir = \"\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = TomlConfig::from_toml_str("[server\nport = 1").unwrap_err();
        assert!(matches!(err, AudioError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\nresource_dir = \"./fixtures\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.resource_dir(), "./fixtures");
        assert_eq!(config.output_dir(), ".");
    }
}
