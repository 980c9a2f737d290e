use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 允許的音訊副檔名
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac", "ogg", "flac"];

/// 上傳或從資源目錄載入的音訊檔
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub file_name: String,
    pub data: Bytes,
}

impl AudioInput {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    /// 小寫副檔名，沒有副檔名時回傳 None
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.file_name)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 已儲存的輸出檔
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub path: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub data: Bytes,
}

impl AudioArtifact {
    /// 轉回輸入，讓下一個步驟繼續使用
    pub fn into_input(self) -> AudioInput {
        AudioInput {
            file_name: self.file_name,
            data: self.data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioOperation {
    Merge,
    Mix,
}

impl AudioOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioOperation::Merge => "merge",
            AudioOperation::Mix => "mix",
        }
    }
}

/// amix 的輸出長度規則
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixDuration {
    #[default]
    Longest,
    Shortest,
    First,
}

impl MixDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixDuration::Longest => "longest",
            MixDuration::Shortest => "shortest",
            MixDuration::First => "first",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MixOptions {
    pub duration: MixDuration,
    pub dropout_transition: u32,
}

impl MixOptions {
    /// amix filter 字串
    pub fn filter(&self, inputs: usize) -> String {
        format!(
            "amix=inputs={}:duration={}:dropout_transition={}",
            inputs,
            self.duration.as_str(),
            self.dropout_transition
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStrategy {
    /// 各聲道先各自串接，最後混音
    MergeThenMix,
    /// 每組先混音，再把混音結果串接
    MixThenMerge,
    Merge,
    Mix,
}

impl FlowStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStrategy::MergeThenMix => "merge_then_mix",
            FlowStrategy::MixThenMerge => "mix_then_merge",
            FlowStrategy::Merge => "merge",
            FlowStrategy::Mix => "mix",
        }
    }
}

/// Flow 執行結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowReport {
    pub flow: String,
    pub description: String,
    pub strategy: FlowStrategy,
    pub output_path: String,
    pub size_bytes: u64,
    pub duration_ms: u64,
    pub operations: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_memory_mb: Option<u64>,
}

impl FlowReport {
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {}, time: {} ms, size: {} bytes",
            self.flow, self.description, self.output_path, self.duration_ms, self.size_bytes
        )
    }
}

pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}
