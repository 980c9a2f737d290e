use crate::core::ffmpeg::{concat_list, FfmpegCommand, CONCAT_LIST_FILE};
use crate::domain::model::{AudioArtifact, AudioInput, MixOptions};
use crate::domain::ports::{AudioProcessor, ConfigProvider, Storage};
use crate::utils::error::{AudioError, Result};
use crate::utils::validation::{validate_audio_file_name, validate_output_name};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DEFAULT_EXTENSION: &str = "mp3";

/// Merges and mixes audio pairs with ffmpeg and saves the result through `Storage`.
///
/// Each call works in its own temporary directory. The directory is removed when
/// the call returns, whether it succeeded or not.
pub struct AudioService<S: Storage> {
    storage: S,
    ffmpeg_binary: String,
    mix_options: MixOptions,
    work_dir: Option<PathBuf>,
}

impl<S: Storage> AudioService<S> {
    pub fn new(storage: S, config: &impl ConfigProvider) -> Self {
        Self {
            storage,
            ffmpeg_binary: config.ffmpeg_binary().to_string(),
            mix_options: config.mix_options(),
            work_dir: config.work_dir().map(PathBuf::from),
        }
    }

    /// 兩個檔案前後串接後存到 `output`，已存在的檔案會被覆蓋
    pub async fn merge_files_and_save(
        &self,
        first: &AudioInput,
        second: &AudioInput,
        output: &str,
    ) -> Result<AudioArtifact> {
        validate_request(first, second, output)?;

        let work_dir = self.create_work_dir("audio-merge-")?;
        let source1 = stage_input(work_dir.path(), 1, first).await?;
        let source2 = stage_input(work_dir.path(), 2, second).await?;

        let list_path = work_dir.path().join(CONCAT_LIST_FILE);
        tokio::fs::write(&list_path, concat_list(&[source1.as_path(), source2.as_path()])).await?;

        let produced = work_dir
            .path()
            .join(format!("merged_output.{}", output_extension(output)));
        FfmpegCommand::concat(&self.ffmpeg_binary, &list_path, &produced)
            .run("merge")
            .await?;

        self.save_output(&produced, output).await
    }

    /// 兩個檔案對齊起點混音，長度依 `MixOptions` 決定
    pub async fn mix_files_and_save(
        &self,
        first: &AudioInput,
        second: &AudioInput,
        output: &str,
    ) -> Result<AudioArtifact> {
        validate_request(first, second, output)?;

        let work_dir = self.create_work_dir("audio-mix-")?;
        let source1 = stage_input(work_dir.path(), 1, first).await?;
        let source2 = stage_input(work_dir.path(), 2, second).await?;

        let produced = work_dir
            .path()
            .join(format!("mixed_output.{}", output_extension(output)));
        FfmpegCommand::mix(
            &self.ffmpeg_binary,
            &[source1.as_path(), source2.as_path()],
            &self.mix_options,
            &produced,
        )
        .run("mix")
        .await?;

        self.save_output(&produced, output).await
    }

    fn create_work_dir(&self, prefix: &str) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match &self.work_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn save_output(&self, produced: &Path, output: &str) -> Result<AudioArtifact> {
        let data = tokio::fs::read(produced).await?;

        self.storage.write_file(output, &data).await?;

        let artifact = AudioArtifact {
            path: self.storage.location(output),
            file_name: Path::new(output)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| output.to_string()),
            size_bytes: data.len() as u64,
            data: Bytes::from(data),
        };
        tracing::debug!("Saved {} ({} bytes)", artifact.path, artifact.size_bytes);
        Ok(artifact)
    }
}

#[async_trait]
impl<S: Storage> AudioProcessor for AudioService<S> {
    async fn merge(
        &self,
        first: &AudioInput,
        second: &AudioInput,
        output: &str,
    ) -> Result<AudioArtifact> {
        self.merge_files_and_save(first, second, output).await
    }

    async fn mix(
        &self,
        first: &AudioInput,
        second: &AudioInput,
        output: &str,
    ) -> Result<AudioArtifact> {
        self.mix_files_and_save(first, second, output).await
    }
}

fn validate_request(first: &AudioInput, second: &AudioInput, output: &str) -> Result<()> {
    for (field, input) in [("first", first), ("second", second)] {
        validate_audio_file_name(field, &input.file_name)?;
        if input.is_empty() {
            return Err(AudioError::ValidationError {
                message: format!("{} input '{}' is empty", field, input.file_name),
            });
        }
    }
    validate_output_name(output)
}

/// 用編號命名暫存檔，避免兩個同名上傳互相覆蓋
async fn stage_input(dir: &Path, index: usize, input: &AudioInput) -> Result<PathBuf> {
    let extension = input
        .extension()
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    let path = dir.join(format!("input_{}.{}", index, extension));
    tokio::fs::write(&path, &input.data).await?;
    Ok(path)
}

fn output_extension(output: &str) -> String {
    crate::domain::model::file_extension(output).unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
