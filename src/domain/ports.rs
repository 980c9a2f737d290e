use crate::domain::model::{AudioArtifact, AudioInput, AudioOperation, MixOptions};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 給使用者看的完整位置
    fn location(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn ffmpeg_binary(&self) -> &str;
    fn mix_options(&self) -> MixOptions;
    fn resource_dir(&self) -> &str;
    fn output_dir(&self) -> &str;
    /// 暫存工作目錄的上層，None 表示系統暫存目錄
    fn work_dir(&self) -> Option<&str>;
}

#[async_trait]
pub trait AudioProcessor: Send + Sync {
    /// 兩個檔案前後串接
    async fn merge(
        &self,
        first: &AudioInput,
        second: &AudioInput,
        output: &str,
    ) -> Result<AudioArtifact>;

    /// 兩個檔案從同一起點混音
    async fn mix(&self, first: &AudioInput, second: &AudioInput, output: &str)
        -> Result<AudioArtifact>;

    async fn apply(
        &self,
        operation: AudioOperation,
        first: &AudioInput,
        second: &AudioInput,
        output: &str,
    ) -> Result<AudioArtifact> {
        match operation {
            AudioOperation::Merge => self.merge(first, second, output).await,
            AudioOperation::Mix => self.mix(first, second, output).await,
        }
    }
}

#[async_trait]
impl<P: AudioProcessor + ?Sized> AudioProcessor for Arc<P> {
    async fn merge(
        &self,
        first: &AudioInput,
        second: &AudioInput,
        output: &str,
    ) -> Result<AudioArtifact> {
        (**self).merge(first, second, output).await
    }

    async fn mix(
        &self,
        first: &AudioInput,
        second: &AudioInput,
        output: &str,
    ) -> Result<AudioArtifact> {
        (**self).mix(first, second, output).await
    }
}
