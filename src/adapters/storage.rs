use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::{AudioError, Result};
use std::path::PathBuf;

/// 以某個目錄為根的本機檔案儲存
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// fixture 目錄
    pub fn for_fixtures(config: &impl ConfigProvider) -> Self {
        Self::new(config.resource_dir())
    }

    /// 輸出目錄
    pub fn for_outputs(config: &impl ConfigProvider) -> Self {
        Self::new(config.output_dir())
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.base_path.join(path);
        match tokio::fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AudioError::ResourceNotFound {
                    path: full_path.display().to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }

    fn location(&self, path: &str) -> String {
        self.base_path.join(path).display().to_string()
    }
}
