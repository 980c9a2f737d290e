pub mod audio;
pub mod ffmpeg;
pub mod flow;

pub use crate::domain::model::{AudioArtifact, AudioInput, AudioOperation, FlowReport};
pub use crate::domain::ports::{AudioProcessor, ConfigProvider, Storage};
pub use crate::utils::error::Result;
