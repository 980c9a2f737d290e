use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("FFmpeg could not be started ({binary}): {source}")]
    FfmpegUnavailable {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("FFmpeg {operation} failed with exit code {}", exit_code_label(.exit_code))]
    FfmpegFailed {
        operation: String,
        exit_code: Option<i32>,
        output_tail: String,
    },

    #[error("Resource not found: {path}")]
    ResourceNotFound { path: String },

    #[error("Unknown flow: {name}")]
    UnknownFlow { name: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Upload error: {message}")]
    UploadError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Resource,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl AudioError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AudioError::ConfigError { .. } | AudioError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            AudioError::ValidationError { .. } | AudioError::UploadError { .. } => {
                ErrorCategory::Input
            }
            AudioError::ResourceNotFound { .. } | AudioError::UnknownFlow { .. } => {
                ErrorCategory::Resource
            }
            AudioError::FfmpegFailed { .. } => ErrorCategory::Processing,
            AudioError::IoError(_) | AudioError::FfmpegUnavailable { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Resource => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 兩個執行檔共用的結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AudioError::FfmpegUnavailable { .. } => {
                "Install ffmpeg or point --ffmpeg / [ffmpeg].binary at the executable"
            }
            AudioError::FfmpegFailed { .. } => {
                "Check that both inputs are valid audio files with compatible codecs"
            }
            AudioError::ResourceNotFound { .. } => {
                "Make sure the fixture exists in the configured resource directory"
            }
            AudioError::UnknownFlow { .. } => "List the available flows with GET /audio/test",
            AudioError::ConfigError { .. } | AudioError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or the command-line overrides"
            }
            AudioError::ValidationError { .. } | AudioError::UploadError { .. } => {
                "Send two non-empty audio files named file1 and file2"
            }
            AudioError::IoError(_) => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AudioError::FfmpegFailed {
                operation,
                output_tail,
                ..
            } if !output_tail.is_empty() => {
                format!("{} (last ffmpeg output for {}: {})", self, operation, output_tail)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AudioError>;

fn exit_code_label(code: &Option<i32>) -> String {
    // None means the process was killed by a signal
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}
