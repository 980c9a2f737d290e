use crate::domain::model::MixOptions;
use crate::utils::error::{AudioError, Result};
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

pub const CONCAT_LIST_FILE: &str = "concat_list.txt";

/// 失敗時保留的輸出行數
const OUTPUT_TAIL_LINES: usize = 20;

/// Builder for an ffmpeg invocation.
///
/// Every command starts with `-y` so an existing output is overwritten.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    binary: String,
    args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            args: vec!["-y".to_string()],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// concat demuxer，串流直接複製不重新編碼
    pub fn concat(binary: impl Into<String>, list_file: &Path, output: &Path) -> Self {
        Self::new(binary)
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(path_arg(list_file))
            .args(["-c", "copy"])
            .arg(path_arg(output))
    }

    pub fn mix(
        binary: impl Into<String>,
        inputs: &[&Path],
        options: &MixOptions,
        output: &Path,
    ) -> Self {
        let mut command = Self::new(binary);
        for input in inputs {
            command = command.arg("-i").arg(path_arg(input));
        }
        command
            .arg("-filter_complex")
            .arg(options.filter(inputs.len()))
            .arg(path_arg(output))
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// 執行並把輸出逐行寫進 log，非 0 結束碼視為失敗
    pub async fn run(&self, operation: &str) -> Result<()> {
        tracing::debug!("Running {} {}", self.binary, self.args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AudioError::FfmpegUnavailable {
                binary: self.binary.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout_tail, stderr_tail) =
            tokio::join!(drain_lines(stdout, operation), drain_lines(stderr, operation));

        let status = child.wait().await?;
        if status.success() {
            return Ok(());
        }

        // ffmpeg 把診斷訊息寫在 stderr
        let tail = if stderr_tail.is_empty() {
            stdout_tail
        } else {
            stderr_tail
        };

        Err(AudioError::FfmpegFailed {
            operation: operation.to_string(),
            exit_code: status.code(),
            output_tail: tail.into_iter().collect::<Vec<_>>().join("\n"),
        })
    }
}

/// 逐行讀取，非 UTF-8 的位元組用替代字元顯示
async fn drain_lines<R: AsyncRead + Unpin>(reader: Option<R>, operation: &str) -> VecDeque<String> {
    let mut tail = VecDeque::with_capacity(OUTPUT_TAIL_LINES);
    let Some(reader) = reader else {
        return tail;
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
                tracing::debug!("[FFmpeg {}] {}", operation, line);
                if tail.len() == OUTPUT_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.to_string());
            }
            Err(e) => {
                tracing::warn!("Failed to read ffmpeg output for {}: {}", operation, e);
                // pipe 要讀到 EOF，不然 ffmpeg 可能因 SIGPIPE 中止
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    tracing::warn!("Discarding ffmpeg output for {} failed: {}", operation, e);
                }
                break;
            }
        }
    }
    tail
}

/// concat list 內容，每行 `file '<path>'`
pub fn concat_list(paths: &[&Path]) -> String {
    paths
        .iter()
        .map(|path| format!("file '{}'\n", escape_concat_path(path)))
        .collect()
}

fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
