//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use signpose_models::EncodingConfig;

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, FfmpegProgress};

/// Lines of FFmpeg diagnostics kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// An FFmpeg invocation that turns one input stream into one file.
///
/// Always overwrites the output, logs only errors and reports progress on
/// stderr so the runner can follow it.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: String,
    output: PathBuf,
    before_input: Vec<String>,
    after_input: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_string_lossy().into_owned(),
            output: output.as_ref().to_path_buf(),
            before_input: Vec::new(),
            after_input: Vec::new(),
        }
    }

    /// Packed `rgb24` frames of `width`x`height` arriving on stdin at `fps`.
    pub fn raw_video(width: u32, height: u32, fps: u32, output: impl AsRef<Path>) -> Self {
        let size = format!("{}x{}", width, height);
        let rate = fps.to_string();
        Self::new("-", output).input_args([
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            size.as_str(),
            "-r",
            rate.as_str(),
        ])
    }

    /// Options that describe the input (placed before `-i`).
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before_input.extend(args.into_iter().map(Into::into));
        self
    }

    /// Options for the output file (placed after the input).
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after_input.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_args(["-vf".to_string(), filter.into()])
    }

    /// Apply codec, preset, CRF and pixel format.
    pub fn encoding(self, config: &EncodingConfig) -> Self {
        self.output_args(config.to_ffmpeg_args())
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-v", "error", "-progress", "pipe:2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(self.before_input.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.clone());
        args.extend(self.after_input.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Runs FFmpeg commands, feeding stdin and following `-progress` output.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill FFmpeg if it runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run a command, streaming `chunks` to its stdin.
    pub async fn run_piped<'a, I, F>(
        &self,
        cmd: &FfmpegCommand,
        chunks: I,
        progress_callback: F,
    ) -> MediaResult<()>
    where
        I: IntoIterator<Item = &'a [u8]>,
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!(args = %args.join(" "), "Running ffmpeg");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stdin not captured"))?;

        // Progress lines go to the callback; anything else is kept for errors.
        let stderr_handle = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            let mut current = FfmpegProgress::default();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                if is_progress_line(&line) {
                    if let Some(progress) = current.update(&line) {
                        progress_callback(progress);
                    }
                } else if !line.trim().is_empty() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
            Vec::from(tail).join("\n")
        });

        let mut write_result = Ok(());
        for chunk in chunks {
            if let Err(e) = stdin.write_all(chunk).await {
                write_result = Err(e);
                break;
            }
        }
        if write_result.is_ok() {
            write_result = stdin.shutdown().await;
        }
        drop(stdin);

        let status = self.wait_for_completion(&mut child).await;
        let stderr_tail = stderr_handle.await.unwrap_or_default();
        let status = status?;

        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!stderr_tail.is_empty()).then_some(stderr_tail),
                status.code(),
            ));
        }
        write_result?;
        Ok(())
    }

    /// Wait for the child process with an optional timeout.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
                Ok(status) => Ok(status?),
                Err(_) => {
                    warn!("FFmpeg timed out after {} seconds, killing process", secs);
                    let _ = child.kill().await;
                    Err(MediaError::ffmpeg_failed(
                        format!("FFmpeg timed out after {} seconds", secs),
                        None,
                        None,
                    ))
                }
            },
            None => Ok(child.wait().await?),
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}
