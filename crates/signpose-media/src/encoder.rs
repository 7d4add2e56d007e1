//! Video encoding of rendered frames.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use image::RgbImage;
use tracing::{debug, info};

use signpose_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::metrics;

/// Writes an ordered list of frames to a video file.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    async fn encode(&self, frames: &[RgbImage], fps: u32, output: &Path) -> MediaResult<()>;
}

/// Encoder piping raw RGB frames into FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    config: EncodingConfig,
    runner: FfmpegRunner,
}

impl FfmpegEncoder {
    pub fn new(config: EncodingConfig) -> Self {
        Self {
            config,
            runner: FfmpegRunner::new(),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    pub fn config(&self) -> &EncodingConfig {
        &self.config
    }

    /// Build the command for a frame size without running it.
    pub fn command(&self, width: u32, height: u32, fps: u32, output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::raw_video(width, height, fps, output);
        // yuv420p needs even dimensions.
        if width % 2 == 1 || height % 2 == 1 {
            cmd = cmd.video_filter("pad=ceil(iw/2)*2:ceil(ih/2)*2");
        }
        cmd.encoding(&self.config)
    }
}

/// Check the frame list is non-empty and uniformly sized.
fn frame_dimensions(frames: &[RgbImage]) -> MediaResult<(u32, u32)> {
    let first = frames
        .first()
        .ok_or_else(|| MediaError::invalid_pose("no frames to encode"))?;
    let dims = first.dimensions();
    if let Some((i, frame)) = frames.iter().enumerate().find(|(_, f)| f.dimensions() != dims) {
        return Err(MediaError::internal(format!(
            "frame {} is {}x{}, expected {}x{}",
            i,
            frame.width(),
            frame.height(),
            dims.0,
            dims.1
        )));
    }
    Ok(dims)
}

fn frame_bytes(frame: &RgbImage) -> &[u8] {
    frame.as_raw().as_slice()
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn encode(&self, frames: &[RgbImage], fps: u32, output: &Path) -> MediaResult<()> {
        let (width, height) = frame_dimensions(frames)?;
        if fps == 0 {
            return Err(MediaError::invalid_request("fps must be positive"));
        }

        let cmd = self.command(width, height, fps, output);
        let total = frames.len() as u64;
        let start = Instant::now();
        debug!(state = "encode", frames = total, width, height, fps, "Encoding frames");

        self.runner
            .run_piped(
                &cmd,
                frames.iter().map(frame_bytes),
                move |progress| {
                    debug!(
                        frame = progress.frame,
                        percent = progress.percentage(total),
                        "Encoding progress"
                    );
                },
            )
            .await?;

        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_encode_duration(elapsed);
        info!(
            output = %output.display(),
            frames = total,
            elapsed_secs = elapsed,
            "Encoded video"
        );
        Ok(())
    }
}
