//! End-to-end animation: words in, video (or raw model output) out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use validator::Validate;

use signpose_models::{AnimationRequest, RawModelOutput, DEFAULT_FPS};

use crate::assembler::{mirror_pose, SequenceAssembler};
use crate::body_model::{BodyModel, SkinnedBodyModel};
use crate::config::{PipelineConfig, RenderMode};
use crate::dataset::{GlossDataset, PoseSource};
use crate::encoder::{FfmpegEncoder, VideoEncoder};
use crate::error::{MediaError, MediaResult};
use crate::evaluator::{EvaluationOutput, OutputMode, PoseEvaluator};
use crate::fs_utils::move_file;
use crate::hand::{AnatomicalConstraints, HandPoseProcessor, TemporalSmoother};
use crate::logging::RequestLogger;
use crate::metrics;
use crate::render::{RenderContext, SoftwareRasterizer};

/// Result of one animation request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnimationOutcome {
    Video {
        path: PathBuf,
        frame_count: usize,
        fps: u32,
        neutralized_frames: usize,
    },
    Raw(Box<RawModelOutput>),
}

/// Shared, read-only animation pipeline.
#[derive(Clone)]
pub struct AnimationPipeline {
    assembler: SequenceAssembler,
    evaluator: Arc<PoseEvaluator>,
    encoder: Arc<dyn VideoEncoder>,
    default_fps: u32,
}

impl AnimationPipeline {
    pub fn new(
        source: Arc<dyn PoseSource>,
        evaluator: PoseEvaluator,
        encoder: Arc<dyn VideoEncoder>,
    ) -> Self {
        Self {
            assembler: SequenceAssembler::new(source),
            evaluator: Arc::new(evaluator),
            encoder,
            default_fps: DEFAULT_FPS,
        }
    }

    /// Frame rate used when a request does not name one.
    pub fn with_default_fps(mut self, fps: u32) -> MediaResult<Self> {
        if !(1..=120).contains(&fps) {
            return Err(MediaError::invalid_request(format!(
                "default fps must be within 1..=120, got {}",
                fps
            )));
        }
        self.default_fps = fps;
        Ok(self)
    }

    pub fn default_fps(&self) -> u32 {
        self.default_fps
    }

    /// The frame rate `request` will be encoded at.
    pub fn fps_for(&self, request: &AnimationRequest) -> u32 {
        request.fps_or(self.default_fps)
    }

    /// Load the dataset and body model described by `config`.
    pub fn from_config(config: &PipelineConfig) -> MediaResult<Self> {
        let dataset = GlossDataset::open(&config.mapping_path, &config.dataset_dir)?;
        let model: Arc<dyn BodyModel> = Arc::new(SkinnedBodyModel::from_npz(&config.model_path)?);

        let hands = HandPoseProcessor::new(
            TemporalSmoother::new(config.smoothing_sigma),
            AnatomicalConstraints::new(config.joint_limits()?),
        );

        let mode = match config.render_mode {
            RenderMode::Render => {
                let raster = SoftwareRasterizer::new(config.viewport_width, config.viewport_height)?;
                OutputMode::Rasterize(RenderContext::new(Arc::new(raster)))
            }
            RenderMode::Vertices => OutputMode::VerticesOnly,
        };

        let encoder = FfmpegEncoder::new(config.encoding.clone())
            .with_timeout(config.encode_timeout_secs);

        Self::new(
            Arc::new(dataset),
            PoseEvaluator::new(model, hands, mode),
            Arc::new(encoder),
        )
        .with_default_fps(config.default_fps)
    }

    /// Words the pipeline can animate, sorted.
    pub fn words(&self) -> Vec<String> {
        self.assembler.source().words()
    }

    pub fn evaluator(&self) -> &PoseEvaluator {
        &self.evaluator
    }

    /// Animate `request`, publishing a video at `output_path`.
    ///
    /// The video is encoded beside `output_path` and moved into place only
    /// once complete.
    pub async fn animate(
        &self,
        request: &AnimationRequest,
        output_path: &Path,
    ) -> MediaResult<AnimationOutcome> {
        self.animate_with_id(request, output_path, None).await
    }

    /// Like [`animate`](Self::animate), logging under the caller's request id.
    pub async fn animate_with_id(
        &self,
        request: &AnimationRequest,
        output_path: &Path,
        request_id: Option<&str>,
    ) -> MediaResult<AnimationOutcome> {
        request
            .validate()
            .map_err(|e| MediaError::invalid_request(e.to_string()))?;
        let words = request.normalized_words();
        if words.iter().any(|w| w.is_empty()) {
            return Err(MediaError::invalid_request("words must not be blank"));
        }

        let logger = match request_id {
            Some(id) => RequestLogger::with_id(id, &words),
            None => RequestLogger::new(&words),
        };
        let span = logger.create_span();
        let result = self
            .run(request, &words, output_path, &logger)
            .instrument(span)
            .await;

        match &result {
            Ok(AnimationOutcome::Video { frame_count, .. }) => {
                metrics::record_animation("video");
                logger.log_completion(&format!("{} frames -> {}", frame_count, output_path.display()));
            }
            Ok(AnimationOutcome::Raw(_)) => {
                metrics::record_animation("raw");
                logger.log_completion("raw model output");
            }
            Err(e) => {
                metrics::record_animation("error");
                logger.log_error(&e.to_string());
            }
        }
        result
    }

    async fn run(
        &self,
        request: &AnimationRequest,
        words: &[String],
        output_path: &Path,
        logger: &RequestLogger,
    ) -> MediaResult<AnimationOutcome> {
        let fps = self.fps_for(request);
        logger.log_start(&format!("fps={} blend_width={}", fps, request.blend_width));

        let mut sequence = self.assembler.assemble(words, request.blend_width)?;
        if request.mirror {
            mirror_pose(&mut sequence);
        }
        logger.log_progress(&format!("assembled {} frames", sequence.len()));

        let evaluator = Arc::clone(&self.evaluator);
        let output = tokio::task::spawn_blocking(move || evaluator.evaluate(&sequence))
            .await
            .map_err(|e| MediaError::internal(format!("evaluation task failed: {}", e)))??;

        let (frames, report) = match output {
            EvaluationOutput::Raw(raw) => return Ok(AnimationOutcome::Raw(raw)),
            EvaluationOutput::Frames { frames, report } => (frames, report),
        };
        if report.neutralized_frames > 0 {
            logger.log_warning(&format!(
                "{} of {} frames rendered with neutral hands",
                report.neutralized_frames, report.frames
            ));
        }

        let dir = match output_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir).await?;
        let extension = output_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        // Removed on drop if encoding fails.
        let staged = tempfile::Builder::new()
            .prefix(".partial-")
            .suffix(&extension)
            .tempfile_in(&dir)?
            .into_temp_path();

        self.encoder.encode(&frames, fps, &staged).await?;
        move_file(&staged, output_path).await?;

        Ok(AnimationOutcome::Video {
            path: output_path.to_path_buf(),
            frame_count: frames.len(),
            fps,
            neutralized_frames: report.neutralized_frames,
        })
    }
}

impl std::fmt::Debug for AnimationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationPipeline")
            .field("evaluator", &self.evaluator)
            .finish_non_exhaustive()
    }
}
