#![deny(unreachable_patterns)]
//! Gloss words to SMPL-X sign animation.
//!
//! This crate provides:
//! - Anatomical joint limits and temporal smoothing for hand poses
//! - Word lookup and sequence assembly with optional cross-fading
//! - A linear blend skinned body model loaded from `.npz`
//! - A software rasterizer and FFmpeg encoding of rendered frames
//! - The end-to-end animation pipeline

pub mod assembler;
pub mod body_model;
pub mod command;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod evaluator;
pub mod fs_utils;
pub mod hand;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod render;

pub use assembler::{blend_sequences, mirror_pose, SequenceAssembler};
pub use body_model::{BodyMesh, BodyModel, BodyModelInput, SkinnedBodyModel, SMPLX_NUM_JOINTS};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use config::{PipelineConfig, RenderMode};
pub use dataset::{GlossDataset, InMemoryPoseSource, PoseSource};
pub use encoder::{FfmpegEncoder, VideoEncoder};
pub use error::{ErrorKind, MediaError, MediaResult};
pub use evaluator::{EvaluationOutput, EvaluationReport, OutputMode, PoseEvaluator};
pub use fs_utils::move_file;
pub use hand::{AnatomicalConstraints, HandPoseProcessor, JointLimitTable, TemporalSmoother};
pub use logging::RequestLogger;
pub use pipeline::{AnimationOutcome, AnimationPipeline};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use render::{Camera, DirectionalLight, Rasterizer, RenderContext, SoftwareRasterizer};
