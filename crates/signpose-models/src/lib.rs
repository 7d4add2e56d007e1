//! Shared data models for the SignPose backend.
//!
//! This crate provides Serde-serializable types for:
//! - The fixed SMPL-X parameter layout of a pose frame
//! - Pose frames and sequences
//! - Gloss dataset records
//! - Animation requests and outputs
//! - Encoding configuration

pub mod dataset;
pub mod encoding;
pub mod layout;
pub mod output;
pub mod pose;
pub mod request;

// Re-export common types
pub use dataset::{GlossMapping, PoseRecord, WordEntry};
pub use encoding::EncodingConfig;
pub use layout::{
    BODY_POSE, GLOBAL_ORIENT, HAND_DIM, LEFT_HAND, NUM_BETAS, NUM_EXPRESSION_COEFFS, POSE_DIM,
    RIGHT_HAND,
};
pub use output::{FrameParams, RawModelOutput};
pub use pose::{PoseError, PoseFrame, PoseSequence};
pub use request::{normalize_word, AnimationRequest, DEFAULT_FPS};
