//! Error types for pose processing and media operations.

use std::path::PathBuf;
use thiserror::Error;

use signpose_models::PoseError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Coarse classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested word is not in the dataset.
    NotFound,
    /// The request or its pose data is malformed.
    Invalid,
    /// Anything else: model, encoder, IO.
    Internal,
}

/// Errors that can occur while turning words into an animation.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Word not found in dataset: {0}")]
    WordNotFound(String),

    #[error("Invalid pose sequence: {0}")]
    InvalidPoseSequence(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Body model evaluation failed: {0}")]
    ModelEvaluation(String),

    #[error("Frame {frame} failed after neutral-hand retry: {source}")]
    FrameEvaluation {
        frame: usize,
        #[source]
        source: Box<MediaError>,
    },

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("NPZ read error: {0}")]
    Npz(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a word-not-found error.
    pub fn word_not_found(word: impl Into<String>) -> Self {
        Self::WordNotFound(word.into())
    }

    /// Create an invalid pose sequence error.
    pub fn invalid_pose(message: impl Into<String>) -> Self {
        Self::InvalidPoseSequence(message.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a body model evaluation error.
    pub fn model_evaluation(message: impl Into<String>) -> Self {
        Self::ModelEvaluation(message.into())
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify for the calling layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::WordNotFound(_) => ErrorKind::NotFound,
            MediaError::InvalidPoseSequence(_) | MediaError::InvalidRequest(_) => {
                ErrorKind::Invalid
            }
            _ => ErrorKind::Internal,
        }
    }
}

impl From<PoseError> for MediaError {
    fn from(err: PoseError) -> Self {
        MediaError::InvalidPoseSequence(err.to_string())
    }
}

impl From<ndarray_npy::ReadNpzError> for MediaError {
    fn from(err: ndarray_npy::ReadNpzError) -> Self {
        MediaError::Npz(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(MediaError::word_not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(MediaError::invalid_pose("x").kind(), ErrorKind::Invalid);
        assert_eq!(MediaError::invalid_request("x").kind(), ErrorKind::Invalid);
        assert_eq!(MediaError::FfmpegNotFound.kind(), ErrorKind::Internal);
        let frame = MediaError::FrameEvaluation {
            frame: 3,
            source: Box::new(MediaError::model_evaluation("singular")),
        };
        assert_eq!(frame.kind(), ErrorKind::Internal);
        assert!(frame.to_string().contains("Frame 3"));
    }

    #[test]
    fn test_pose_error_maps_to_invalid() {
        let err: MediaError = PoseError::Empty.into();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }
}
