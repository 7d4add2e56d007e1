//! Pose frames and pose sequences.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{BODY_POSE, GLOBAL_ORIENT, LEFT_HAND, POSE_DIM, RIGHT_HAND};

/// Errors raised when building pose data from untrusted input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoseError {
    #[error("frame {index} has {len} parameters, expected {expected}")]
    WrongFrameLength {
        index: usize,
        len: usize,
        expected: usize,
    },

    #[error("pose sequence is empty")]
    Empty,
}

/// One frame of SMPL-X parameters.
///
/// Always exactly [`POSE_DIM`] values. Serialized as a flat JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct PoseFrame(Vec<f32>);

impl PoseFrame {
    /// The neutral (all-zero) frame.
    pub fn zeros() -> Self {
        Self(vec![0.0; POSE_DIM])
    }

    /// Build a frame, rejecting vectors of the wrong length.
    pub fn new(values: Vec<f32>) -> Result<Self, PoseError> {
        if values.len() != POSE_DIM {
            return Err(PoseError::WrongFrameLength {
                index: 0,
                len: values.len(),
                expected: POSE_DIM,
            });
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.0
    }

    pub fn global_orient(&self) -> &[f32] {
        &self.0[GLOBAL_ORIENT]
    }

    pub fn body_pose(&self) -> &[f32] {
        &self.0[BODY_POSE]
    }

    pub fn left_hand(&self) -> &[f32] {
        &self.0[LEFT_HAND]
    }

    pub fn right_hand(&self) -> &[f32] {
        &self.0[RIGHT_HAND]
    }

    /// Linear interpolation `(1 - alpha) * self + alpha * other`.
    pub fn lerp(&self, other: &PoseFrame, alpha: f32) -> PoseFrame {
        let values = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (1.0 - alpha) * a + alpha * b)
            .collect();
        PoseFrame(values)
    }
}

impl TryFrom<Vec<f32>> for PoseFrame {
    type Error = PoseError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        PoseFrame::new(values)
    }
}

impl From<PoseFrame> for Vec<f32> {
    fn from(frame: PoseFrame) -> Self {
        frame.0
    }
}

/// An ordered list of frames for one word, or several words back to back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseSequence {
    frames: Vec<PoseFrame>,
}

impl PoseSequence {
    pub fn new(frames: Vec<PoseFrame>) -> Self {
        Self { frames }
    }

    /// Build a sequence from raw rows, checking every row's length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, PoseError> {
        let frames = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let len = row.len();
                PoseFrame::new(row).map_err(|_| PoseError::WrongFrameLength {
                    index,
                    len,
                    expected: POSE_DIM,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[PoseFrame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [PoseFrame] {
        &mut self.frames
    }

    pub fn into_frames(self) -> Vec<PoseFrame> {
        self.frames
    }

    /// Fail with [`PoseError::Empty`] when there is nothing to render.
    pub fn ensure_non_empty(&self) -> Result<(), PoseError> {
        if self.frames.is_empty() {
            Err(PoseError::Empty)
        } else {
            Ok(())
        }
    }

    /// Append another sequence, hard cut.
    pub fn extend(&mut self, other: PoseSequence) {
        self.frames.extend(other.frames);
    }
}

impl FromIterator<PoseFrame> for PoseSequence {
    fn from_iter<T: IntoIterator<Item = PoseFrame>>(iter: T) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}
