//! Evaluator outputs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-frame body model input after hand processing and sanitization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameParams {
    /// Root orientation with the corrective rotation already applied.
    pub global_orient: [f32; 3],
    pub body_pose: Vec<f32>,
    pub left_hand_pose: Vec<f32>,
    pub right_hand_pose: Vec<f32>,
}

/// Raw model output returned when no rendering capability is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawModelOutput {
    pub frame_index: usize,
    pub vertices: Vec<[f32; 3]>,
    pub joints: Vec<[f32; 3]>,
    /// The parameters the model was actually evaluated with.
    pub params: FrameParams,
    /// True when the frame only evaluated after zeroing both hands.
    #[serde(default)]
    pub neutralized_hands: bool,
}
