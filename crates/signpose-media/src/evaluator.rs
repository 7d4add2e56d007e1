//! Per-frame body model evaluation.
//!
//! A request moves through `Idle -> PerFrameEvaluate(0..N) -> Encode -> Done`.
//! This module owns the first two states: hand channels are smoothed and
//! clamped across the whole sequence, then every frame is sanitized, posed
//! and (in rasterize mode) rendered.

use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use ndarray::Array2;
use serde::Serialize;
use tracing::{debug, info, warn};

use signpose_models::{
    FrameParams, PoseSequence, RawModelOutput, BODY_POSE, GLOBAL_ORIENT, HAND_DIM, LEFT_HAND,
    RIGHT_HAND,
};

use crate::body_model::{BodyMesh, BodyModel, BodyModelInput};
use crate::error::{MediaError, MediaResult};
use crate::hand::HandPoseProcessor;
use crate::metrics;
use crate::render::RenderContext;

/// What the evaluator produces, chosen at construction.
#[derive(Debug, Clone)]
pub enum OutputMode {
    /// Render every frame for encoding.
    Rasterize(RenderContext),
    /// No renderer available: return the first frame's model output.
    VerticesOnly,
}

impl OutputMode {
    pub fn name(&self) -> &'static str {
        match self {
            OutputMode::Rasterize(_) => "rasterize",
            OutputMode::VerticesOnly => "vertices_only",
        }
    }
}

/// Per-sequence counters surfaced to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationReport {
    pub frames: usize,
    /// Frames that only evaluated after zeroing both hands.
    pub neutralized_frames: usize,
    /// Non-finite hand entries replaced by zero.
    pub sanitized_entries: usize,
}

#[derive(Debug)]
pub enum EvaluationOutput {
    Frames {
        frames: Vec<RgbImage>,
        report: EvaluationReport,
    },
    Raw(Box<RawModelOutput>),
}

/// Frame parameters ready for the body model.
#[derive(Debug, Clone, Default)]
pub struct PreparedSequence {
    pub frames: Vec<FrameParams>,
    pub sanitized_entries: usize,
}

pub struct PoseEvaluator {
    model: Arc<dyn BodyModel>,
    hands: HandPoseProcessor,
    mode: OutputMode,
}

impl PoseEvaluator {
    pub fn new(model: Arc<dyn BodyModel>, hands: HandPoseProcessor, mode: OutputMode) -> Self {
        info!(mode = mode.name(), sigma = hands.smoother().sigma(), "Created pose evaluator");
        Self { model, hands, mode }
    }

    pub fn mode(&self) -> &OutputMode {
        &self.mode
    }

    /// Split channels, process hands and sanitize every frame.
    pub fn prepare(&self, sequence: &PoseSequence) -> MediaResult<PreparedSequence> {
        sequence.ensure_non_empty()?;
        let n = sequence.len();

        let left = self.hands.process(hand_channel(sequence, LEFT_HAND.start).view());
        let right = self.hands.process(hand_channel(sequence, RIGHT_HAND.start).view());

        let mut prepared = PreparedSequence {
            frames: Vec::with_capacity(n),
            sanitized_entries: 0,
        };

        for (i, frame) in sequence.frames().iter().enumerate() {
            let values = frame.as_slice();
            let mut global_orient = [0.0f32; 3];
            global_orient.copy_from_slice(&values[GLOBAL_ORIENT]);
            // The dataset is upside down relative to the camera.
            global_orient[0] += PI;

            let mut left_hand_pose = left.row(i).to_vec();
            let mut right_hand_pose = right.row(i).to_vec();
            for (hand, pose) in [("left", &mut left_hand_pose), ("right", &mut right_hand_pose)] {
                let replaced = sanitize(pose);
                if replaced > 0 {
                    warn!(frame = i, hand, entries = replaced, "Non-finite hand values replaced with zero");
                    metrics::record_sanitized(hand, replaced);
                    prepared.sanitized_entries += replaced;
                }
            }

            prepared.frames.push(FrameParams {
                global_orient,
                body_pose: values[BODY_POSE].to_vec(),
                left_hand_pose,
                right_hand_pose,
            });
        }

        Ok(prepared)
    }

    /// Evaluate one frame, retrying once with neutral hands.
    ///
    /// Returns the mesh and whether the retry was needed.
    pub fn evaluate_frame(&self, index: usize, params: &FrameParams) -> MediaResult<(BodyMesh, bool)> {
        let input = BodyModelInput::from_params(params);
        match self.model.evaluate(&input) {
            Ok(mesh) => Ok((mesh, false)),
            Err(first) => {
                warn!(frame = index, error = %first, "Model evaluation failed, retrying with neutral hands");
                metrics::record_frame_retry();
                match self.model.evaluate(&input.with_neutral_hands()) {
                    Ok(mesh) => Ok((mesh, true)),
                    Err(second) => {
                        metrics::record_frame_failure();
                        Err(MediaError::FrameEvaluation {
                            frame: index,
                            source: Box::new(second),
                        })
                    }
                }
            }
        }
    }

    /// Run the per-frame loop for a whole sequence.
    pub fn evaluate(&self, sequence: &PoseSequence) -> MediaResult<EvaluationOutput> {
        let start = Instant::now();
        let prepared = self.prepare(sequence)?;
        let total = prepared.frames.len();
        debug!(state = "per_frame_evaluate", frames = total, "Evaluating sequence");

        let output = match &self.mode {
            OutputMode::VerticesOnly => {
                let mut params = prepared.frames[0].clone();
                let (mesh, retried) = self.evaluate_frame(0, &params)?;
                if retried {
                    params.left_hand_pose.fill(0.0);
                    params.right_hand_pose.fill(0.0);
                }
                metrics::record_frames_evaluated(1);
                info!(
                    frames = total,
                    neutralized = retried,
                    "No renderer configured, returning first frame output"
                );
                EvaluationOutput::Raw(Box::new(RawModelOutput {
                    frame_index: 0,
                    vertices: mesh.vertex_rows(),
                    joints: mesh.joint_rows(),
                    params,
                    neutralized_hands: retried,
                }))
            }
            OutputMode::Rasterize(context) => {
                let faces = self.model.faces();
                let mut frames = Vec::with_capacity(total);
                let mut report = EvaluationReport {
                    frames: total,
                    neutralized_frames: 0,
                    sanitized_entries: prepared.sanitized_entries,
                };

                for (i, params) in prepared.frames.iter().enumerate() {
                    let (mesh, retried) = self.evaluate_frame(i, params)?;
                    if retried {
                        report.neutralized_frames += 1;
                    }
                    frames.push(context.render(&mesh, faces)?);
                }
                metrics::record_frames_evaluated(total);

                if report.neutralized_frames > 0 {
                    warn!(
                        neutralized = report.neutralized_frames,
                        frames = total,
                        "Some frames were rendered with neutral hands"
                    );
                }
                EvaluationOutput::Frames { frames, report }
            }
        };

        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_evaluation_duration(elapsed);
        debug!(state = "evaluated", frames = total, elapsed_secs = elapsed, "Sequence evaluated");
        Ok(output)
    }
}

impl std::fmt::Debug for PoseEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseEvaluator")
            .field("hands", &self.hands)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

fn hand_channel(sequence: &PoseSequence, offset: usize) -> Array2<f32> {
    let frames = sequence.frames();
    Array2::from_shape_fn((frames.len(), HAND_DIM), |(i, j)| {
        frames[i].as_slice()[offset + j]
    })
}

/// Zero every non-finite entry, returning how many were replaced.
fn sanitize(values: &mut [f32]) -> usize {
    let mut replaced = 0;
    for v in values.iter_mut().filter(|v| !v.is_finite()) {
        *v = 0.0;
        replaced += 1;
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body_model::tests::chain_model;
    use crate::render::SoftwareRasterizer;
    use signpose_models::{PoseFrame, POSE_DIM};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails whenever a hand value is non-zero, counting calls.
    struct HandSensitiveModel {
        faces: Array2<u32>,
        calls: AtomicUsize,
        always_fail: bool,
    }

    impl HandSensitiveModel {
        fn new(always_fail: bool) -> Self {
            Self {
                faces: Array2::zeros((0, 3)),
                calls: AtomicUsize::new(0),
                always_fail,
            }
        }
    }

    impl BodyModel for HandSensitiveModel {
        fn evaluate(&self, input: &BodyModelInput) -> MediaResult<BodyMesh> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let hands_zero = input
                .left_hand_pose
                .iter()
                .chain(&input.right_hand_pose)
                .all(|v| *v == 0.0);
            if self.always_fail || !hands_zero {
                return Err(MediaError::model_evaluation("bad hands"));
            }
            Ok(BodyMesh {
                vertices: Array2::zeros((4, 3)),
                joints: Array2::zeros((55, 3)),
            })
        }

        fn faces(&self) -> &Array2<u32> {
            &self.faces
        }
    }

    fn sequence(frames: usize, hand_value: f32) -> PoseSequence {
        let mut rows = vec![vec![0.0f32; POSE_DIM]; frames];
        for row in rows.iter_mut() {
            for v in &mut row[LEFT_HAND] {
                *v = hand_value;
            }
        }
        PoseSequence::from_rows(rows).unwrap()
    }

    fn rasterizing(model: Arc<dyn BodyModel>) -> PoseEvaluator {
        let raster = SoftwareRasterizer::new(32, 24).unwrap();
        PoseEvaluator::new(
            model,
            HandPoseProcessor::default(),
            OutputMode::Rasterize(RenderContext::new(Arc::new(raster))),
        )
    }

    #[test]
    fn test_prepare_applies_corrective_rotation() {
        let evaluator = rasterizing(Arc::new(HandSensitiveModel::new(false)));
        let prepared = evaluator.prepare(&sequence(3, 0.0)).unwrap();
        assert_eq!(prepared.frames.len(), 3);
        assert!((prepared.frames[0].global_orient[0] - PI).abs() < 1e-6);
        assert_eq!(prepared.frames[0].body_pose.len(), 63);
        assert_eq!(prepared.frames[0].left_hand_pose.len(), HAND_DIM);
    }

    #[test]
    fn test_nan_sanitized_only_where_present() {
        let evaluator = rasterizing(Arc::new(HandSensitiveModel::new(false)));
        // Thumb MCP flexion, limits [-0.2, 0.9].
        let mut rows = vec![vec![0.0f32; POSE_DIM]; 3];
        for row in rows.iter_mut() {
            row[RIGHT_HAND.start + 3] = 0.2;
        }
        rows[1][RIGHT_HAND.start + 3] = f32::NAN;
        let seq = PoseSequence::new(rows.into_iter().map(|r| PoseFrame::new(r).unwrap()).collect());

        let prepared = evaluator.prepare(&seq).unwrap();
        assert_eq!(prepared.sanitized_entries, 1);
        assert_eq!(prepared.frames[1].right_hand_pose[3], 0.0);
        assert!((prepared.frames[0].right_hand_pose[3] - 0.2).abs() < 1e-6);
        assert!((prepared.frames[2].right_hand_pose[3] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_retry_with_neutral_hands() {
        let evaluator = rasterizing(Arc::new(HandSensitiveModel::new(false)));
        match evaluator.evaluate(&sequence(1, 0.1)).unwrap() {
            EvaluationOutput::Frames { frames, report } => {
                assert_eq!(frames.len(), 1);
                assert_eq!(report.neutralized_frames, 1);
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_retry_failure_aborts_with_frame_index() {
        let evaluator = rasterizing(Arc::new(HandSensitiveModel::new(true)));
        let err = evaluator.evaluate(&sequence(4, 0.0)).unwrap_err();
        assert!(matches!(err, MediaError::FrameEvaluation { frame: 0, .. }));
    }

    #[test]
    fn test_vertices_only_stops_after_first_frame() {
        let model = Arc::new(HandSensitiveModel::new(false));
        let evaluator = PoseEvaluator::new(
            model.clone(),
            HandPoseProcessor::default(),
            OutputMode::VerticesOnly,
        );
        match evaluator.evaluate(&sequence(5, 0.0)).unwrap() {
            EvaluationOutput::Raw(raw) => {
                assert_eq!(raw.frame_index, 0);
                assert_eq!(raw.vertices.len(), 4);
                assert_eq!(raw.joints.len(), 55);
                assert!(!raw.neutralized_hands);
            }
            other => panic!("unexpected output {:?}", other),
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_vertices_only_reports_neutralized_hands() {
        let evaluator = PoseEvaluator::new(
            Arc::new(HandSensitiveModel::new(false)),
            HandPoseProcessor::default(),
            OutputMode::VerticesOnly,
        );
        match evaluator.evaluate(&sequence(3, 0.1)).unwrap() {
            EvaluationOutput::Raw(raw) => {
                assert!(raw.neutralized_hands);
                assert!(raw.params.left_hand_pose.iter().all(|v| *v == 0.0));
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_rasterize_renders_every_frame() {
        let evaluator = rasterizing(Arc::new(chain_model()));
        match evaluator.evaluate(&sequence(6, 0.05)).unwrap() {
            EvaluationOutput::Frames { frames, report } => {
                assert_eq!(frames.len(), 6);
                assert_eq!(report.frames, 6);
                assert_eq!(report.neutralized_frames, 0);
                assert_eq!(frames[0].dimensions(), (32, 24));
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let evaluator = rasterizing(Arc::new(HandSensitiveModel::new(false)));
        assert!(evaluator.evaluate(&PoseSequence::default()).is_err());
    }
}
