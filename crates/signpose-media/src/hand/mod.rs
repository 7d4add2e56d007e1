//! Hand articulation processing.
//!
//! A hand channel (`[N, 45]`) is first smoothed across frames, then every
//! frame is clamped to anatomical joint limits.

pub mod constraints;
pub mod joints;
pub mod limits;
pub mod smoother;

pub use constraints::AnatomicalConstraints;
pub use joints::{find_joint, Dof, Finger, JointSpec, JointType, LimitClass, HAND_JOINTS};
pub use limits::{Interval, JointLimitTable, JointLimits};
pub use smoother::{TemporalSmoother, DEFAULT_SIGMA};

use ndarray::{Array2, ArrayView2};

/// Smoothing followed by per-frame clamping, shared by both hands.
#[derive(Debug, Clone, Default)]
pub struct HandPoseProcessor {
    smoother: TemporalSmoother,
    constraints: AnatomicalConstraints,
}

impl HandPoseProcessor {
    pub fn new(smoother: TemporalSmoother, constraints: AnatomicalConstraints) -> Self {
        Self {
            smoother,
            constraints,
        }
    }

    pub fn smoother(&self) -> &TemporalSmoother {
        &self.smoother
    }

    pub fn constraints(&self) -> &AnatomicalConstraints {
        &self.constraints
    }

    /// Process one hand's full sequence.
    pub fn process(&self, hands: ArrayView2<'_, f32>) -> Array2<f32> {
        let smoothed = self.smoother.smooth(hands);
        self.constraints.apply_sequence(smoothed.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Axis;
    use signpose_models::HAND_DIM;

    #[test]
    fn test_process_smooths_then_clamps() {
        let processor = HandPoseProcessor::default();
        let hands = Array2::from_shape_fn((5, HAND_DIM), |(i, _)| if i == 2 { 4.0 } else { -4.0 });
        let out = processor.process(hands.view());
        assert_eq!(out.dim(), (5, HAND_DIM));
        for row in out.axis_iter(Axis(0)) {
            assert!(processor.constraints().is_within_limits(row));
        }
    }
}
