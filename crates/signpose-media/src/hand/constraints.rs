//! Per-frame anatomical clamping of hand poses.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::joints::{Dof, HAND_JOINTS};
use super::limits::JointLimitTable;

/// Clips hand pose parameters into anatomically plausible ranges.
///
/// Clamping is a projection: it never reorders values, never fails, and
/// applying it twice gives the same result as applying it once.
#[derive(Debug, Clone, Default)]
pub struct AnatomicalConstraints {
    limits: JointLimitTable,
}

impl AnatomicalConstraints {
    pub fn new(limits: JointLimitTable) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &JointLimitTable {
        &self.limits
    }

    /// Clamp one 45-value hand frame into a new array.
    pub fn apply_frame(&self, hand: ArrayView1<'_, f32>) -> Array1<f32> {
        debug_assert_eq!(hand.len(), signpose_models::HAND_DIM);
        let mut constrained = hand.to_owned();

        for spec in HAND_JOINTS.iter() {
            if spec.range.end > constrained.len() {
                continue;
            }
            let class = spec.limit_class();
            for dof in Dof::ALL {
                let idx = spec.range.start + dof.index();
                constrained[idx] = self.limits.interval(class, dof).clamp(constrained[idx]);
            }
        }

        constrained
    }

    /// Clamp every frame of an `[N, 45]` hand sequence.
    pub fn apply_sequence(&self, hands: ArrayView2<'_, f32>) -> Array2<f32> {
        let mut out = Array2::zeros(hands.raw_dim());
        for (src, mut dst) in hands.axis_iter(Axis(0)).zip(out.axis_iter_mut(Axis(0))) {
            dst.assign(&self.apply_frame(src));
        }
        out
    }

    /// True when every finite value lies inside its joint's interval.
    pub fn is_within_limits(&self, hand: ArrayView1<'_, f32>) -> bool {
        HAND_JOINTS.iter().all(|spec| {
            let class = spec.limit_class();
            Dof::ALL.iter().all(|dof| {
                let value = hand[spec.range.start + dof.index()];
                !value.is_finite() || self.limits.interval(class, *dof).contains(value)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::joints::{find_joint, Finger, JointType};
    use ndarray::Array1;
    use signpose_models::HAND_DIM;

    fn wild_hand() -> Array1<f32> {
        Array1::from_iter((0..HAND_DIM).map(|i| if i % 2 == 0 { 5.0 } else { -5.0 }))
    }

    #[test]
    fn test_output_within_limits() {
        let engine = AnatomicalConstraints::default();
        let hand = wild_hand();
        assert!(!engine.is_within_limits(hand.view()));
        let clamped = engine.apply_frame(hand.view());
        assert!(engine.is_within_limits(clamped.view()));
    }

    #[test]
    fn test_idempotent() {
        let engine = AnatomicalConstraints::default();
        let once = engine.apply_frame(wild_hand().view());
        let twice = engine.apply_frame(once.view());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_input_not_mutated_and_in_range_values_kept() {
        let engine = AnatomicalConstraints::default();
        let hand = Array1::from_elem(HAND_DIM, 0.05f32);
        let copy = hand.clone();
        let clamped = engine.apply_frame(hand.view());
        assert_eq!(hand, copy);

        // Thumb CMC secondary lower bound is 0.0, so 0.05 is kept.
        let cmc = find_joint(Finger::Thumb, JointType::Cmc).unwrap();
        assert_eq!(clamped[cmc.range.start + 1], 0.05);
        // Index MCP flexion [0, 1.57] keeps 0.05 as well.
        let mcp = find_joint(Finger::Index, JointType::Mcp).unwrap();
        assert_eq!(clamped[mcp.range.start], 0.05);
    }

    #[test]
    fn test_thumb_and_finger_use_distinct_limits() {
        let engine = AnatomicalConstraints::default();
        let hand = Array1::from_elem(HAND_DIM, -1.0f32);
        let clamped = engine.apply_frame(hand.view());
        // Thumb CMC flexion floor is -0.5, finger MCP flexion floor is 0.0.
        assert_eq!(clamped[0], -0.5);
        assert_eq!(clamped[9], 0.0);
        // DIP side flex floor.
        assert_eq!(clamped[16], -0.05);
    }

    #[test]
    fn test_nan_passes_through() {
        let engine = AnatomicalConstraints::default();
        let mut hand = Array1::zeros(HAND_DIM);
        hand[4] = f32::NAN;
        let clamped = engine.apply_frame(hand.view());
        assert!(clamped[4].is_nan());
    }

    #[test]
    fn test_apply_sequence_shape() {
        let engine = AnatomicalConstraints::default();
        let seq = Array2::from_elem((4, HAND_DIM), 3.0f32);
        let out = engine.apply_sequence(seq.view());
        assert_eq!(out.dim(), (4, HAND_DIM));
        for row in out.axis_iter(Axis(0)) {
            assert!(engine.is_within_limits(row));
        }
    }
}
