//! Fixed layout of a 156-value SMPL-X pose frame.
//!
//! Every consumer indexes frames through these ranges; the order must never
//! change.

use std::ops::Range;

/// Total parameters per frame.
pub const POSE_DIM: usize = 156;

/// Parameters per hand (15 joints x 3 axis-angle components).
pub const HAND_DIM: usize = 45;

/// Global (root) orientation, axis-angle.
pub const GLOBAL_ORIENT: Range<usize> = 0..3;

/// Body pose: 21 joints x 3.
pub const BODY_POSE: Range<usize> = 3..66;

/// Left hand pose: 15 joints x 3.
pub const LEFT_HAND: Range<usize> = 66..111;

/// Right hand pose: 15 joints x 3.
pub const RIGHT_HAND: Range<usize> = 111..156;

/// Shape coefficients fed to the body model (always zero).
pub const NUM_BETAS: usize = 10;

/// Expression coefficients fed to the body model (always zero).
pub const NUM_EXPRESSION_COEFFS: usize = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_are_contiguous() {
        assert_eq!(GLOBAL_ORIENT.start, 0);
        assert_eq!(GLOBAL_ORIENT.end, BODY_POSE.start);
        assert_eq!(BODY_POSE.end, LEFT_HAND.start);
        assert_eq!(LEFT_HAND.end, RIGHT_HAND.start);
        assert_eq!(RIGHT_HAND.end, POSE_DIM);
        assert_eq!(LEFT_HAND.len(), HAND_DIM);
        assert_eq!(RIGHT_HAND.len(), HAND_DIM);
    }
}
