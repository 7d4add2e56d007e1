//! Joint layout of one 45-value hand pose vector.
//!
//! Fifteen joints, three axis-angle values each, ordered thumb, index,
//! middle, ring, pinky and proximal to distal within a finger.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Degrees of freedom per joint.
pub const DOF_PER_JOINT: usize = 3;

/// Number of joints per hand.
pub const JOINTS_PER_HAND: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub fn is_thumb(self) -> bool {
        matches!(self, Finger::Thumb)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    /// Carpometacarpal (thumb base)
    Cmc,
    /// Metacarpophalangeal
    Mcp,
    /// Proximal interphalangeal
    Pip,
    /// Distal interphalangeal
    Dip,
    /// Interphalangeal (thumb tip)
    Ip,
}

/// Rotational axis of a joint, in parameter order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dof {
    /// Flexion / extension
    Primary,
    /// Abduction or side flex
    Secondary,
    /// Twist
    Tertiary,
}

impl Dof {
    pub const ALL: [Dof; DOF_PER_JOINT] = [Dof::Primary, Dof::Secondary, Dof::Tertiary];

    pub fn index(self) -> usize {
        match self {
            Dof::Primary => 0,
            Dof::Secondary => 1,
            Dof::Tertiary => 2,
        }
    }
}

/// Which limit row of the joint limit table a joint uses.
///
/// Non-thumb fingers share one class per joint type; each thumb joint has
/// its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitClass {
    Mcp,
    Pip,
    Dip,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
}

/// One anatomical joint and its slice of the hand vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointSpec {
    pub finger: Finger,
    pub joint: JointType,
    pub range: Range<usize>,
}

impl JointSpec {
    const fn new(finger: Finger, joint: JointType, start: usize) -> Self {
        Self {
            finger,
            joint,
            range: start..start + DOF_PER_JOINT,
        }
    }

    /// Limit row for this joint, `None` for combinations with no anatomical
    /// entry (those fall back to the generic clamp).
    pub fn limit_class(&self) -> Option<LimitClass> {
        match (self.finger.is_thumb(), self.joint) {
            (true, JointType::Cmc) => Some(LimitClass::ThumbCmc),
            (true, JointType::Mcp) => Some(LimitClass::ThumbMcp),
            (true, JointType::Ip) => Some(LimitClass::ThumbIp),
            (false, JointType::Mcp) => Some(LimitClass::Mcp),
            (false, JointType::Pip) => Some(LimitClass::Pip),
            (false, JointType::Dip) => Some(LimitClass::Dip),
            _ => None,
        }
    }
}

/// The SMPL-X hand joint layout, identical for both hands.
pub static HAND_JOINTS: [JointSpec; JOINTS_PER_HAND] = [
    JointSpec::new(Finger::Thumb, JointType::Cmc, 0),
    JointSpec::new(Finger::Thumb, JointType::Mcp, 3),
    JointSpec::new(Finger::Thumb, JointType::Ip, 6),
    JointSpec::new(Finger::Index, JointType::Mcp, 9),
    JointSpec::new(Finger::Index, JointType::Pip, 12),
    JointSpec::new(Finger::Index, JointType::Dip, 15),
    JointSpec::new(Finger::Middle, JointType::Mcp, 18),
    JointSpec::new(Finger::Middle, JointType::Pip, 21),
    JointSpec::new(Finger::Middle, JointType::Dip, 24),
    JointSpec::new(Finger::Ring, JointType::Mcp, 27),
    JointSpec::new(Finger::Ring, JointType::Pip, 30),
    JointSpec::new(Finger::Ring, JointType::Dip, 33),
    JointSpec::new(Finger::Pinky, JointType::Mcp, 36),
    JointSpec::new(Finger::Pinky, JointType::Pip, 39),
    JointSpec::new(Finger::Pinky, JointType::Dip, 42),
];

/// Look up the joint for a finger and joint type.
pub fn find_joint(finger: Finger, joint: JointType) -> Option<&'static JointSpec> {
    HAND_JOINTS
        .iter()
        .find(|spec| spec.finger == finger && spec.joint == joint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use signpose_models::HAND_DIM;

    #[test]
    fn test_layout_covers_hand_contiguously() {
        let mut next = 0;
        for spec in HAND_JOINTS.iter() {
            assert_eq!(spec.range.start, next, "gap before {:?}", spec);
            assert_eq!(spec.range.len(), DOF_PER_JOINT);
            next = spec.range.end;
        }
        assert_eq!(next, HAND_DIM);
    }

    #[test]
    fn test_every_joint_has_limit_class() {
        assert!(HAND_JOINTS.iter().all(|spec| spec.limit_class().is_some()));
    }

    #[test]
    fn test_non_thumb_fingers_share_classes() {
        for finger in [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky] {
            assert_eq!(
                find_joint(finger, JointType::Pip).unwrap().limit_class(),
                Some(LimitClass::Pip)
            );
        }
        assert_eq!(
            find_joint(Finger::Thumb, JointType::Mcp).unwrap().limit_class(),
            Some(LimitClass::ThumbMcp)
        );
        assert!(find_joint(Finger::Thumb, JointType::Pip).is_none());
    }
}
