//! Anatomical joint limits in radians.

use std::collections::HashMap;
use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use super::joints::{Dof, LimitClass};

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp into the interval. NaN passes through untouched.
    pub fn clamp(&self, value: f32) -> f32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Limits for the three DoFs of one joint class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub primary: Interval,
    pub secondary: Interval,
    pub tertiary: Interval,
}

impl JointLimits {
    const fn new(primary: (f32, f32), secondary: (f32, f32), tertiary: (f32, f32)) -> Self {
        Self {
            primary: Interval::new(primary.0, primary.1),
            secondary: Interval::new(secondary.0, secondary.1),
            tertiary: Interval::new(tertiary.0, tertiary.1),
        }
    }

    pub fn for_dof(&self, dof: Dof) -> Interval {
        match dof {
            Dof::Primary => self.primary,
            Dof::Secondary => self.secondary,
            Dof::Tertiary => self.tertiary,
        }
    }
}

/// Per-class angular limits plus a generic fallback clamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointLimitTable {
    #[serde(default)]
    classes: HashMap<LimitClass, JointLimits>,
    #[serde(default = "default_general_clamp")]
    general_clamp: Interval,
}

fn default_general_clamp() -> Interval {
    Interval::new(-PI, PI)
}

impl Default for JointLimitTable {
    fn default() -> Self {
        let classes = HashMap::from([
            // Finger MCP: flexion 0..90 deg, abduction +-20 deg
            (LimitClass::Mcp, JointLimits::new((0.0, 1.57), (-0.35, 0.35), (-0.2, 0.2))),
            // Finger PIP: flexion 0..100 deg, almost no side motion
            (LimitClass::Pip, JointLimits::new((0.0, 1.75), (-0.1, 0.1), (-0.1, 0.1))),
            // Finger DIP: flexion 0..70 deg
            (LimitClass::Dip, JointLimits::new((0.0, 1.22), (-0.05, 0.05), (-0.05, 0.05))),
            (LimitClass::ThumbCmc, JointLimits::new((-0.5, 0.9), (0.0, 1.22), (-0.5, 0.5))),
            (LimitClass::ThumbMcp, JointLimits::new((-0.2, 0.9), (-0.1, 0.1), (-0.2, 0.2))),
            (LimitClass::ThumbIp, JointLimits::new((-0.2, 1.4), (-0.1, 0.1), (-0.1, 0.1))),
        ]);
        Self {
            classes,
            general_clamp: default_general_clamp(),
        }
    }
}

impl JointLimitTable {
    /// Table with no class entries; everything uses the generic clamp.
    pub fn general_only(general_clamp: Interval) -> Self {
        Self {
            classes: HashMap::new(),
            general_clamp,
        }
    }

    /// Interval for a class and DoF, falling back to the generic clamp.
    pub fn interval(&self, class: Option<LimitClass>, dof: Dof) -> Interval {
        class
            .and_then(|c| self.classes.get(&c))
            .map(|limits| limits.for_dof(dof))
            .unwrap_or(self.general_clamp)
    }

    pub fn general_clamp(&self) -> Interval {
        self.general_clamp
    }

    /// Check every interval has `min <= max`.
    pub fn is_well_formed(&self) -> bool {
        let ok = |i: &Interval| i.min <= i.max;
        ok(&self.general_clamp)
            && self.classes.values().all(|l| {
                Dof::ALL.iter().all(|dof| ok(&l.for_dof(*dof)))
            })
    }
}
