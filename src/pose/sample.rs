//! Module `sample`
//!
//! Defines `PoseSample`, one snapshot of joint angles keyed by joint name,
//! and `JointSpec`, the configured range a joint is sampled from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// One joint-state snapshot: joint name to angle in radians.
///
/// Keys are kept sorted so two equal samples always encode to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseSample {
    positions: BTreeMap<String, f64>,
}

impl PoseSample {
    /// Returns the angle of `joint`, if the sample carries it.
    pub fn get(&self, joint: &str) -> Option<f64> {
        self.positions.get(joint).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterates joints in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.positions.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn joint_names(&self) -> impl Iterator<Item = &str> {
        self.positions.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for PoseSample {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            positions: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

/// A named joint and the inclusive range its angle is drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    pub name: String,
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
}

fn default_min() -> f64 {
    -PI
}

fn default_max() -> f64 {
    PI
}

impl JointSpec {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }

    /// A joint that may take any angle in [-π, π].
    pub fn full_turn(name: impl Into<String>) -> Self {
        Self::new(name, default_min(), default_max())
    }

    /// Whether `value` lies within this joint's range.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// The joints published when nothing else is configured.
pub fn default_joints() -> Vec<JointSpec> {
    [
        "panda_joint1",
        "panda_joint2",
        "panda_joint4",
        "panda_joint6",
        "panda_joint7",
    ]
    .into_iter()
    .map(JointSpec::full_turn)
    .collect()
}
