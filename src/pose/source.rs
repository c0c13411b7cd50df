//! Pose sources
//!
//! A `PoseSource` hands the broadcaster one sample per tick. The bundled
//! `RandomPoseSource` draws every joint independently and uniformly from its
//! configured range; a bridge to a real robot driver implements the same trait.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::pose::{JointSpec, PoseSample};

/// Produces joint-state samples on demand.
pub trait PoseSource: Send {
    fn generate_sample(&mut self) -> PoseSample;
}

impl<F> PoseSource for F
where
    F: FnMut() -> PoseSample + Send,
{
    fn generate_sample(&mut self) -> PoseSample {
        self()
    }
}

/// Uniform pseudo-random joint generator.
///
/// Successive samples are independent; no rate limit is applied to joint deltas.
pub struct RandomPoseSource {
    joints: Vec<JointSpec>,
    rng: StdRng,
}

impl RandomPoseSource {
    /// Creates a source seeded from the operating system.
    pub fn new(joints: Vec<JointSpec>) -> Self {
        Self::with_rng(joints, StdRng::from_os_rng())
    }

    /// Creates a reproducible source.
    pub fn with_seed(joints: Vec<JointSpec>, seed: u64) -> Self {
        Self::with_rng(joints, StdRng::seed_from_u64(seed))
    }

    fn with_rng(joints: Vec<JointSpec>, rng: StdRng) -> Self {
        debug_assert!(joints.iter().all(|j| j.min <= j.max));
        Self { joints, rng }
    }

    pub fn joints(&self) -> &[JointSpec] {
        &self.joints
    }
}

impl PoseSource for RandomPoseSource {
    fn generate_sample(&mut self) -> PoseSample {
        let rng = &mut self.rng;
        self.joints
            .iter()
            .map(|joint| (joint.name.clone(), rng.random_range(joint.min..=joint.max)))
            .collect()
    }
}
