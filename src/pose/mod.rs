//! Pose data: samples, their wire message, and the sources producing them.

pub mod message;
pub mod sample;
pub mod source;

pub use message::BroadcastMessage;
pub use sample::{JointSpec, PoseSample, default_joints};
pub use source::{PoseSource, RandomPoseSource};
