//! Wire format for broadcast snapshots.
//!
//! Every frame is one UTF-8 JSON document:
//! `{"jointPositions":{"<joint>":<radians>,...}}`

use serde::{Deserialize, Serialize};

use crate::error::SerializationError;
use crate::pose::PoseSample;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    #[serde(rename = "jointPositions")]
    pub joint_positions: PoseSample,
}

impl BroadcastMessage {
    pub fn new(joint_positions: PoseSample) -> Self {
        Self { joint_positions }
    }

    /// Encodes the message as a JSON text frame.
    ///
    /// Non-finite angles are rejected rather than written as `null`.
    pub fn encode(&self) -> Result<String, SerializationError> {
        if let Some((joint, value)) = self.joint_positions.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SerializationError::NonFinite {
                joint: joint.to_string(),
                value,
            });
        }
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, SerializationError> {
        Ok(serde_json::from_str(text)?)
    }
}
