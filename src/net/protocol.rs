//! Wire messages between the authority and its clients.
//!
//! Vectors travel as `[f32; 3]`; messages are JSON-encoded.

use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::components::{MovementMode, NetId};

pub type WireVec = [f32; 3];

/// Hook mutations the controlling instance asks the authority to perform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HookRequest {
    Start { valid_target: bool },
    SetTarget { location: WireVec },
    ArmLocation { location: WireVec },
    StartTravel,
    TravelVelocity { direction: WireVec },
    Damage { victim: NetId },
    Collision,
    End { velocity: WireVec },
}

impl HookRequest {
    /// Every vector payload is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::SetTarget { location } | Self::ArmLocation { location } => finite(location),
            Self::TravelVelocity { direction } => finite(direction),
            Self::End { velocity } => finite(velocity),
            _ => true,
        }
    }
}

fn finite(v: &WireVec) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Outcomes the authority announces to every instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HookNotify {
    Started { valid_target: bool },
    TravelStarted { target_location: WireVec },
    Collision { location: WireVec, travel_distance: f32 },
    Ended,
}

/// Replicated hook fields of one owner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HookReplication {
    pub target_location: WireVec,
    pub active: bool,
    pub arm_location: WireVec,
    pub traveling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSnapshot {
    pub id: NetId,
    pub translation: WireVec,
    pub velocity: WireVec,
    pub mode: MovementMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    Hello { tuning_fingerprint: String },
    Hook { owner: NetId, request: HookRequest },
    Intent { id: NetId, move_dir: WireVec },
    CancelHook { owner: NetId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    Welcome { tuning_matches: bool },
    Hook { owner: NetId, notify: HookNotify },
    Replicate { owner: NetId, state: HookReplication },
    Motion(Vec<MotionSnapshot>),
    CancelHook { owner: NetId },
}

/// A hook request on its way to the authority.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct HookRequestMessage {
    pub owner: NetId,
    pub request: HookRequest,
}

/// A hook notification to be handled on this instance.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct HookNotifyMessage {
    pub owner: NetId,
    pub notify: HookNotify,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(message).map_err(ProtocolError::Encode)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(bytes).map_err(ProtocolError::Decode)
}
