use bevy::prelude::*;

use super::protocol::{HookReplication, MotionSnapshot, ServerMessage, encode};
use super::transport::ServerPeers;
use crate::game::components::*;

/// Authority-written hook fields, mirrored to every instance.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct HookReplica {
    pub target_location: Vec3,
    pub active: bool,
    pub arm_location: Vec3,
    pub traveling: bool,
    /// Owner position when a shot with a valid target started. Authority only.
    pub shot_origin: Vec3,
}

impl HookReplica {
    pub fn to_wire(&self) -> HookReplication {
        HookReplication {
            target_location: self.target_location.to_array(),
            active: self.active,
            arm_location: self.arm_location.to_array(),
            traveling: self.traveling,
        }
    }

    pub fn apply_wire(&mut self, state: &HookReplication) {
        self.target_location = Vec3::from_array(state.target_location);
        self.active = state.active;
        self.arm_location = Vec3::from_array(state.arm_location);
        self.traveling = state.traveling;
    }
}

/// Last hook state broadcast for an owner.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LastSentReplica(pub Option<HookReplication>);

pub fn motion_snapshot(id: NetId, transform: &Transform, velocity: &Velocity, movement: &Movement) -> MotionSnapshot {
    MotionSnapshot {
        id,
        translation: transform.translation.to_array(),
        velocity: velocity.0.to_array(),
        mode: movement.mode,
    }
}

pub fn apply_motion(snapshot: &MotionSnapshot, transform: &mut Transform, velocity: &mut Velocity, movement: &mut Movement) {
    transform.translation = Vec3::from_array(snapshot.translation);
    velocity.0 = Vec3::from_array(snapshot.velocity);
    movement.mode = snapshot.mode;
}

pub(crate) fn broadcast(peers: &ServerPeers, message: &ServerMessage) {
    match encode(message) {
        Ok(bytes) => peers.broadcast(&bytes),
        Err(e) => warn!("[Net] {e}"),
    }
}

/// Server: send hook state that changed since the last broadcast, then
/// every character's motion.
pub fn broadcast_replication(
    peers: Res<ServerPeers>,
    mut owners: Query<(&NetId, &HookReplica, &mut LastSentReplica)>,
    bodies: Query<(&NetId, &Transform, &Velocity, &Movement), With<PlayerCharacter>>,
) {
    for (id, replica, mut last_sent) in &mut owners {
        let state = replica.to_wire();
        if last_sent.0 == Some(state) {
            continue;
        }
        broadcast(&peers, &ServerMessage::Replicate { owner: *id, state });
        last_sent.0 = Some(state);
    }

    let snapshots: Vec<MotionSnapshot> = bodies
        .iter()
        .map(|(id, transform, velocity, movement)| motion_snapshot(*id, transform, velocity, movement))
        .collect();
    if !snapshots.is_empty() {
        broadcast(&peers, &ServerMessage::Motion(snapshots));
    }
}
