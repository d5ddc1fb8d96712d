//! Server-side application of hook requests.
//!
//! Every physical outcome of a hook shot (velocity, gravity, movement mode,
//! invulnerability, damage) is written here and nowhere else. Requests that
//! arrive on a non-authoritative instance, or that fail validation, are
//! refused and logged.

use bevy::prelude::*;
use thiserror::Error;

use super::protocol::{HookNotify, HookNotifyMessage, HookRequest, HookRequestMessage};
use super::replication::HookReplica;
use super::role::NetRole;
use crate::config::tuning::{HookTuning, Tuning};
use crate::game::components::*;
use crate::game::events::GameEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthorityError {
    #[error("instance has no authority")]
    NotAuthority,
    #[error("unknown hook owner {0:?}")]
    UnknownOwner(NetId),
    #[error("hook shot is not active")]
    NotActive,
    #[error("hook shot is not traveling")]
    NotTraveling,
    #[error("hook shot already active")]
    AlreadyActive,
    #[error("request carries a non-finite vector")]
    InvalidPayload,
    #[error("{0:?} cannot be damaged by hook travel")]
    IllegalVictim(NetId),
}

/// Mutable view of a hook owner's physical state.
pub struct OwnerBody<'a> {
    pub position: Vec3,
    pub velocity: &'a mut Velocity,
    pub movement: &'a mut Movement,
    pub can_be_damaged: &'a mut CanBeDamaged,
    pub replica: &'a mut HookReplica,
}

/// What a damage request points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Victim {
    Unknown,
    Owner,
    Player,
    Actor(Entity),
}

/// Result of an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Applied {
    pub notify: Option<HookNotify>,
    pub damage: Option<(Entity, f32)>,
}

impl Applied {
    fn notify(notify: HookNotify) -> Self {
        Self {
            notify: Some(notify),
            damage: None,
        }
    }
}

pub struct HookAuthority<'a> {
    pub role: NetRole,
    pub tuning: &'a HookTuning,
}

impl HookAuthority<'_> {
    fn ensure_authority(&self) -> Result<(), AuthorityError> {
        if self.role.has_authority() {
            Ok(())
        } else {
            Err(AuthorityError::NotAuthority)
        }
    }

    fn ensure_active(&self, body: &OwnerBody) -> Result<(), AuthorityError> {
        self.ensure_authority()?;
        if body.replica.active {
            Ok(())
        } else {
            Err(AuthorityError::NotActive)
        }
    }

    fn ensure_traveling(&self, body: &OwnerBody) -> Result<(), AuthorityError> {
        self.ensure_authority()?;
        if body.replica.traveling {
            Ok(())
        } else {
            Err(AuthorityError::NotTraveling)
        }
    }

    /// Validate and apply one request.
    pub fn apply(
        &self,
        body: &mut OwnerBody,
        request: &HookRequest,
        victim: Victim,
    ) -> Result<Applied, AuthorityError> {
        self.ensure_authority()?;
        if !request.is_finite() {
            return Err(AuthorityError::InvalidPayload);
        }
        match *request {
            HookRequest::Start { valid_target } => {
                self.apply_start(body, valid_target).map(Applied::notify)
            }
            HookRequest::SetTarget { location } => {
                self.apply_set_target(body, Vec3::from_array(location))?;
                Ok(Applied::default())
            }
            HookRequest::ArmLocation { location } => {
                self.apply_arm_location(body, Vec3::from_array(location))?;
                Ok(Applied::default())
            }
            HookRequest::StartTravel => self.apply_start_travel(body).map(Applied::notify),
            HookRequest::TravelVelocity { direction } => {
                self.apply_travel_velocity(body, Vec3::from_array(direction))?;
                Ok(Applied::default())
            }
            HookRequest::Damage { victim: id } => {
                let damage = self.apply_damage(body, id, victim)?;
                Ok(Applied {
                    notify: None,
                    damage: Some(damage),
                })
            }
            HookRequest::Collision => self.apply_collision(body).map(Applied::notify),
            HookRequest::End { velocity } => {
                self.apply_end(body, Vec3::from_array(velocity)).map(Applied::notify)
            }
        }
    }

    pub fn apply_start(&self, body: &mut OwnerBody, valid_target: bool) -> Result<HookNotify, AuthorityError> {
        self.ensure_authority()?;
        if body.replica.active {
            return Err(AuthorityError::AlreadyActive);
        }
        body.replica.arm_location = body.position;
        body.replica.active = true;
        if valid_target {
            if body.velocity.0.y < 0.0 {
                body.movement.mode = MovementMode::Flying;
            }
            body.movement.gravity_scale = 0.0;
            body.velocity.0 = Vec3::ZERO;
            body.replica.shot_origin = body.position;
        }
        Ok(HookNotify::Started { valid_target })
    }

    pub fn apply_set_target(&self, body: &mut OwnerBody, location: Vec3) -> Result<(), AuthorityError> {
        self.ensure_authority()?;
        body.replica.target_location = location;
        Ok(())
    }

    pub fn apply_arm_location(&self, body: &mut OwnerBody, location: Vec3) -> Result<(), AuthorityError> {
        self.ensure_active(body)?;
        body.replica.arm_location = location;
        Ok(())
    }

    pub fn apply_start_travel(&self, body: &mut OwnerBody) -> Result<HookNotify, AuthorityError> {
        self.ensure_active(body)?;
        body.can_be_damaged.0 = false;
        body.replica.traveling = true;
        body.movement.mode = MovementMode::Flying;
        Ok(HookNotify::TravelStarted {
            target_location: body.replica.target_location.to_array(),
        })
    }

    pub fn apply_travel_velocity(&self, body: &mut OwnerBody, direction: Vec3) -> Result<(), AuthorityError> {
        self.ensure_traveling(body)?;
        body.velocity.0 = direction.normalize_or_zero() * self.tuning.travel_speed;
        Ok(())
    }

    pub fn apply_damage(
        &self,
        body: &mut OwnerBody,
        id: NetId,
        victim: Victim,
    ) -> Result<(Entity, f32), AuthorityError> {
        self.ensure_traveling(body)?;
        match victim {
            Victim::Actor(entity) => Ok((entity, self.tuning.travel_damage)),
            Victim::Unknown | Victim::Owner | Victim::Player => Err(AuthorityError::IllegalVictim(id)),
        }
    }

    pub fn apply_collision(&self, body: &mut OwnerBody) -> Result<HookNotify, AuthorityError> {
        self.ensure_traveling(body)?;
        body.velocity.0 = Vec3::ZERO;
        Ok(HookNotify::Collision {
            location: body.position.to_array(),
            travel_distance: body.replica.shot_origin.distance(body.position),
        })
    }

    pub fn apply_end(&self, body: &mut OwnerBody, velocity: Vec3) -> Result<HookNotify, AuthorityError> {
        self.ensure_active(body)?;
        let max_speed = self.tuning.travel_speed * self.tuning.max_exit_speed_factor;
        body.movement.gravity_scale = body.movement.default_gravity_scale;
        body.movement.mode = MovementMode::Walking;
        body.velocity.0 = velocity.clamp_length_max(max_speed);
        body.replica.active = false;
        body.replica.traveling = false;
        body.can_be_damaged.0 = true;
        Ok(HookNotify::Ended)
    }
}

/// Authority: apply queued hook requests and announce the outcomes.
pub fn apply_hook_requests(
    role: Res<NetRole>,
    tuning: Res<Tuning>,
    mut requests: MessageReader<HookRequestMessage>,
    mut owners: Query<
        (
            Entity,
            &NetId,
            &Transform,
            &mut Velocity,
            &mut Movement,
            &mut CanBeDamaged,
            &mut HookReplica,
        ),
        With<HookOwner>,
    >,
    others: Query<(Entity, &NetId, Has<PlayerCharacter>, Has<Health>), Without<HookOwner>>,
    mut notifies: MessageWriter<HookNotifyMessage>,
    mut game_events: MessageWriter<GameEvent>,
) {
    let authority = HookAuthority {
        role: *role,
        tuning: &tuning.hook,
    };

    for message in requests.read() {
        let Some((owner_entity, _, transform, mut velocity, mut movement, mut can_be_damaged, mut replica)) =
            owners.iter_mut().find(|(_, id, ..)| **id == message.owner)
        else {
            warn!("[Authority] refused {:?}: {}", message.request, AuthorityError::UnknownOwner(message.owner));
            continue;
        };

        let victim = match message.request {
            HookRequest::Damage { victim } if victim == message.owner => Victim::Owner,
            HookRequest::Damage { victim } => others
                .iter()
                .find(|(_, id, ..)| **id == victim)
                .map_or(Victim::Unknown, |(entity, _, is_player, has_health)| {
                    if is_player {
                        Victim::Player
                    } else if has_health {
                        Victim::Actor(entity)
                    } else {
                        Victim::Unknown
                    }
                }),
            _ => Victim::Unknown,
        };

        let mut body = OwnerBody {
            position: transform.translation,
            velocity: &mut velocity,
            movement: &mut movement,
            can_be_damaged: &mut can_be_damaged,
            replica: &mut replica,
        };
        match authority.apply(&mut body, &message.request, victim) {
            Ok(applied) => {
                if let Some(notify) = applied.notify {
                    notifies.write(HookNotifyMessage {
                        owner: message.owner,
                        notify,
                    });
                }
                if let Some((dst, amount)) = applied.damage {
                    game_events.write(GameEvent::DealDamage {
                        src: Some(owner_entity),
                        dst,
                        amount,
                    });
                }
            }
            Err(e) => warn!("[Authority] refused {:?} from {:?}: {e}", message.request, message.owner),
        }
    }
}
