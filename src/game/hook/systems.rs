use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use std::collections::HashSet;

use super::effect::spawn_impact;
use super::indicator::HookIndicator;
use super::machine::{HookState, arm_render_location};
use super::target::{HookAim, HookScene, OwnerPose, PriorityPose, resolve_target};
use crate::config::tuning::Tuning;
use crate::game::collision::{Capsule, Collider, ObstacleSet};
use crate::game::components::*;
use crate::game::events::{HookCancelRequested, HookCue, HookCueKind, MessageOrigin};
use crate::game::intent::Intent;
use crate::game::level::anchor::AnchorRegistry;
use crate::game::level::layout::{CurrentLevel, LevelClock, LevelLayout};
use crate::game::view::ViewProjection;
use crate::net::protocol::{HookNotify, HookNotifyMessage, HookRequest, HookRequestMessage};
use crate::net::replication::HookReplica;

/// Hook owners whose input lives on this instance.
type LocalOwner = (With<HookOwner>, With<LocallyControlled>);

/// Damageable actors already touched during the current travel.
#[derive(Component, Debug, Clone, Default)]
pub struct TravelOverlaps(pub HashSet<Entity>);

/// Where the hook arm is drawn this frame.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct HookArmPresentation {
    pub visible: bool,
    pub location: Vec3,
}

/// World state shared by every system that builds a `HookScene`.
#[derive(SystemParam)]
pub struct HookContext<'w, 's> {
    pub tuning: Res<'w, Tuning>,
    anchors: Res<'w, AnchorRegistry>,
    level: Option<Res<'w, CurrentLevel>>,
    priority: Query<'w, 's, (Entity, &'static Transform), With<PriorityTarget>>,
    colliders: Query<'w, 's, (Entity, &'static Transform, &'static Collider)>,
}

impl HookContext<'_, '_> {
    fn layout(&self) -> LevelLayout {
        self.level.as_ref().map_or(LevelLayout::Open, |level| level.layout)
    }

    fn priority(&self) -> Option<PriorityPose> {
        self.priority.iter().next().map(|(entity, transform)| PriorityPose {
            entity,
            position: transform.translation,
        })
    }

    fn obstacles(&self) -> ObstacleSet {
        ObstacleSet::blocking(
            self.colliders
                .iter()
                .map(|(entity, transform, collider)| (entity, transform.translation, *collider)),
        )
    }

    fn scene<'a>(
        &'a self,
        obstacles: &'a ObstacleSet,
        owner: OwnerPose,
        capsule: &Capsule,
        view: &'a ViewProjection,
        traveling: bool,
    ) -> HookScene<'a> {
        HookScene {
            owner,
            sweep_shape: capsule.scaled(self.tuning.hook.sweep_capsule_scale),
            priority: self.priority(),
            anchors: &self.anchors,
            obstacles,
            view,
            layout: self.layout(),
            traveling,
        }
    }
}

fn owner_pose(entity: Entity, transform: &Transform, velocity: &Velocity) -> OwnerPose {
    OwnerPose {
        entity,
        position: transform.translation,
        forward: transform.forward().as_vec3(),
        velocity: velocity.0,
    }
}

fn send_requests(writer: &mut MessageWriter<HookRequestMessage>, owner: NetId, out: Vec<HookRequest>) {
    for request in out {
        writer.write(HookRequestMessage { owner, request });
    }
}

// ── Target set ──────────────────────────────────────────────────────

/// Re-run the selector for every local owner and refresh its reticle.
pub fn resolve_hook_targets(
    ctx: HookContext,
    clock: Res<LevelClock>,
    mut owners: Query<
        (
            Entity,
            &Transform,
            &Velocity,
            &Capsule,
            &ViewProjection,
            &HookState,
            &HookCooldown,
            &mut HookAim,
            &mut HookIndicator,
        ),
        LocalOwner,
    >,
) {
    let obstacles = ctx.obstacles();
    for (entity, transform, velocity, capsule, view, state, cooldown, mut aim, mut indicator) in &mut owners {
        let scene = ctx.scene(
            &obstacles,
            owner_pose(entity, transform, velocity),
            capsule,
            view,
            state.is_traveling(),
        );
        let resolution = resolve_target(&scene, &ctx.tuning.hook);
        aim.set_if_neq(HookAim(resolution));
        indicator.set_if_neq(HookIndicator::evaluate(
            scene.target_location(resolution.target),
            state.is_traveling(),
            cooldown.is_active(),
            clock.elapsed,
            &ctx.tuning.hook,
            view,
        ));
    }
}

// ── Phase set ───────────────────────────────────────────────────────

pub fn tick_cooldowns(tuning: Res<Tuning>, mut cooldowns: Query<&mut HookCooldown>) {
    for mut cooldown in &mut cooldowns {
        if cooldown.is_active() {
            cooldown.tick(tuning.dt);
        }
    }
}

/// The priority target's dash asks for the incoming hook shot to end.
pub fn relay_priority_dash(
    dashers: Query<&Intent, (With<PriorityTarget>, With<LocallyControlled>)>,
    owners: Query<&NetId, With<HookOwner>>,
    mut cancels: MessageWriter<HookCancelRequested>,
) {
    if !dashers.iter().any(|intent| intent.dash) {
        return;
    }
    for owner in &owners {
        debug!("[Hook] dash cancel raised for {:?}", owner);
        cancels.write(HookCancelRequested {
            owner: *owner,
            origin: MessageOrigin::Local,
        });
    }
}

/// Honour cancellation requests for owners controlled here. Everyone else
/// ignores them; the network layer relays them to the right instance.
pub fn apply_hook_cancellations(
    tuning: Res<Tuning>,
    mut cancels: MessageReader<HookCancelRequested>,
    mut owners: Query<(&NetId, &Velocity, &mut HookState, &mut HookCooldown), LocalOwner>,
    mut requests: MessageWriter<HookRequestMessage>,
) {
    for cancel in cancels.read() {
        let Some((id, velocity, mut state, mut cooldown)) =
            owners.iter_mut().find(|(id, ..)| **id == cancel.owner)
        else {
            continue;
        };
        let mut out = Vec::new();
        if let Some(reason) = state.cancel(velocity.0, &tuning.hook, &mut out) {
            info!("[Hook] {:?} shot cancelled ({:?})", id, cancel.origin);
            if reason.starts_cooldown() {
                cooldown.start(tuning.hook.cooldown);
            }
        }
        send_requests(&mut requests, *id, out);
    }
}

pub fn tick_hook_states(
    ctx: HookContext,
    mut owners: Query<
        (
            Entity,
            &NetId,
            &Transform,
            &Velocity,
            &Capsule,
            &ViewProjection,
            &mut HookState,
            &mut HookCooldown,
        ),
        LocalOwner,
    >,
    mut requests: MessageWriter<HookRequestMessage>,
) {
    let obstacles = ctx.obstacles();
    let tuning = &ctx.tuning.hook;
    for (entity, id, transform, velocity, capsule, view, mut state, mut cooldown) in &mut owners {
        if !state.is_active() {
            continue;
        }
        let scene = ctx.scene(
            &obstacles,
            owner_pose(entity, transform, velocity),
            capsule,
            view,
            state.is_traveling(),
        );
        let mut out = Vec::new();
        if let Some(reason) = state.tick(&scene, tuning, ctx.tuning.dt, &mut out) {
            info!("[Hook] {:?} shot ended: {:?}", id, reason);
            if reason.starts_cooldown() {
                cooldown.start(tuning.cooldown);
            }
        }
        send_requests(&mut requests, *id, out);
    }
}

pub fn fire_hooks(
    ctx: HookContext,
    mut owners: Query<
        (
            Entity,
            &NetId,
            &Transform,
            &Velocity,
            &Capsule,
            &ViewProjection,
            &Intent,
            &InputGate,
            &mut HookState,
            &HookCooldown,
        ),
        LocalOwner,
    >,
    mut requests: MessageWriter<HookRequestMessage>,
) {
    let obstacles = ctx.obstacles();
    for (entity, id, transform, velocity, capsule, view, intent, gate, mut state, cooldown) in &mut owners {
        if !intent.gated(gate.open).hook {
            continue;
        }
        let scene = ctx.scene(&obstacles, owner_pose(entity, transform, velocity), capsule, view, false);
        let mut out = Vec::new();
        match state.fire(&scene, &ctx.tuning.hook, cooldown.is_active(), &mut out) {
            Ok(()) => info!(
                "[Hook] {:?} fired at {:?} ({:.1}, {:.1}, {:.1})",
                id,
                state.target(),
                state.target_location().x,
                state.target_location().y,
                state.target_location().z
            ),
            Err(e) => debug!("[Hook] {:?} fire ignored: {e}", id),
        }
        send_requests(&mut requests, *id, out);
    }
}

/// Damage each damageable actor once per overlap while travelling.
pub fn detect_travel_overlaps(
    mut owners: Query<(&NetId, &Transform, &Capsule, &HookState, &mut TravelOverlaps), LocalOwner>,
    victims: Query<(Entity, &NetId, &Transform, &Collider), (With<Health>, Without<PlayerCharacter>)>,
    mut requests: MessageWriter<HookRequestMessage>,
) {
    for (id, transform, capsule, state, mut overlaps) in &mut owners {
        if !state.is_traveling() {
            overlaps.0.clear();
            continue;
        }
        for (victim, victim_id, victim_transform, collider) in &victims {
            let touching = capsule.overlaps(transform.translation, collider.shape, victim_transform.translation);
            if !touching {
                overlaps.0.remove(&victim);
            } else if overlaps.0.insert(victim) {
                requests.write(HookRequestMessage {
                    owner: *id,
                    request: HookRequest::Damage { victim: *victim_id },
                });
            }
        }
    }
}

pub fn sync_input_gates(mut owners: Query<(&HookState, &mut InputGate), LocalOwner>) {
    for (state, mut gate) in &mut owners {
        gate.set_if_neq(InputGate {
            open: !state.input_suppressed(),
        });
    }
}

// ── Notify set ──────────────────────────────────────────────────────

/// Turn authority notifications into presentation cues. Runs on every instance.
pub fn apply_hook_notifications(
    mut commands: Commands,
    time: Res<Time>,
    tuning: Res<Tuning>,
    mut notifies: MessageReader<HookNotifyMessage>,
    mut cues: MessageWriter<HookCue>,
) {
    for HookNotifyMessage { owner, notify } in notifies.read() {
        let kind = match *notify {
            HookNotify::Started { valid_target } => HookCueKind::ShotStarted { valid_target },
            HookNotify::TravelStarted { target_location } => HookCueKind::TravelStarted {
                target_location: Vec3::from_array(target_location),
            },
            HookNotify::Collision {
                location,
                travel_distance,
            } => {
                let location = Vec3::from_array(location);
                spawn_impact(
                    &mut commands,
                    time.elapsed_secs_f64(),
                    location,
                    travel_distance,
                    *owner,
                    tuning.hook.impact_effect_lifetime,
                );
                HookCueKind::Explosion { location }
            }
            HookNotify::Ended => HookCueKind::ShotEnded,
        };
        cues.write(HookCue { owner: *owner, kind });
    }
}

// ── Present set ─────────────────────────────────────────────────────

/// Local owners draw from their own machine; remote owners from the replica.
pub fn present_hook_arms(
    tuning: Res<Tuning>,
    mut owners: Query<
        (
            &Transform,
            &HookState,
            &HookReplica,
            Has<LocallyControlled>,
            &mut HookArmPresentation,
        ),
        With<HookOwner>,
    >,
) {
    for (transform, state, replica, local, mut presentation) in &mut owners {
        let (active, arm, target) = if local {
            (state.is_active(), state.arm_location(), state.target_location())
        } else {
            (replica.active, replica.arm_location, replica.target_location)
        };
        let next = if active {
            HookArmPresentation {
                visible: true,
                location: arm_render_location(arm, target, transform.translation, &tuning.hook),
            }
        } else {
            HookArmPresentation::default()
        };
        presentation.set_if_neq(next);
    }
}
