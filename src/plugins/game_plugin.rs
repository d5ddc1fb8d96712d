use bevy::prelude::*;

use crate::config::tuning::Tuning;
use crate::game::{
    combat,
    events::{GameEvent, HookCancelRequested, HookCue, LevelTeardown, LoadLevel, ReloadTuning},
    hook::{effect, systems as hooks},
    level::{
        anchor::{self, AnchorRegistry},
        layout::{self, LevelClock},
    },
    physics, view,
};
use crate::net::authority;
use crate::net::protocol::{HookNotifyMessage, HookRequestMessage};
use crate::net::role::{LocalPlayers, NetRole, has_authority};

// ── SystemSets (strict FixedUpdate ordering) ────────────────────────

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FixedGameSet {
    /// Drain the network into local messages.
    ReceiveSet,
    LevelSet,
    /// Selector queries; runs before any phase update.
    TargetSet,
    PhaseSet,
    /// Authority only: apply hook requests and damage.
    AuthoritySet,
    NotifySet,
    /// Authority only.
    PhysicsSet,
    PresentSet,
    CleanupSet,
    SendSet,
}

pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<GameEvent>();
        app.add_message::<HookRequestMessage>();
        app.add_message::<HookNotifyMessage>();
        app.add_message::<HookCancelRequested>();
        app.add_message::<HookCue>();
        app.add_message::<LoadLevel>();
        app.add_message::<LevelTeardown>();
        app.add_message::<ReloadTuning>();

        app.init_resource::<Tuning>();
        app.init_resource::<NetRole>();
        app.init_resource::<LocalPlayers>();
        app.init_resource::<AnchorRegistry>();
        app.init_resource::<LevelClock>();

        app.configure_sets(
            FixedUpdate,
            (
                FixedGameSet::ReceiveSet,
                FixedGameSet::LevelSet,
                FixedGameSet::TargetSet,
                FixedGameSet::PhaseSet,
                FixedGameSet::AuthoritySet.run_if(has_authority),
                FixedGameSet::NotifySet,
                FixedGameSet::PhysicsSet.run_if(has_authority),
                FixedGameSet::PresentSet,
                FixedGameSet::CleanupSet,
                FixedGameSet::SendSet,
            )
                .chain(),
        );

        // LevelSet: anchors register after the spawn commands are applied
        app.add_systems(
            FixedUpdate,
            (
                reload_tuning,
                layout::teardown_level,
                layout::load_level,
                anchor::unregister_anchors,
                anchor::register_anchors,
                layout::tick_level_clock,
            )
                .chain()
                .in_set(FixedGameSet::LevelSet),
        );

        app.add_systems(
            FixedUpdate,
            hooks::resolve_hook_targets.in_set(FixedGameSet::TargetSet),
        );

        // PhaseSet: cancellations preempt the tick, firing starts next tick's shot
        app.add_systems(
            FixedUpdate,
            (
                hooks::tick_cooldowns,
                hooks::relay_priority_dash,
                hooks::apply_hook_cancellations,
                hooks::tick_hook_states,
                hooks::fire_hooks,
                hooks::detect_travel_overlaps,
                hooks::sync_input_gates,
            )
                .chain()
                .in_set(FixedGameSet::PhaseSet),
        );

        app.add_systems(
            FixedUpdate,
            (authority::apply_hook_requests, combat::apply_damage_events)
                .chain()
                .in_set(FixedGameSet::AuthoritySet),
        );

        app.add_systems(
            FixedUpdate,
            hooks::apply_hook_notifications.in_set(FixedGameSet::NotifySet),
        );

        app.add_systems(
            FixedUpdate,
            (physics::apply_move_intent, physics::integrate_bodies)
                .chain()
                .in_set(FixedGameSet::PhysicsSet),
        );

        app.add_systems(
            FixedUpdate,
            (view::update_chase_views, hooks::present_hook_arms)
                .chain()
                .in_set(FixedGameSet::PresentSet),
        );

        app.add_systems(
            FixedUpdate,
            effect::expire_impacts.in_set(FixedGameSet::CleanupSet),
        );
    }
}

fn reload_tuning(mut events: MessageReader<ReloadTuning>, mut tuning: ResMut<Tuning>) {
    if events.read().count() > 0 {
        tuning.reload();
    }
}
