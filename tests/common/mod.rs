#![allow(dead_code)]

use bevy::prelude::*;
use std::path::Path;

use hookshot::app::build_app;
use hookshot::config::tuning::Tuning;
use hookshot::game::components::*;
use hookshot::game::events::LoadLevel;
use hookshot::game::hook::machine::HookState;
use hookshot::game::intent::Intent;
use hookshot::game::level::layout::LevelSpec;
use hookshot::net::role::{LocalPlayers, NetRole};

pub fn level(file: &str) -> LevelSpec {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("levels").join(file);
    LevelSpec::load(path).unwrap()
}

pub fn standalone(file: &str) -> App {
    let mut app = build_app(NetRole::Standalone, LocalPlayers::both(), Tuning::default());
    app.world_mut().write_message(LoadLevel(level(file)));
    wait_for_level(&mut app);
    app
}

/// Update until the level's hook owner exists.
pub fn wait_for_level(app: &mut App) {
    for _ in 0..10 {
        app.update();
        let loaded = app
            .world_mut()
            .query_filtered::<(), With<HookOwner>>()
            .iter(app.world())
            .next()
            .is_some();
        if loaded {
            return;
        }
    }
    panic!("level did not load");
}

/// Update until `done` holds, at most `max` times. Returns the updates used.
pub fn run_until(app: &mut App, max: usize, mut done: impl FnMut(&mut App) -> bool) -> usize {
    for n in 1..=max {
        app.update();
        if done(app) {
            return n;
        }
    }
    panic!("condition not reached within {max} updates");
}

pub fn owner<'w, T: Component>(app: &'w mut App) -> &'w T {
    let entity = owner_entity(app);
    app.world().get::<T>(entity).unwrap()
}

pub fn owner_entity(app: &mut App) -> Entity {
    app.world_mut()
        .query_filtered::<Entity, With<HookOwner>>()
        .single(app.world())
        .unwrap()
}

pub fn priority_entity(app: &mut App) -> Entity {
    app.world_mut()
        .query_filtered::<Entity, With<PriorityTarget>>()
        .single(app.world())
        .unwrap()
}

pub fn hook_state(app: &mut App) -> HookState {
    owner::<HookState>(app).clone()
}

pub fn set_intent(app: &mut App, entity: Entity, edit: impl FnOnce(&mut Intent)) {
    let mut intent = app.world_mut().get_mut::<Intent>(entity).unwrap();
    edit(&mut intent);
}

/// Hold the hook button for exactly one update.
pub fn fire(app: &mut App) {
    let owner = owner_entity(app);
    set_intent(app, owner, |intent| intent.hook = true);
    app.update();
    set_intent(app, owner, |intent| intent.hook = false);
}

pub fn damageable_health(app: &mut App, id: NetId) -> Option<f32> {
    app.world_mut()
        .query::<(&NetId, &Health)>()
        .iter(app.world())
        .find(|(net_id, _)| **net_id == id)
        .map(|(_, health)| health.current)
}
