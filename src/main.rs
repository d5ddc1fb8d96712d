use bevy::log::LogPlugin;
use bevy::prelude::*;
use std::path::PathBuf;

use hookshot::app::{build_app, connect_loopback};
use hookshot::config::tuning::Tuning;
use hookshot::game::components::HookOwner;
use hookshot::game::events::LoadLevel;
use hookshot::game::intent::Intent;
use hookshot::game::level::layout::{LevelSpec, OWNER_NET_ID, PRIORITY_NET_ID};
use hookshot::net::role::{LocalPlayers, NetRole};

const DEMO_TICKS: u32 = 900;
/// First tick after the reticle grace period at 60 Hz.
const FIRE_AT_TICK: u32 = 320;

/// Server drives the priority target, a loopback client drives the hook
/// owner and fires once.
fn main() {
    let tuning = Tuning::load_or_default();
    let level_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("levels/arena.ron"), PathBuf::from);

    let mut server = build_app(
        NetRole::Server,
        LocalPlayers::new([PRIORITY_NET_ID]),
        tuning.clone(),
    );
    server.add_plugins(LogPlugin::default());
    let mut client = build_app(NetRole::Client, LocalPlayers::new([OWNER_NET_ID]), tuning);
    connect_loopback(&mut server, &mut client);

    let spec = match LevelSpec::load(&level_path) {
        Ok(spec) => spec,
        Err(e) => {
            error!("{e}");
            return;
        }
    };
    server.world_mut().write_message(LoadLevel(spec.clone()));
    client.world_mut().write_message(LoadLevel(spec));

    for tick in 0..DEMO_TICKS {
        press_hook(client.world_mut(), tick == FIRE_AT_TICK);
        server.update();
        client.update();
    }

    let mut owners = server
        .world_mut()
        .query_filtered::<&Transform, With<HookOwner>>();
    for transform in owners.iter(server.world()) {
        info!(
            "Demo finished after {DEMO_TICKS} ticks, owner at ({:.1}, {:.1}, {:.1})",
            transform.translation.x, transform.translation.y, transform.translation.z
        );
    }
}

fn press_hook(world: &mut World, pressed: bool) {
    let mut owners = world.query_filtered::<&mut Intent, With<HookOwner>>();
    for mut intent in owners.iter_mut(world) {
        intent.hook = pressed;
    }
}
