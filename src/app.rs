//! Headless app assembly shared by the binary and the integration tests.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::time::Duration;

use crate::config::tuning::Tuning;
use crate::net::role::{LocalPlayers, NetRole};
use crate::net::transport::{ClientConnection, LoopbackTransport, ServerPeers};
use crate::plugins::{game_plugin::GamePlugin, net_plugin::NetPlugin};

/// Messages buffered per direction on a loopback link.
pub const LOOPBACK_CAPACITY: usize = 1024;

/// A headless simulation instance. Every `App::update` advances time by
/// exactly one fixed step, so each update runs `FixedUpdate` once.
pub fn build_app(role: NetRole, local: LocalPlayers, tuning: Tuning) -> App {
    let step = Duration::from_secs_f32(tuning.dt);
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(Time::<Fixed>::from_duration(step))
        .insert_resource(TimeUpdateStrategy::ManualDuration(step))
        .insert_resource(tuning)
        .insert_resource(role)
        .insert_resource(local)
        .add_plugins((GamePlugin, NetPlugin));
    app
}

/// Link a client app to a server app over an in-process channel pair.
pub fn connect_loopback(server: &mut App, client: &mut App) {
    let (server_end, client_end) = LoopbackTransport::pair(LOOPBACK_CAPACITY);
    server
        .world_mut()
        .resource_mut::<ServerPeers>()
        .connect(server_end);
    client
        .world_mut()
        .insert_resource(ClientConnection::new(client_end));
}
