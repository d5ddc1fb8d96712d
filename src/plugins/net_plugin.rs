use bevy::prelude::*;

use super::game_plugin::FixedGameSet;
use crate::config::tuning::Tuning;
use crate::game::components::*;
use crate::game::events::{HookCancelRequested, MessageOrigin};
use crate::game::intent::Intent;
use crate::net::protocol::{
    ClientMessage, HookNotifyMessage, HookRequestMessage, ServerMessage, decode, encode,
};
use crate::net::replication::{HookReplica, apply_motion, broadcast, broadcast_replication};
use crate::net::role::{LocalPlayers, is_client, is_server};
use crate::net::transport::{ClientConnection, Peer, ServerPeers};

pub struct NetPlugin;

impl Plugin for NetPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ServerPeers>();

        app.add_systems(
            FixedUpdate,
            (
                server_receive.run_if(is_server),
                client_receive
                    .run_if(is_client)
                    .run_if(resource_exists::<ClientConnection>),
            )
                .in_set(FixedGameSet::ReceiveSet),
        );

        app.add_systems(
            FixedUpdate,
            (
                (server_send, broadcast_replication).chain().run_if(is_server),
                client_send
                    .run_if(is_client)
                    .run_if(resource_exists::<ClientConnection>),
            )
                .in_set(FixedGameSet::SendSet),
        );
    }
}

fn send_to_peer(index: usize, peer: &Peer, message: &ServerMessage) {
    match encode(message) {
        Ok(bytes) => {
            if let Err(e) = peer.transport.try_send(bytes) {
                warn!("[Net] send to peer {index} failed: {e}");
            }
        }
        Err(e) => warn!("[Net] {e}"),
    }
}

// ── Server ──────────────────────────────────────────────────────────

/// Server: drain every peer. Requests for characters this instance drives
/// itself are refused; everything else is queued for the authority.
pub fn server_receive(
    tuning: Res<Tuning>,
    local: Res<LocalPlayers>,
    mut peers: ResMut<ServerPeers>,
    mut bodies: Query<(&NetId, &mut Intent), With<PlayerCharacter>>,
    mut requests: MessageWriter<HookRequestMessage>,
    mut cancels: MessageWriter<HookCancelRequested>,
) {
    for (index, peer) in peers.peers.iter_mut().enumerate() {
        while let Some(bytes) = peer.transport.try_recv() {
            let message = match decode::<ClientMessage>(&bytes) {
                Ok(message) => message,
                Err(e) => {
                    warn!("[Net] peer {index}: {e}");
                    continue;
                }
            };

            if !peer.welcomed && !matches!(message, ClientMessage::Hello { .. }) {
                warn!("[Net] peer {index} sent {:?} before Hello, dropped", message);
                continue;
            }

            match message {
                ClientMessage::Hello { tuning_fingerprint } => {
                    let tuning_matches = tuning_fingerprint == tuning.fingerprint();
                    if tuning_matches {
                        info!("[Net] peer {index} connected");
                    } else {
                        warn!("[Net] peer {index} tuning fingerprint mismatch, hook prediction will drift");
                    }
                    peer.welcomed = true;
                    send_to_peer(index, peer, &ServerMessage::Welcome { tuning_matches });
                }
                ClientMessage::Hook { owner, request } => {
                    if local.controls(owner) {
                        warn!("[Net] peer {index} sent {:?} for {:?} which is driven here", request, owner);
                        continue;
                    }
                    requests.write(HookRequestMessage { owner, request });
                }
                ClientMessage::Intent { id, move_dir } => {
                    if local.controls(id) || !move_dir.iter().all(|c| c.is_finite()) {
                        warn!("[Net] peer {index} intent for {:?} refused", id);
                        continue;
                    }
                    if let Some((_, mut intent)) = bodies.iter_mut().find(|(body, _)| **body == id) {
                        intent.move_dir = Vec3::from_array(move_dir);
                    }
                }
                ClientMessage::CancelHook { owner } => {
                    cancels.write(HookCancelRequested {
                        owner,
                        origin: MessageOrigin::Remote,
                    });
                }
            }
        }
    }
}

/// Server: announce hook outcomes and relay cancellations to every client.
pub fn server_send(
    peers: Res<ServerPeers>,
    mut notifies: MessageReader<HookNotifyMessage>,
    mut cancels: MessageReader<HookCancelRequested>,
) {
    for HookNotifyMessage { owner, notify } in notifies.read() {
        broadcast(
            &peers,
            &ServerMessage::Hook {
                owner: *owner,
                notify: *notify,
            },
        );
    }
    for cancel in cancels.read() {
        broadcast(&peers, &ServerMessage::CancelHook { owner: cancel.owner });
    }
}

// ── Client ──────────────────────────────────────────────────────────

pub fn client_receive(
    mut connection: ResMut<ClientConnection>,
    mut owners: Query<(&NetId, &mut HookReplica)>,
    mut bodies: Query<(&NetId, &mut Transform, &mut Velocity, &mut Movement), With<PlayerCharacter>>,
    mut notifies: MessageWriter<HookNotifyMessage>,
    mut cancels: MessageWriter<HookCancelRequested>,
) {
    while let Some(bytes) = connection.transport.try_recv() {
        let message = match decode::<ServerMessage>(&bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!("[Net] server: {e}");
                continue;
            }
        };
        match message {
            ServerMessage::Welcome { tuning_matches } => {
                if !tuning_matches {
                    warn!("[Net] server reports tuning mismatch");
                }
                connection.tuning_matches = Some(tuning_matches);
            }
            ServerMessage::Hook { owner, notify } => {
                notifies.write(HookNotifyMessage { owner, notify });
            }
            ServerMessage::Replicate { owner, state } => {
                if let Some((_, mut replica)) = owners.iter_mut().find(|(id, _)| **id == owner) {
                    replica.apply_wire(&state);
                }
            }
            ServerMessage::Motion(snapshots) => {
                for snapshot in &snapshots {
                    if let Some((_, mut transform, mut velocity, mut movement)) =
                        bodies.iter_mut().find(|(id, ..)| **id == snapshot.id)
                    {
                        apply_motion(snapshot, &mut transform, &mut velocity, &mut movement);
                    }
                }
            }
            ServerMessage::CancelHook { owner } => {
                cancels.write(HookCancelRequested {
                    owner,
                    origin: MessageOrigin::Remote,
                });
            }
        }
    }
}

fn send_to_server(connection: &ClientConnection, message: &ClientMessage) {
    match encode(message) {
        Ok(bytes) => connection.send(bytes),
        Err(e) => warn!("[Net] {e}"),
    }
}

/// Client: handshake first, then this tick's hook requests, locally raised
/// cancellations and the gated move intent of every local character.
pub fn client_send(
    tuning: Res<Tuning>,
    mut connection: ResMut<ClientConnection>,
    mut requests: MessageReader<HookRequestMessage>,
    mut cancels: MessageReader<HookCancelRequested>,
    bodies: Query<(&NetId, &Intent, Option<&InputGate>), (With<PlayerCharacter>, With<LocallyControlled>)>,
) {
    if !connection.hello_sent {
        send_to_server(
            &connection,
            &ClientMessage::Hello {
                tuning_fingerprint: tuning.fingerprint(),
            },
        );
        connection.hello_sent = true;
    }

    for HookRequestMessage { owner, request } in requests.read() {
        send_to_server(
            &connection,
            &ClientMessage::Hook {
                owner: *owner,
                request: *request,
            },
        );
    }
    for cancel in cancels.read() {
        if cancel.origin == MessageOrigin::Local {
            send_to_server(&connection, &ClientMessage::CancelHook { owner: cancel.owner });
        }
    }
    for (id, intent, gate) in &bodies {
        let intent = intent.gated(gate.is_none_or(|gate| gate.open));
        send_to_server(
            &connection,
            &ClientMessage::Intent {
                id: *id,
                move_dir: intent.move_dir.to_array(),
            },
        );
    }
}
