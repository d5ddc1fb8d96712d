//! Byte transports between a server and its clients.
//!
//! `LoopbackTransport` pairs two in-process endpoints over bounded std
//! channels; a socket transport would implement the same trait.

use bevy::prelude::*;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport queue full")]
    Full,
    #[error("peer disconnected")]
    Disconnected,
}

pub trait Transport: Send + Sync {
    fn try_send(&self, bytes: Vec<u8>) -> Result<(), TransportError>;
    fn try_recv(&self) -> Option<Vec<u8>>;
}

pub struct LoopbackTransport {
    tx: SyncSender<Vec<u8>>,
    rx: Mutex<Receiver<Vec<u8>>>,
}

impl LoopbackTransport {
    /// Two connected endpoints, each buffering up to `capacity` messages.
    #[must_use]
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::sync_channel(capacity);
        let (tx_b, rx_b) = mpsc::sync_channel(capacity);
        let a = Self {
            tx: tx_a,
            rx: Mutex::new(rx_b),
        };
        let b = Self {
            tx: tx_b,
            rx: Mutex::new(rx_a),
        };
        (a, b)
    }
}

impl Transport for LoopbackTransport {
    fn try_send(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.tx.try_send(bytes).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Disconnected(_) => TransportError::Disconnected,
        })
    }

    fn try_recv(&self) -> Option<Vec<u8>> {
        self.rx.lock().ok()?.try_recv().ok()
    }
}

/// One client connection as seen by the server.
pub struct Peer {
    pub transport: Box<dyn Transport>,
    pub welcomed: bool,
}

#[derive(Resource, Default)]
pub struct ServerPeers {
    pub peers: Vec<Peer>,
}

impl ServerPeers {
    pub fn connect(&mut self, transport: impl Transport + 'static) {
        self.peers.push(Peer {
            transport: Box::new(transport),
            welcomed: false,
        });
    }

    pub fn broadcast(&self, bytes: &[u8]) {
        for (i, peer) in self.peers.iter().enumerate() {
            if let Err(e) = peer.transport.try_send(bytes.to_vec()) {
                warn!("[Net] send to peer {i} failed: {e}");
            }
        }
    }
}

/// The client's connection to its server.
#[derive(Resource)]
pub struct ClientConnection {
    pub transport: Box<dyn Transport>,
    pub hello_sent: bool,
    /// Server verdict on our tuning, once welcomed.
    pub tuning_matches: Option<bool>,
}

impl ClientConnection {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            hello_sent: false,
            tuning_matches: None,
        }
    }

    pub fn send(&self, bytes: Vec<u8>) {
        if let Err(e) = self.transport.try_send(bytes) {
            warn!("[Net] send to server failed: {e}");
        }
    }
}
