use bevy::prelude::*;
use std::collections::HashSet;

use crate::game::components::NetId;
use crate::game::level::layout::{OWNER_NET_ID, PRIORITY_NET_ID};

/// How this instance takes part in a session.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetRole {
    /// Single instance, authority over everything.
    #[default]
    Standalone,
    Server,
    Client,
}

impl NetRole {
    pub fn has_authority(self) -> bool {
        !matches!(self, Self::Client)
    }
}

/// Characters driven by input on this instance.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalPlayers {
    ids: HashSet<NetId>,
}

impl LocalPlayers {
    pub fn new(ids: impl IntoIterator<Item = NetId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Both playable characters, for standalone play.
    pub fn both() -> Self {
        Self::new([OWNER_NET_ID, PRIORITY_NET_ID])
    }

    pub fn controls(&self, id: NetId) -> bool {
        self.ids.contains(&id)
    }
}

pub fn has_authority(role: Res<NetRole>) -> bool {
    role.has_authority()
}

pub fn is_server(role: Res<NetRole>) -> bool {
    *role == NetRole::Server
}

pub fn is_client(role: Res<NetRole>) -> bool {
    *role == NetRole::Client
}
