use bevy::prelude::*;

/// Static, level-placed hook target.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct HookAnchor;

/// Weak reference to a registered anchor. Stale once the anchor unregisters
/// or the registry is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorHandle {
    pub entity: Entity,
    generation: u32,
}

/// Anchors of the current level in creation order.
#[derive(Resource, Debug, Default)]
pub struct AnchorRegistry {
    entries: Vec<(Entity, Vec3)>,
    generation: u32,
}

impl AnchorRegistry {
    pub fn register(&mut self, entity: Entity, position: Vec3) -> AnchorHandle {
        if let Some(entry) = self.entries.iter_mut().find(|(e, _)| *e == entity) {
            entry.1 = position;
        } else {
            self.entries.push((entity, position));
        }
        AnchorHandle {
            entity,
            generation: self.generation,
        }
    }

    pub fn unregister(&mut self, entity: Entity) {
        self.entries.retain(|(e, _)| *e != entity);
    }

    /// Drop every anchor and invalidate all outstanding handles.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of a live anchor.
    pub fn resolve(&self, handle: AnchorHandle) -> Option<Vec3> {
        if handle.generation != self.generation {
            return None;
        }
        self.entries
            .iter()
            .find(|(e, _)| *e == handle.entity)
            .map(|(_, position)| *position)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnchorHandle, Vec3)> + '_ {
        let generation = self.generation;
        self.entries
            .iter()
            .map(move |&(entity, position)| (AnchorHandle { entity, generation }, position))
    }

    /// Nearest anchor to `origin` accepted by `usable`. On equal distance the
    /// earliest registered anchor wins.
    pub fn closest_usable(&self, origin: Vec3, usable: impl Fn(Vec3) -> bool) -> Option<AnchorHandle> {
        let mut best: Option<(AnchorHandle, f32)> = None;
        for (handle, position) in self.iter() {
            if !usable(position) {
                continue;
            }
            let distance = origin.distance(position);
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((handle, distance));
            }
        }
        best.map(|(handle, _)| handle)
    }
}

/// Register anchors as they spawn.
pub fn register_anchors(
    mut registry: ResMut<AnchorRegistry>,
    added: Query<(Entity, &Transform), Added<HookAnchor>>,
) {
    for (entity, transform) in &added {
        registry.register(entity, transform.translation);
    }
}

/// Unregister anchors as they despawn.
pub fn unregister_anchors(mut registry: ResMut<AnchorRegistry>, mut removed: RemovedComponents<HookAnchor>) {
    for entity in removed.read() {
        registry.unregister(entity);
    }
}
