use bevy::prelude::*;

use super::components::*;
use super::events::GameEvent;

/// AuthoritySet: apply DealDamage events to Health. Closed damage gates
/// swallow the hit; dead non-player actors are despawned.
pub fn apply_damage_events(
    mut commands: Commands,
    mut events: MessageReader<GameEvent>,
    mut targets: Query<(&mut Health, Option<&CanBeDamaged>, Option<&NetId>, Has<PlayerCharacter>)>,
) {
    for event in events.read() {
        let GameEvent::DealDamage { src, dst, amount } = event;
        let Ok((mut health, gate, id, is_player)) = targets.get_mut(*dst) else {
            continue;
        };
        if gate.is_some_and(|gate| !gate.0) {
            debug!("[Damage] {:?} ignored: cannot be damaged", id);
            continue;
        }
        if !health.is_alive() {
            continue;
        }

        health.current = (health.current - amount.max(0.0)).clamp(0.0, health.max);
        info!(
            "[Damage] {:?} -> {:?} amount={:.1} hp={:.1}/{:.1}",
            src, id, amount, health.current, health.max
        );
        if !health.is_alive() && !is_player {
            info!("[Damage] {:?} destroyed", id);
            commands.entity(*dst).despawn();
        }
    }
}
