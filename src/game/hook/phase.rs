use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookPhase {
    #[default]
    Idle,
    ShootingOutward,
    TravelingToTarget,
    Retracting,
}

impl HookPhase {
    pub fn is_active(self) -> bool {
        self != Self::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    Fire,
    /// The arm reached a concrete target.
    ArmHit,
    /// The arm reached a location with nothing to grab.
    ArmMissed,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("illegal hook transition: {event:?} while {from:?}")]
    IllegalTransition { from: HookPhase, event: PhaseEvent },
    #[error("hook shot already active")]
    AlreadyActive,
    #[error("hook shot on cooldown")]
    OnCooldown,
}

/// Transition table for the hook phases.
pub fn transition(from: HookPhase, event: PhaseEvent) -> Result<HookPhase, HookError> {
    use HookPhase::*;
    match (from, event) {
        (Idle, PhaseEvent::Fire) => Ok(ShootingOutward),
        (ShootingOutward, PhaseEvent::ArmHit) => Ok(TravelingToTarget),
        (ShootingOutward, PhaseEvent::ArmMissed) => Ok(Retracting),
        (ShootingOutward | TravelingToTarget | Retracting, PhaseEvent::Exit) => Ok(Idle),
        (ShootingOutward | TravelingToTarget | Retracting, PhaseEvent::Fire) => {
            Err(HookError::AlreadyActive)
        }
        _ => Err(HookError::IllegalTransition { from, event }),
    }
}
