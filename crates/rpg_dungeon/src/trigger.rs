//! Cell triggers.
//!
//! A trigger is owned by exactly one cell and fires when an actor arrives on
//! that cell. Each variant decides on its own whether it can fire again.

use rpg_component::{ObjectId, SceneId};
use rpg_event::{PowerupEffect, TriggerOutcome};
use rpg_math::IVec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// Grants an effect once.
    Powerup { effect: PowerupEffect, used: bool },
    /// Starts an encounter the first time an actor steps in.
    CombatGate { encounter: u32, triggered: bool },
    /// Sends the actor to `pos` in `scene`. Never expires.
    RegionExit { scene: SceneId, pos: IVec2 },
    /// Fires on every entry until `lifetime_ms` has elapsed.
    TimedEvent {
        event: u32,
        lifetime_ms: u32,
        elapsed_ms: u32,
    },
}

impl Trigger {
    #[must_use]
    pub const fn powerup(effect: PowerupEffect) -> Self {
        Self::Powerup {
            effect,
            used: false,
        }
    }

    #[must_use]
    pub const fn combat_gate(encounter: u32) -> Self {
        Self::CombatGate {
            encounter,
            triggered: false,
        }
    }

    #[must_use]
    pub const fn region_exit(scene: SceneId, pos: IVec2) -> Self {
        Self::RegionExit { scene, pos }
    }

    #[must_use]
    pub const fn timed(event: u32, lifetime_ms: u32) -> Self {
        Self::TimedEvent {
            event,
            lifetime_ms,
            elapsed_ms: 0,
        }
    }

    /// Fire the trigger for `actor`.
    ///
    /// An expired trigger returns [`TriggerOutcome::Nothing`].
    pub fn execute(&mut self, actor: ObjectId) -> TriggerOutcome {
        if self.is_expired() {
            return TriggerOutcome::Nothing;
        }
        let outcome = match self {
            Self::Powerup { effect, used } => {
                *used = true;
                TriggerOutcome::Powerup(*effect)
            }
            Self::CombatGate {
                encounter,
                triggered,
            } => {
                *triggered = true;
                TriggerOutcome::Encounter(*encounter)
            }
            Self::RegionExit { scene, pos } => TriggerOutcome::Exit {
                scene: *scene,
                pos: *pos,
            },
            Self::TimedEvent { event, .. } => TriggerOutcome::Scripted(*event),
        };
        debug!(actor = %actor, ?outcome, "trigger executed");
        outcome
    }

    /// Returns `true` once the trigger can never fire again.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match *self {
            Self::Powerup { used, .. } => used,
            Self::CombatGate { triggered, .. } => triggered,
            Self::RegionExit { .. } => false,
            Self::TimedEvent {
                lifetime_ms,
                elapsed_ms,
                ..
            } => elapsed_ms >= lifetime_ms,
        }
    }

    /// Returns `true` for triggers that age with time.
    #[must_use]
    pub fn is_timed(&self) -> bool {
        matches!(self, Self::TimedEvent { .. })
    }

    /// Age the trigger by `elapsed_ms`. Only timed events are affected.
    pub fn tick(&mut self, elapsed_ms: u32) {
        if let Self::TimedEvent {
            elapsed_ms: age, ..
        } = self
        {
            *age = age.saturating_add(elapsed_ms);
        }
    }
}
