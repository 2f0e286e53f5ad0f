//! # rpg_event
//!
//! Decoupled publish/subscribe between simulation subsystems.
//!
//! This crate provides:
//!
//! - [`channel`]: [`EventSender`] / [`EventListener`] endpoints and the
//!   [`EventHandler`] trait.
//! - [`events`]: the plain-data event records exchanged between subsystems.
//!
//! A subsystem that produces events owns an [`EventSender`] per event type; a
//! subsystem that reacts owns an [`EventListener`] per event type and
//! implements [`EventHandler`] once per type. Wiring happens explicitly with
//! [`EventSender::bind`], so producers never reference their consumers.

pub mod channel;
pub mod events;

pub use channel::{EventHandler, EventListener, EventSender};
pub use events::{
    AnimationAction, AnimationEvent, CollisionEvent, FocusEvent, InputEvent, MoveEvent, MoveKind,
    PowerupEffect, TeleportEvent, TriggerEvent, TriggerOutcome,
};
