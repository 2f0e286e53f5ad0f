//! # rpg_component
//!
//! The "C" in the dungeon simulation: object identity and per-type component
//! storage.
//!
//! This crate provides:
//!
//! - [`ObjectId`] / [`SceneId`]: lightweight non-zero identifiers.
//! - [`IdManager`]: allocates and recycles object identifiers.
//! - [`Component`] trait: the contract all per-entity records satisfy.
//! - [`ComponentManager`]: id-indexed storage for one component type.
//! - [`ChangeBuffer`]: deferred acquire/release applied after an iteration pass.
//! - [`EnumMap`]: fixed-size arrays indexed by an enum's ordinal.

pub mod change;
pub mod component;
pub mod entity;
pub mod enum_map;

pub use change::ChangeBuffer;
pub use component::{Component, ComponentManager};
pub use entity::{IdManager, ObjectId, SceneId};
pub use enum_map::{EnumIndex, EnumMap};
