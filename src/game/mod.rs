//! Combat Simulation Module
//!
//! A lightweight ECS-inspired core for the arena fights. Inspired by Bevy's
//! patterns but cut down to exactly what a run needs.
//!
//! Key concepts:
//! - Entity: generational index, stable for the whole tick
//! - Component: plain data records stored in generation-checked slots
//! - World: every collection plus the deferred despawn queue
//! - Event: one queued signal per occurrence, drained by the presenter
//! - Session: the fixed per-tick order over all systems
//!
//! Design philosophy:
//! - Simple over flexible (we know what game we're making)
//! - Systems mark, cleanup removes
//! - No rendering or audio; presentation sits behind the `Presenter` trait

pub mod entity;
pub mod component;
pub mod components;
pub mod world;
pub mod event;
pub mod transform;
pub mod present;
pub mod physics;
pub mod stats;
pub mod skills;
pub mod collision;
pub mod gravity;
pub mod movement;
pub mod spawn;
pub mod progression;
pub mod runtime;

// Re-export main types
pub use components::{Enemy, Orb, Player, Projectile, Tier};
pub use entity::Entity;
pub use event::Events;
pub use present::{HeadlessPresenter, HudPayload, Presenter, Screen, ScreenId, VisualHandle, VisualKind};
pub use runtime::{RunOutcome, RunSummary, Session, SessionError};
pub use skills::SkillId;
pub use stats::{recompute, Stats};
pub use transform::Transform2;
pub use world::World;
