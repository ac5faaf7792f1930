//! VOIDRUSH: combat core of a top-down survival roguelite
//!
//! Everything that decides what happens in a run lives here:
//! - real-time movement, spawning and collision with mass-scaled knockback
//! - a radial gravity well with an event horizon
//! - a catalogue of skills that reshape the fight while it runs
//! - levels, kill streaks and the menu-to-result phase flow
//!
//! Drawing and sound are somebody else's job; see `game::Presenter`.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod catalog;
pub mod game;
pub mod tuning;
pub mod worldgen;
