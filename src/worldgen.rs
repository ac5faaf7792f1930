//! World Generation
//!
//! Builds the arena for a stage: extents, the gravity field (when the
//! stage has one) and the player spawn point. Generation runs on a
//! background thread and is polled once per frame by the phase machine,
//! which keeps drawing the loading screen but runs no combat meanwhile.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

#[cfg(not(target_arch = "wasm32"))]
use std::sync::mpsc::{channel, Receiver, TryRecvError};
#[cfg(not(target_arch = "wasm32"))]
use std::thread;

use crate::catalog::Stage;
use crate::game::gravity::GravityField;
use crate::game::world::Bounds;
use crate::tuning::Tuning;

/// Error type for world generation
#[derive(Debug, Clone, PartialEq)]
pub enum WorldGenError {
    /// Stage numbers that cannot produce a playable arena
    InvalidStage(String),
    /// The generator thread went away without an answer
    Interrupted,
}

impl std::fmt::Display for WorldGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorldGenError::InvalidStage(msg) => write!(f, "invalid stage: {}", msg),
            WorldGenError::Interrupted => write!(f, "world generation was interrupted"),
        }
    }
}

impl std::error::Error for WorldGenError {}

pub type GenResult<T> = Result<T, WorldGenError>;

/// A generated arena, ready to be handed to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Arena {
    pub stage: &'static Stage,
    pub bounds: Bounds,
    pub field: Option<GravityField>,
    /// Seeds the session rng so a replayed arena replays its spawns
    pub seed: u64,
    pub player_spawn: Vec2,
}

/// Field sits between these fractions of the short half-extent from the centre.
const FIELD_MIN_OFFSET: f32 = 0.35;
const FIELD_MAX_OFFSET: f32 = 0.6;

/// Keep at least this many horizon radii between the spawn and the field.
const SPAWN_CLEARANCE: f32 = 2.0;

/// Build the arena for `stage`.
pub fn generate_arena(stage: &'static Stage, tuning: &Tuning, seed: u64) -> GenResult<Arena> {
    if !(stage.arena_scale.is_finite() && stage.arena_scale > 0.0) {
        return Err(WorldGenError::InvalidStage(format!(
            "{}: arena scale {} must be positive",
            stage.name, stage.arena_scale
        )));
    }
    if !stage.spawn_rate.is_finite() || stage.spawn_rate < 0.0 {
        return Err(WorldGenError::InvalidStage(format!(
            "{}: spawn rate {} must not be negative",
            stage.name, stage.spawn_rate
        )));
    }

    let bounds = Bounds::new(
        tuning.arena.half_width * stage.arena_scale,
        tuning.arena.half_height * stage.arena_scale,
    );
    let mut rng = StdRng::seed_from_u64(seed);
    let player_spawn = Vec2::ZERO;

    let field = if stage.has_field() {
        if stage.horizon_radius <= 0.0 || stage.horizon_radius >= stage.field_radius {
            return Err(WorldGenError::InvalidStage(format!(
                "{}: horizon {} must be inside field radius {}",
                stage.name, stage.horizon_radius, stage.field_radius
            )));
        }
        let short = bounds.half.x.min(bounds.half.y);
        let distance = (short * rng.gen_range(FIELD_MIN_OFFSET..FIELD_MAX_OFFSET))
            .max(stage.horizon_radius * SPAWN_CLEARANCE);
        let position = player_spawn + Vec2::from_angle(rng.gen_range(0.0..TAU)) * distance;
        Some(GravityField::new(
            bounds.clamp(position, stage.horizon_radius),
            tuning.gravity.strength * stage.field_strength,
            stage.field_radius,
            stage.horizon_radius,
            &tuning.gravity,
        ))
    } else {
        None
    };

    log::info!(
        "generated arena '{}' ({}x{}, field: {})",
        stage.name,
        bounds.half.x * 2.0,
        bounds.half.y * 2.0,
        field.is_some()
    );

    Ok(Arena {
        stage,
        bounds,
        field,
        seed,
        player_spawn,
    })
}

// ============================================================================
// Background generation
// ============================================================================

/// A handle to a pending generation that can be polled
#[cfg(not(target_arch = "wasm32"))]
pub struct AsyncOp<T> {
    receiver: Receiver<GenResult<T>>,
    result: Option<GenResult<T>>,
}

#[cfg(not(target_arch = "wasm32"))]
impl<T> AsyncOp<T> {
    fn from_receiver(receiver: Receiver<GenResult<T>>) -> Self {
        Self {
            receiver,
            result: None,
        }
    }

    /// Check if the operation has completed (polls the channel)
    pub fn is_complete(&mut self) -> bool {
        if self.result.is_some() {
            return true;
        }

        match self.receiver.try_recv() {
            Ok(result) => {
                self.result = Some(result);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.result = Some(Err(WorldGenError::Interrupted));
                true
            }
        }
    }

    /// Take the result if complete
    pub fn take(mut self) -> Option<GenResult<T>> {
        if self.result.is_none() {
            if let Ok(result) = self.receiver.try_recv() {
                self.result = Some(result);
            }
        }
        self.result
    }
}

/// Start generating on a background thread
#[cfg(not(target_arch = "wasm32"))]
pub fn generate_async(stage: &'static Stage, tuning: Tuning, seed: u64) -> AsyncOp<Arena> {
    let (sender, receiver) = channel();
    thread::spawn(move || {
        let _ = sender.send(generate_arena(stage, &tuning, seed));
    });
    AsyncOp::from_receiver(receiver)
}

#[cfg(target_arch = "wasm32")]
pub struct AsyncOp<T> {
    result: Option<GenResult<T>>,
}

#[cfg(target_arch = "wasm32")]
impl<T> AsyncOp<T> {
    pub fn is_complete(&mut self) -> bool {
        true
    }

    pub fn take(self) -> Option<GenResult<T>> {
        self.result
    }
}

/// No threads on WASM: generate in place
#[cfg(target_arch = "wasm32")]
pub fn generate_async(stage: &'static Stage, tuning: Tuning, seed: u64) -> AsyncOp<Arena> {
    AsyncOp {
        result: Some(generate_arena(stage, &tuning, seed)),
    }
}
