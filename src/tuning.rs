//! Gameplay tuning
//!
//! Every constant the simulation reads lives in `Tuning`. Defaults are
//! compiled in; a RON file can override any subset of fields (missing
//! fields fall back to the defaults via `#[serde(default)]`).
//!
//! Loading validates the values so a typo in a tuning file cannot feed a
//! zero interval or a negative mass into the tick.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Validation limits for loaded tuning files
pub mod limits {
    /// Largest value any single tuning number may take
    pub const MAX_VALUE: f32 = 1_000_000.0;
    /// Longest session we accept (seconds)
    pub const MAX_SESSION: f32 = 24.0 * 60.0 * 60.0;
    /// Most combo thresholds we accept
    pub const MAX_COMBO_TIERS: usize = 32;
}

/// Error type for tuning loading
#[derive(Debug)]
pub enum TuningError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
    ValidationError(String),
}

impl From<std::io::Error> for TuningError {
    fn from(e: std::io::Error) -> Self {
        TuningError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for TuningError {
    fn from(e: ron::error::SpannedError) -> Self {
        TuningError::ParseError(e)
    }
}

impl From<ron::Error> for TuningError {
    fn from(e: ron::Error) -> Self {
        TuningError::SerializeError(e)
    }
}

impl std::fmt::Display for TuningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TuningError::IoError(e) => write!(f, "IO error: {}", e),
            TuningError::ParseError(e) => write!(f, "Parse error: {}", e),
            TuningError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            TuningError::ValidationError(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for TuningError {}

/// Playfield extents. The arena is centred on the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTuning {
    pub half_width: f32,
    pub half_height: f32,
    /// Enemies appear this far outside the arena edge
    pub spawn_margin: f32,
    /// Projectiles further than this outside the edge are dropped
    pub despawn_margin: f32,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            half_width: 900.0,
            half_height: 600.0,
            spawn_margin: 40.0,
            despawn_margin: 200.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub move_speed: f32,
    pub size: f32,
    pub max_health: f32,
    /// External velocity is multiplied by this once per 1/60 s
    pub external_decay: f32,
    /// Health lost per tick per touching enemy
    pub contact_damage: f32,
    /// Push applied to a touching enemy per tick
    pub contact_knockback: f32,
    pub pickup_radius: f32,
    pub magnet_speed: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            move_speed: 220.0,
            size: 28.0,
            max_health: 100.0,
            external_decay: 0.9,
            contact_damage: 0.25,
            contact_knockback: 18.0,
            pickup_radius: 90.0,
            magnet_speed: 420.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponTuning {
    /// Seconds between volleys before fire-rate multipliers
    pub fire_interval: f32,
    pub projectile_speed: f32,
    pub projectile_damage: f32,
    pub projectile_mass: f32,
    pub projectile_size: f32,
    pub lifetime: f32,
    /// Angle between projectiles of one volley (radians)
    pub spread: f32,
    /// Fraction of normal speed kept after a bounce
    pub restitution: f32,
    /// Damage lost per pierced enemy, as a fraction of base damage
    pub pierce_decay: f32,
    pub knockback_force: f32,
}

impl Default for WeaponTuning {
    fn default() -> Self {
        Self {
            fire_interval: 0.6,
            projectile_speed: 520.0,
            projectile_damage: 10.0,
            projectile_mass: 1.0,
            projectile_size: 10.0,
            lifetime: 2.5,
            spread: 0.12,
            restitution: 0.8,
            pierce_decay: 0.25,
            knockback_force: 160.0,
        }
    }
}

/// Per-tier enemy numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierTuning {
    pub health: f32,
    pub mass: f32,
    pub size: f32,
    pub speed: f32,
    pub orb_value: u32,
    pub score: u32,
}

impl Default for TierTuning {
    fn default() -> Self {
        Self {
            health: 20.0,
            mass: 1.0,
            size: 24.0,
            speed: 90.0,
            orb_value: 1,
            score: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub small: TierTuning,
    pub medium: TierTuning,
    pub large: TierTuning,
    pub boss: TierTuning,
    /// How quickly enemies turn knockback back into chase (1/s)
    pub steering: f32,
    /// Seconds two compatible enemies must overlap before merging
    pub merge_contact_time: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            small: TierTuning {
                health: 20.0,
                mass: 1.0,
                size: 24.0,
                speed: 95.0,
                orb_value: 1,
                score: 10,
            },
            medium: TierTuning {
                health: 60.0,
                mass: 3.0,
                size: 36.0,
                speed: 75.0,
                orb_value: 3,
                score: 30,
            },
            large: TierTuning {
                health: 180.0,
                mass: 8.0,
                size: 56.0,
                speed: 55.0,
                orb_value: 8,
                score: 100,
            },
            boss: TierTuning {
                health: 2500.0,
                mass: 40.0,
                size: 110.0,
                speed: 45.0,
                orb_value: 50,
                score: 2000,
            },
            steering: 4.0,
            merge_contact_time: 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    pub interval_start: f32,
    pub interval_end: f32,
    /// Seconds over which interval/count/weights move from start to end
    pub ramp_duration: f32,
    pub count_start: f32,
    pub count_end: f32,
    /// Weights for small, medium, large at t = 0. Bosses only come from
    /// the one-shot trigger.
    pub weights_early: [f32; 3],
    /// Weights at the end of the ramp
    pub weights_late: [f32; 3],
    pub formation_interval: f32,
    pub formation_size: u32,
    pub formation_radius: f32,
    pub boss_time: f32,
    /// Delay between the warning and the boss appearing
    pub boss_delay: f32,
    pub session_duration: f32,
    pub max_enemies: usize,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            interval_start: 1.4,
            interval_end: 0.3,
            ramp_duration: 480.0,
            count_start: 1.0,
            count_end: 6.0,
            weights_early: [1.0, 0.0, 0.0],
            weights_late: [0.25, 0.35, 0.4],
            formation_interval: 25.0,
            formation_size: 10,
            formation_radius: 90.0,
            boss_time: 420.0,
            boss_delay: 3.0,
            session_duration: 600.0,
            max_enemies: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityTuning {
    /// G·M of the field source
    pub strength: f32,
    /// Distances below this are clamped when computing the force
    pub min_distance: f32,
    pub max_force: f32,
    pub player_coupling: f32,
    pub enemy_coupling: f32,
    pub projectile_coupling: f32,
    /// Seconds between horizon damage ticks on the player
    pub horizon_dot_interval: f32,
    pub horizon_dot_damage: f32,
    /// Escape impulse at the very centre; scales down to zero at the horizon
    pub escape_impulse: f32,
}

impl Default for GravityTuning {
    fn default() -> Self {
        Self {
            strength: 4.0e6,
            min_distance: 30.0,
            max_force: 900.0,
            player_coupling: 0.35,
            enemy_coupling: 1.0,
            projectile_coupling: 0.6,
            horizon_dot_interval: 0.5,
            horizon_dot_damage: 4.0,
            escape_impulse: 600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionTuning {
    /// Linear part of the level threshold curve
    pub xp_base: f32,
    /// Quadratic part of the level threshold curve
    pub xp_growth: f32,
    pub max_skill_level: u8,
    /// Skills offered per level-up
    pub offer_count: usize,
}

impl Default for ProgressionTuning {
    fn default() -> Self {
        Self {
            xp_base: 5.0,
            xp_growth: 2.5,
            max_skill_level: 5,
            offer_count: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboTuning {
    /// Seconds a streak survives without a kill
    pub window: f32,
    /// Streak counts that emit a kill-streak signal, ascending
    pub thresholds: Vec<u32>,
}

impl Default for ComboTuning {
    fn default() -> Self {
        Self {
            window: 2.0,
            thresholds: vec![5, 10, 25, 50, 100],
        }
    }
}

/// Hitstop and shake numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeelTuning {
    pub hitstop_large: f32,
    pub hitstop_boss: f32,
    pub shake_large: f32,
    pub shake_boss: f32,
    pub shake_player_hit: f32,
}

impl Default for FeelTuning {
    fn default() -> Self {
        Self {
            hitstop_large: 0.05,
            hitstop_boss: 0.25,
            shake_large: 0.4,
            shake_boss: 1.0,
            shake_player_hit: 0.15,
        }
    }
}

/// A skill number as a function of its level:
/// `base + per_level * level`, held inside `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelScaled {
    pub base: f32,
    pub per_level: f32,
    pub min: f32,
    pub max: f32,
}

impl Default for LevelScaled {
    fn default() -> Self {
        Self::flat(0.0)
    }
}

impl LevelScaled {
    pub const fn linear(base: f32, per_level: f32) -> Self {
        Self {
            base,
            per_level,
            min: 0.0,
            max: limits::MAX_VALUE,
        }
    }

    pub const fn flat(value: f32) -> Self {
        Self::linear(value, 0.0)
    }

    pub const fn at_least(mut self, min: f32) -> Self {
        self.min = min;
        self
    }

    pub const fn at_most(mut self, max: f32) -> Self {
        self.max = max;
        self
    }

    pub fn at(&self, level: u8) -> f32 {
        (self.base + self.per_level * level as f32).max(self.min).min(self.max)
    }

    /// Rounded, for counts (projectiles, hops, chain depth).
    pub fn count_at(&self, level: u8) -> u32 {
        self.at(level).round() as u32
    }
}

/// Per-level factors and increments of the stat-only skills
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticSkillTuning {
    /// Damage multiplier per level (compounded)
    pub might: f32,
    pub haste: f32,
    pub swiftness: f32,
    pub impact: f32,
    pub vitality: f32,
    pub magnetism: f32,
    /// Extra pierce per level
    pub piercing: u32,
    pub ricochet: u32,
    pub multishot: u32,
}

impl Default for StaticSkillTuning {
    fn default() -> Self {
        Self {
            might: 1.15,
            haste: 1.12,
            swiftness: 1.08,
            impact: 1.2,
            vitality: 1.15,
            magnetism: 1.3,
            piercing: 1,
            ricochet: 1,
            multishot: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseTuning {
    pub interval: LevelScaled,
    pub radius: LevelScaled,
    pub damage: LevelScaled,
    pub force: LevelScaled,
}

impl Default for PulseTuning {
    fn default() -> Self {
        Self {
            interval: LevelScaled::linear(3.3, -0.3).at_least(0.5),
            radius: LevelScaled::linear(140.0, 20.0),
            damage: LevelScaled::linear(12.0, 6.0),
            force: LevelScaled::linear(260.0, 40.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuraTuning {
    pub radius: LevelScaled,
    pub dps: LevelScaled,
    /// Sub-interval between damage ticks
    pub tick: LevelScaled,
    pub epsilon: LevelScaled,
    /// Most sub-ticks resolved in one frame
    pub max_steps: u32,
}

impl Default for AuraTuning {
    fn default() -> Self {
        Self {
            radius: LevelScaled::linear(110.0, 15.0),
            dps: LevelScaled::linear(6.0, 4.0),
            tick: LevelScaled::flat(0.25),
            epsilon: LevelScaled::flat(0.1),
            max_steps: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmTuning {
    pub period: LevelScaled,
    pub peak: LevelScaled,
}

impl Default for RhythmTuning {
    fn default() -> Self {
        Self {
            period: LevelScaled::flat(4.0),
            peak: LevelScaled::linear(0.2, 0.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatTuning {
    pub f1: LevelScaled,
    pub f2: LevelScaled,
    pub threshold: LevelScaled,
    pub min_gap: LevelScaled,
    pub radius: LevelScaled,
    pub damage: LevelScaled,
}

impl Default for BeatTuning {
    fn default() -> Self {
        Self {
            f1: LevelScaled::flat(2.0),
            f2: LevelScaled::linear(2.25, 0.05),
            threshold: LevelScaled::flat(0.95).at_most(1.0),
            min_gap: LevelScaled::flat(0.5),
            radius: LevelScaled::linear(160.0, 15.0),
            damage: LevelScaled::linear(15.0, 8.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosTuning {
    pub radius: LevelScaled,
    pub strength: LevelScaled,
}

impl Default for ChaosTuning {
    fn default() -> Self {
        Self {
            radius: LevelScaled::linear(180.0, 20.0),
            strength: LevelScaled::linear(300.0, 80.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowTuning {
    pub radius: LevelScaled,
    pub angular_speed: LevelScaled,
    pub band: LevelScaled,
    pub pull: LevelScaled,
    pub push: LevelScaled,
}

impl Default for FlowTuning {
    fn default() -> Self {
        Self {
            radius: LevelScaled::flat(300.0),
            angular_speed: LevelScaled::flat(0.6),
            band: LevelScaled::linear(60.0, 10.0),
            pull: LevelScaled::linear(120.0, 30.0),
            push: LevelScaled::linear(80.0, 20.0),
        }
    }
}

/// Shared by the attractor and the repulsor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceFieldTuning {
    pub strength: LevelScaled,
    pub radius: LevelScaled,
    pub epsilon: LevelScaled,
}

impl ForceFieldTuning {
    fn attractor() -> Self {
        Self {
            strength: LevelScaled::linear(25.0, 10.0),
            radius: LevelScaled::linear(240.0, 20.0),
            epsilon: LevelScaled::flat(0.05),
        }
    }

    fn repulsor() -> Self {
        Self {
            strength: LevelScaled::linear(35.0, 15.0),
            ..Self::attractor()
        }
    }
}

impl Default for ForceFieldTuning {
    fn default() -> Self {
        Self::attractor()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathChainTuning {
    pub chance: LevelScaled,
    pub radius: LevelScaled,
    pub damage: LevelScaled,
}

impl Default for DeathChainTuning {
    fn default() -> Self {
        Self {
            chance: LevelScaled::linear(0.15, 0.05).at_most(1.0),
            radius: LevelScaled::linear(90.0, 10.0),
            damage: LevelScaled::linear(10.0, 6.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitChainTuning {
    pub depth: LevelScaled,
    pub fraction: LevelScaled,
    pub range: LevelScaled,
}

impl Default for HitChainTuning {
    fn default() -> Self {
        Self {
            depth: LevelScaled::linear(1.0, 1.0),
            fraction: LevelScaled::flat(0.5).at_most(1.0),
            range: LevelScaled::linear(160.0, 10.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscapeTuning {
    /// Trigger speed as a multiple of the player's final move speed
    pub threshold_factor: LevelScaled,
    pub radius: LevelScaled,
    pub damage: LevelScaled,
    pub force: LevelScaled,
    pub cooldown: LevelScaled,
}

impl Default for EscapeTuning {
    fn default() -> Self {
        Self {
            threshold_factor: LevelScaled::flat(1.25),
            radius: LevelScaled::linear(150.0, 20.0),
            damage: LevelScaled::linear(20.0, 10.0),
            force: LevelScaled::flat(300.0),
            cooldown: LevelScaled::flat(1.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DopplerTuning {
    pub strength: LevelScaled,
    pub reference_speed: LevelScaled,
    pub approach_cap: LevelScaled,
    pub recede_cap: LevelScaled,
}

impl Default for DopplerTuning {
    fn default() -> Self {
        Self {
            strength: LevelScaled::linear(0.5, 0.15),
            reference_speed: LevelScaled::flat(300.0),
            approach_cap: LevelScaled::linear(0.5, 0.1),
            recede_cap: LevelScaled::flat(0.3).at_most(1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitTuning {
    pub count: LevelScaled,
    pub radius: LevelScaled,
    /// Linear speed shared by every orbit radius (world units per second)
    pub linear_speed: LevelScaled,
    pub damage: LevelScaled,
    pub hit_cooldown: LevelScaled,
    pub size: LevelScaled,
}

impl Default for OrbitTuning {
    fn default() -> Self {
        Self {
            count: LevelScaled::linear(1.0, 1.0),
            radius: LevelScaled::linear(80.0, 10.0),
            linear_speed: LevelScaled::flat(300.0),
            damage: LevelScaled::linear(8.0, 4.0),
            hit_cooldown: LevelScaled::flat(0.5),
            size: LevelScaled::flat(14.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostTuning {
    pub interval: LevelScaled,
    pub duration: LevelScaled,
    pub damage: LevelScaled,
}

impl Default for GhostTuning {
    fn default() -> Self {
        Self {
            interval: LevelScaled::linear(8.0, -0.5).at_least(2.0),
            duration: LevelScaled::linear(1.5, 0.25),
            damage: LevelScaled::linear(20.0, 10.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamTuning {
    pub hops: LevelScaled,
    pub range: LevelScaled,
    pub dps: LevelScaled,
}

impl Default for BeamTuning {
    fn default() -> Self {
        Self {
            hops: LevelScaled::linear(1.0, 1.0),
            range: LevelScaled::linear(200.0, 20.0),
            dps: LevelScaled::linear(18.0, 8.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeflectorTuning {
    pub radius: LevelScaled,
    pub strength: LevelScaled,
}

impl Default for DeflectorTuning {
    fn default() -> Self {
        Self {
            radius: LevelScaled::linear(200.0, 20.0),
            strength: LevelScaled::linear(2.0, 0.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardTuning {
    pub interval: LevelScaled,
    pub duration: LevelScaled,
    pub radius: LevelScaled,
    pub damage: LevelScaled,
    pub drift: LevelScaled,
}

impl Default for HazardTuning {
    fn default() -> Self {
        Self {
            interval: LevelScaled::linear(4.0, -0.3).at_least(1.0),
            duration: LevelScaled::flat(2.5),
            radius: LevelScaled::linear(110.0, 15.0),
            damage: LevelScaled::linear(30.0, 15.0),
            drift: LevelScaled::flat(30.0),
        }
    }
}

/// Numbers behind every skill, read by `recompute`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillTuning {
    pub stat: StaticSkillTuning,
    pub pulse: PulseTuning,
    pub aura: AuraTuning,
    pub rhythm: RhythmTuning,
    pub beat: BeatTuning,
    pub chaos: ChaosTuning,
    pub flow: FlowTuning,
    pub attractor: ForceFieldTuning,
    pub repulsor: ForceFieldTuning,
    pub death_chain: DeathChainTuning,
    pub hit_chain: HitChainTuning,
    pub escape: EscapeTuning,
    pub doppler: DopplerTuning,
    pub orbit: OrbitTuning,
    pub ghost: GhostTuning,
    pub beam: BeamTuning,
    pub deflector: DeflectorTuning,
    pub hazard: HazardTuning,
}

impl Default for SkillTuning {
    fn default() -> Self {
        Self {
            stat: StaticSkillTuning::default(),
            pulse: PulseTuning::default(),
            aura: AuraTuning::default(),
            rhythm: RhythmTuning::default(),
            beat: BeatTuning::default(),
            chaos: ChaosTuning::default(),
            flow: FlowTuning::default(),
            attractor: ForceFieldTuning::attractor(),
            repulsor: ForceFieldTuning::repulsor(),
            death_chain: DeathChainTuning::default(),
            hit_chain: HitChainTuning::default(),
            escape: EscapeTuning::default(),
            doppler: DopplerTuning::default(),
            orbit: OrbitTuning::default(),
            ghost: GhostTuning::default(),
            beam: BeamTuning::default(),
            deflector: DeflectorTuning::default(),
            hazard: HazardTuning::default(),
        }
    }
}

/// Root of the tuning tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub arena: ArenaTuning,
    pub player: PlayerTuning,
    pub weapon: WeaponTuning,
    pub enemies: EnemyTuning,
    pub spawn: SpawnTuning,
    pub gravity: GravityTuning,
    pub progression: ProgressionTuning,
    pub combo: ComboTuning,
    pub feel: FeelTuning,
    pub skills: SkillTuning,
}

fn check_positive(value: f32, name: &str) -> Result<(), String> {
    if !value.is_finite() || value <= 0.0 || value > limits::MAX_VALUE {
        return Err(format!("{} must be in (0, {}], got {}", name, limits::MAX_VALUE, value));
    }
    Ok(())
}

fn check_non_negative(value: f32, name: &str) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 || value > limits::MAX_VALUE {
        return Err(format!("{} must be in [0, {}], got {}", name, limits::MAX_VALUE, value));
    }
    Ok(())
}

fn check_unit(value: f32, name: &str) -> Result<(), String> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(format!("{} must be in [0, 1], got {}", name, value));
    }
    Ok(())
}

fn validate_tier(tier: &TierTuning, name: &str) -> Result<(), String> {
    check_positive(tier.health, &format!("{}.health", name))?;
    check_positive(tier.mass, &format!("{}.mass", name))?;
    check_positive(tier.size, &format!("{}.size", name))?;
    check_non_negative(tier.speed, &format!("{}.speed", name))?;
    Ok(())
}

fn validate_weights(weights: &[f32; 3], name: &str) -> Result<(), String> {
    for (i, w) in weights.iter().enumerate() {
        check_non_negative(*w, &format!("{}[{}]", name, i))?;
    }
    if weights.iter().sum::<f32>() <= 0.0 {
        return Err(format!("{} must not be all zero", name));
    }
    Ok(())
}

fn validate_scaled(v: &LevelScaled, name: &str) -> Result<(), String> {
    for (x, field) in [(v.base, "base"), (v.per_level, "per_level"), (v.min, "min"), (v.max, "max")] {
        if !x.is_finite() || x.abs() > limits::MAX_VALUE {
            return Err(format!("{}.{} must be finite and within {}, got {}", name, field, limits::MAX_VALUE, x));
        }
    }
    if v.min < 0.0 || v.min > v.max {
        return Err(format!("{} needs 0 <= min <= max, got [{}, {}]", name, v.min, v.max));
    }
    Ok(())
}

/// Like `validate_scaled`, and the value must stay above zero at every
/// level a skill can reach.
fn validate_scaled_positive(v: &LevelScaled, name: &str, max_level: u8) -> Result<(), String> {
    validate_scaled(v, name)?;
    if let Some(level) = (1..=max_level).find(|l| v.at(*l) <= 0.0) {
        return Err(format!("{} must be positive, is {} at level {}", name, v.at(level), level));
    }
    Ok(())
}

fn validate_skills(k: &SkillTuning, max_level: u8) -> Result<(), String> {
    check_positive(k.stat.might, "skills.stat.might")?;
    check_positive(k.stat.haste, "skills.stat.haste")?;
    check_positive(k.stat.swiftness, "skills.stat.swiftness")?;
    check_positive(k.stat.impact, "skills.stat.impact")?;
    check_positive(k.stat.vitality, "skills.stat.vitality")?;
    check_positive(k.stat.magnetism, "skills.stat.magnetism")?;

    let positive = [
        (&k.pulse.interval, "skills.pulse.interval"),
        (&k.aura.tick, "skills.aura.tick"),
        (&k.rhythm.period, "skills.rhythm.period"),
        (&k.orbit.radius, "skills.orbit.radius"),
        (&k.ghost.interval, "skills.ghost.interval"),
        (&k.ghost.duration, "skills.ghost.duration"),
        (&k.hazard.interval, "skills.hazard.interval"),
        (&k.hazard.duration, "skills.hazard.duration"),
    ];
    for (v, name) in positive {
        validate_scaled_positive(v, name, max_level)?;
    }

    let rest = [
        (&k.pulse.radius, "skills.pulse.radius"),
        (&k.pulse.damage, "skills.pulse.damage"),
        (&k.pulse.force, "skills.pulse.force"),
        (&k.aura.radius, "skills.aura.radius"),
        (&k.aura.dps, "skills.aura.dps"),
        (&k.aura.epsilon, "skills.aura.epsilon"),
        (&k.rhythm.peak, "skills.rhythm.peak"),
        (&k.beat.f1, "skills.beat.f1"),
        (&k.beat.f2, "skills.beat.f2"),
        (&k.beat.threshold, "skills.beat.threshold"),
        (&k.beat.min_gap, "skills.beat.min_gap"),
        (&k.beat.radius, "skills.beat.radius"),
        (&k.beat.damage, "skills.beat.damage"),
        (&k.chaos.radius, "skills.chaos.radius"),
        (&k.chaos.strength, "skills.chaos.strength"),
        (&k.flow.radius, "skills.flow.radius"),
        (&k.flow.angular_speed, "skills.flow.angular_speed"),
        (&k.flow.band, "skills.flow.band"),
        (&k.flow.pull, "skills.flow.pull"),
        (&k.flow.push, "skills.flow.push"),
        (&k.attractor.strength, "skills.attractor.strength"),
        (&k.attractor.radius, "skills.attractor.radius"),
        (&k.attractor.epsilon, "skills.attractor.epsilon"),
        (&k.repulsor.strength, "skills.repulsor.strength"),
        (&k.repulsor.radius, "skills.repulsor.radius"),
        (&k.repulsor.epsilon, "skills.repulsor.epsilon"),
        (&k.death_chain.chance, "skills.death_chain.chance"),
        (&k.death_chain.radius, "skills.death_chain.radius"),
        (&k.death_chain.damage, "skills.death_chain.damage"),
        (&k.hit_chain.depth, "skills.hit_chain.depth"),
        (&k.hit_chain.fraction, "skills.hit_chain.fraction"),
        (&k.hit_chain.range, "skills.hit_chain.range"),
        (&k.escape.threshold_factor, "skills.escape.threshold_factor"),
        (&k.escape.radius, "skills.escape.radius"),
        (&k.escape.damage, "skills.escape.damage"),
        (&k.escape.force, "skills.escape.force"),
        (&k.escape.cooldown, "skills.escape.cooldown"),
        (&k.doppler.strength, "skills.doppler.strength"),
        (&k.doppler.reference_speed, "skills.doppler.reference_speed"),
        (&k.doppler.approach_cap, "skills.doppler.approach_cap"),
        (&k.doppler.recede_cap, "skills.doppler.recede_cap"),
        (&k.orbit.count, "skills.orbit.count"),
        (&k.orbit.linear_speed, "skills.orbit.linear_speed"),
        (&k.orbit.damage, "skills.orbit.damage"),
        (&k.orbit.hit_cooldown, "skills.orbit.hit_cooldown"),
        (&k.orbit.size, "skills.orbit.size"),
        (&k.ghost.damage, "skills.ghost.damage"),
        (&k.beam.hops, "skills.beam.hops"),
        (&k.beam.range, "skills.beam.range"),
        (&k.beam.dps, "skills.beam.dps"),
        (&k.deflector.radius, "skills.deflector.radius"),
        (&k.deflector.strength, "skills.deflector.strength"),
        (&k.hazard.radius, "skills.hazard.radius"),
        (&k.hazard.damage, "skills.hazard.damage"),
        (&k.hazard.drift, "skills.hazard.drift"),
    ];
    for (v, name) in rest {
        validate_scaled(v, name)?;
    }

    if k.aura.max_steps == 0 {
        return Err("skills.aura.max_steps must be at least 1".into());
    }
    Ok(())
}

impl Tuning {
    /// Parse RON text. Missing fields keep their defaults.
    pub fn from_ron_str(text: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = ron::from_str(text)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load and validate a RON tuning file.
    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let text = fs::read_to_string(path)?;
        let tuning = Self::from_ron_str(&text)?;
        log::info!("loaded tuning from {}", path.display());
        Ok(tuning)
    }

    pub fn to_ron_string(&self) -> Result<String, TuningError> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), TuningError> {
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// Reject values the tick cannot work with.
    pub fn validate(&self) -> Result<(), TuningError> {
        self.validate_inner().map_err(TuningError::ValidationError)
    }

    fn validate_inner(&self) -> Result<(), String> {
        check_positive(self.arena.half_width, "arena.half_width")?;
        check_positive(self.arena.half_height, "arena.half_height")?;
        check_non_negative(self.arena.spawn_margin, "arena.spawn_margin")?;
        check_non_negative(self.arena.despawn_margin, "arena.despawn_margin")?;

        check_non_negative(self.player.move_speed, "player.move_speed")?;
        check_positive(self.player.size, "player.size")?;
        check_positive(self.player.max_health, "player.max_health")?;
        check_unit(self.player.external_decay, "player.external_decay")?;
        check_non_negative(self.player.contact_damage, "player.contact_damage")?;
        check_non_negative(self.player.pickup_radius, "player.pickup_radius")?;

        check_positive(self.weapon.fire_interval, "weapon.fire_interval")?;
        check_positive(self.weapon.projectile_speed, "weapon.projectile_speed")?;
        check_non_negative(self.weapon.projectile_damage, "weapon.projectile_damage")?;
        check_positive(self.weapon.projectile_mass, "weapon.projectile_mass")?;
        check_positive(self.weapon.projectile_size, "weapon.projectile_size")?;
        check_positive(self.weapon.lifetime, "weapon.lifetime")?;
        check_unit(self.weapon.pierce_decay, "weapon.pierce_decay")?;
        if !(0.0..1.0).contains(&self.weapon.restitution) {
            return Err(format!(
                "weapon.restitution must be in [0, 1), got {}",
                self.weapon.restitution
            ));
        }

        validate_tier(&self.enemies.small, "enemies.small")?;
        validate_tier(&self.enemies.medium, "enemies.medium")?;
        validate_tier(&self.enemies.large, "enemies.large")?;
        validate_tier(&self.enemies.boss, "enemies.boss")?;
        check_non_negative(self.enemies.steering, "enemies.steering")?;
        check_non_negative(self.enemies.merge_contact_time, "enemies.merge_contact_time")?;

        check_positive(self.spawn.interval_start, "spawn.interval_start")?;
        check_positive(self.spawn.interval_end, "spawn.interval_end")?;
        if self.spawn.interval_end > self.spawn.interval_start {
            return Err("spawn.interval_end must not exceed spawn.interval_start".into());
        }
        check_positive(self.spawn.ramp_duration, "spawn.ramp_duration")?;
        check_non_negative(self.spawn.count_start, "spawn.count_start")?;
        check_non_negative(self.spawn.count_end, "spawn.count_end")?;
        validate_weights(&self.spawn.weights_early, "spawn.weights_early")?;
        validate_weights(&self.spawn.weights_late, "spawn.weights_late")?;
        check_positive(self.spawn.formation_interval, "spawn.formation_interval")?;
        check_non_negative(self.spawn.boss_time, "spawn.boss_time")?;
        check_non_negative(self.spawn.boss_delay, "spawn.boss_delay")?;
        check_positive(self.spawn.session_duration, "spawn.session_duration")?;
        if self.spawn.session_duration > limits::MAX_SESSION {
            return Err(format!("spawn.session_duration exceeds {}", limits::MAX_SESSION));
        }

        check_non_negative(self.gravity.strength, "gravity.strength")?;
        check_positive(self.gravity.min_distance, "gravity.min_distance")?;
        check_positive(self.gravity.max_force, "gravity.max_force")?;
        check_positive(self.gravity.horizon_dot_interval, "gravity.horizon_dot_interval")?;

        check_positive(self.progression.xp_base, "progression.xp_base")?;
        check_non_negative(self.progression.xp_growth, "progression.xp_growth")?;
        if self.progression.max_skill_level == 0 {
            return Err("progression.max_skill_level must be at least 1".into());
        }
        validate_skills(&self.skills, self.progression.max_skill_level)?;

        check_positive(self.combo.window, "combo.window")?;
        if self.combo.thresholds.len() > limits::MAX_COMBO_TIERS {
            return Err(format!(
                "combo.thresholds has {} entries (max {})",
                self.combo.thresholds.len(),
                limits::MAX_COMBO_TIERS
            ));
        }
        if self.combo.thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err("combo.thresholds must be strictly ascending".into());
        }

        Ok(())
    }

    /// Tier numbers for a given tier.
    pub fn tier(&self, tier: crate::game::Tier) -> &TierTuning {
        use crate::game::Tier;
        match tier {
            Tier::Small => &self.enemies.small,
            Tier::Medium => &self.enemies.medium,
            Tier::Large => &self.enemies.large,
            Tier::Boss => &self.enemies.boss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let text = "(spawn: (boss_time: 12.0), combo: (window: 1.5))";
        let tuning = Tuning::from_ron_str(text).unwrap();
        assert_eq!(tuning.spawn.boss_time, 12.0);
        assert_eq!(tuning.combo.window, 1.5);
        assert_eq!(tuning.player, PlayerTuning::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Tuning::from_ron_str("(weapon: (fire_interval: 0.0))").unwrap_err();
        assert!(matches!(err, TuningError::ValidationError(_)));

        let err = Tuning::from_ron_str("(weapon: (restitution: 1.0))").unwrap_err();
        assert!(matches!(err, TuningError::ValidationError(_)));

        let err = Tuning::from_ron_str("(combo: (thresholds: [10, 5]))").unwrap_err();
        assert!(matches!(err, TuningError::ValidationError(_)));
    }

    #[test]
    fn test_skill_numbers_come_from_file() {
        let text = "(skills: (ghost: (interval: (base: 3.0, per_level: 0.0)), stat: (might: 1.5)))";
        let tuning = Tuning::from_ron_str(text).unwrap();
        assert_eq!(tuning.skills.ghost.interval.at(1), 3.0);
        assert_eq!(tuning.skills.ghost.duration, GhostTuning::default().duration);
        assert_eq!(tuning.skills.stat.might, 1.5);
        assert_eq!(tuning.skills.pulse, PulseTuning::default());
    }

    #[test]
    fn test_skill_interval_must_stay_positive() {
        // 1.0 - 0.5 * level hits zero at level 2
        let text = "(skills: (pulse: (interval: (base: 1.0, per_level: -0.5))))";
        let err = Tuning::from_ron_str(text).unwrap_err();
        assert!(matches!(err, TuningError::ValidationError(_)));

        let err = Tuning::from_ron_str("(skills: (aura: (max_steps: 0)))").unwrap_err();
        assert!(matches!(err, TuningError::ValidationError(_)));

        let text = "(skills: (beam: (range: (base: 10.0, min: 5.0, max: 1.0))))";
        let err = Tuning::from_ron_str(text).unwrap_err();
        assert!(matches!(err, TuningError::ValidationError(_)));
    }

    #[test]
    fn test_level_scaled_clamps() {
        let v = LevelScaled::linear(3.3, -0.3).at_least(0.5);
        assert!((v.at(1) - 3.0).abs() < 1e-5);
        assert_eq!(v.at(20), 0.5);
        let c = LevelScaled::linear(0.15, 0.05).at_most(1.0);
        assert_eq!(c.at(100), 1.0);
        assert_eq!(LevelScaled::linear(1.0, 1.0).count_at(3), 4);
    }

    #[test]
    fn test_parse_error_reported() {
        let err = Tuning::from_ron_str("(spawn: (boss_time: \"soon\"))").unwrap_err();
        assert!(matches!(err, TuningError::ParseError(_)));
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuning.ron");

        let mut tuning = Tuning::default();
        tuning.spawn.session_duration = 300.0;
        tuning.enemies.boss.health = 999.0;
        tuning.save(&path).unwrap();

        let loaded = Tuning::load(&path).unwrap();
        assert_eq!(loaded, tuning);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Tuning::load(&dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(err, TuningError::IoError(_)));
    }
}
