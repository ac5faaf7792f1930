//! Player stats
//!
//! `Stats` is never patched in place. Whenever the skill selection changes
//! the session calls `recompute` with the base numbers, the character,
//! the loadout and the passive trait and replaces its copy wholesale.
//!
//! Per-skill parameter blocks default to zero. A zero driving value means
//! the skill is not picked and its effect returns immediately. The numbers
//! for picked skills come from `SkillTuning` at the skill's level.

use serde::{Deserialize, Serialize};

use super::skills::SkillId;
use crate::catalog::{CharacterMultipliers, PassiveTrait};
use crate::tuning::{ForceFieldTuning, SkillTuning, Tuning};

/// Character-independent numbers taken from tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseStats {
    pub move_speed: f32,
    pub max_health: f32,
    pub fire_interval: f32,
    pub projectile_speed: f32,
    pub projectile_damage: f32,
    pub projectile_mass: f32,
    pub projectile_size: f32,
    pub projectile_lifetime: f32,
    pub spread: f32,
    pub restitution: f32,
    pub pierce_decay: f32,
    pub knockback_force: f32,
    pub pickup_radius: f32,
    pub magnet_speed: f32,
    pub skills: SkillTuning,
}

impl BaseStats {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        let w = &tuning.weapon;
        let p = &tuning.player;
        Self {
            move_speed: p.move_speed,
            max_health: p.max_health,
            fire_interval: w.fire_interval,
            projectile_speed: w.projectile_speed,
            projectile_damage: w.projectile_damage,
            projectile_mass: w.projectile_mass,
            projectile_size: w.projectile_size,
            projectile_lifetime: w.lifetime,
            spread: w.spread,
            restitution: w.restitution,
            pierce_decay: w.pierce_decay,
            knockback_force: w.knockback_force,
            pickup_radius: p.pickup_radius,
            magnet_speed: p.magnet_speed,
            skills: tuning.skills.clone(),
        }
    }
}

impl Default for BaseStats {
    fn default() -> Self {
        Self::from_tuning(&Tuning::default())
    }
}

/// Picked skills and their levels, in pick order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillLoadout {
    picks: Vec<(SkillId, u8)>,
}

impl SkillLoadout {
    pub fn level(&self, skill: SkillId) -> u8 {
        self.picks
            .iter()
            .find(|(s, _)| *s == skill)
            .map_or(0, |(_, l)| *l)
    }

    /// Pick a skill or raise its level. Returns false at `max_level`.
    pub fn add(&mut self, skill: SkillId, max_level: u8) -> bool {
        if let Some((_, level)) = self.picks.iter_mut().find(|(s, _)| *s == skill) {
            if *level >= max_level {
                return false;
            }
            *level += 1;
            return true;
        }
        if max_level == 0 {
            return false;
        }
        self.picks.push((skill, 1));
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (SkillId, u8)> + '_ {
        self.picks.iter().copied()
    }

    pub fn as_slice(&self) -> &[(SkillId, u8)] {
        &self.picks
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    pub fn clear(&mut self) {
        self.picks.clear();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PulseParams {
    pub interval: f32,
    pub radius: f32,
    pub damage: f32,
    pub force: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AuraParams {
    pub radius: f32,
    pub dps: f32,
    /// Sub-interval between damage ticks
    pub tick: f32,
    pub epsilon: f32,
    /// Most sub-ticks resolved in one frame
    pub max_steps: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RhythmParams {
    pub period: f32,
    pub peak: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeatParams {
    pub f1: f32,
    pub f2: f32,
    /// |cos(phase)| above this counts as an antinode
    pub threshold: f32,
    pub min_gap: f32,
    pub radius: f32,
    pub damage: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChaosParams {
    pub radius: f32,
    pub strength: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowParams {
    pub radius: f32,
    /// Rotation speed of the reference line (rad/s)
    pub angular_speed: f32,
    /// Half-width of the band in which enemies are pushed along the line
    pub band: f32,
    pub pull: f32,
    pub push: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceFieldParams {
    pub strength: f32,
    pub radius: f32,
    pub epsilon: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeathChainParams {
    pub chance: f32,
    pub radius: f32,
    pub damage: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HitChainParams {
    pub depth: u32,
    /// Fraction of the previous hop's damage dealt by the next hop
    pub fraction: f32,
    pub range: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EscapeParams {
    pub threshold: f32,
    pub radius: f32,
    pub damage: f32,
    pub force: f32,
    pub cooldown: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DopplerParams {
    pub strength: f32,
    pub reference_speed: f32,
    pub approach_cap: f32,
    pub recede_cap: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrbitParams {
    pub count: u32,
    pub radius: f32,
    /// rad/s; slower on wider orbits
    pub angular_speed: f32,
    pub damage: f32,
    pub hit_cooldown: f32,
    pub size: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GhostParams {
    pub interval: f32,
    pub duration: f32,
    pub damage: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeamParams {
    pub hops: u32,
    pub range: f32,
    pub dps: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeflectorParams {
    pub radius: f32,
    pub strength: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HazardParams {
    pub interval: f32,
    pub duration: f32,
    pub radius: f32,
    pub damage: f32,
    pub drift: f32,
}

/// The recomputed stat sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub damage_mult: f32,
    pub fire_rate_mult: f32,
    pub move_speed_mult: f32,
    pub knockback_mult: f32,

    pub max_health: f32,
    pub move_speed: f32,
    pub fire_interval: f32,
    pub projectile_speed: f32,
    pub projectile_damage: f32,
    pub projectile_mass: f32,
    pub projectile_size: f32,
    pub projectile_lifetime: f32,
    pub projectile_count: u32,
    pub pierce: u32,
    pub bounces: u32,
    pub spread: f32,
    pub restitution: f32,
    pub pierce_decay: f32,
    pub knockback_force: f32,
    pub pickup_radius: f32,
    pub magnet_speed: f32,

    pub pulse: PulseParams,
    pub aura: AuraParams,
    pub rhythm: RhythmParams,
    pub beat: BeatParams,
    pub chaos: ChaosParams,
    pub flow: FlowParams,
    pub attractor: ForceFieldParams,
    pub repulsor: ForceFieldParams,
    pub death_chain: DeathChainParams,
    pub hit_chain: HitChainParams,
    pub escape: EscapeParams,
    pub doppler: DopplerParams,
    pub orbit: OrbitParams,
    pub ghost: GhostParams,
    pub beam: BeamParams,
    pub deflector: DeflectorParams,
    pub hazard: HazardParams,
}

/// Build a full stat sheet from scratch.
pub fn recompute(
    base: &BaseStats,
    character: &CharacterMultipliers,
    loadout: &SkillLoadout,
    passive: PassiveTrait,
) -> Stats {
    let trait_mult = passive.multipliers();

    let mut s = Stats {
        damage_mult: character.damage * trait_mult.damage,
        fire_rate_mult: character.fire_rate * trait_mult.fire_rate,
        move_speed_mult: character.move_speed * trait_mult.move_speed,
        knockback_mult: character.knockback * trait_mult.knockback,
        max_health: base.max_health * character.health * trait_mult.health,
        projectile_count: 1,
        pierce: 1,
        bounces: 0,
        projectile_speed: base.projectile_speed,
        projectile_damage: base.projectile_damage,
        projectile_mass: base.projectile_mass,
        projectile_size: base.projectile_size,
        projectile_lifetime: base.projectile_lifetime,
        spread: base.spread,
        restitution: base.restitution,
        pierce_decay: base.pierce_decay,
        pickup_radius: base.pickup_radius,
        magnet_speed: base.magnet_speed,
        ..Stats::default()
    };

    let k = &base.skills;
    for (skill, level) in loadout.iter() {
        if level == 0 {
            continue;
        }
        let l = level;
        let li = level as i32;
        let n = level as u32;
        match skill {
            SkillId::Might => s.damage_mult *= k.stat.might.powi(li),
            SkillId::Haste => s.fire_rate_mult *= k.stat.haste.powi(li),
            SkillId::Swiftness => s.move_speed_mult *= k.stat.swiftness.powi(li),
            SkillId::Impact => s.knockback_mult *= k.stat.impact.powi(li),
            SkillId::Piercing => s.pierce += k.stat.piercing * n,
            SkillId::Ricochet => s.bounces += k.stat.ricochet * n,
            SkillId::Multishot => s.projectile_count += k.stat.multishot * n,
            SkillId::Vitality => s.max_health *= k.stat.vitality.powi(li),
            SkillId::Magnetism => s.pickup_radius *= k.stat.magnetism.powi(li),

            SkillId::Pulse => {
                let t = &k.pulse;
                s.pulse = PulseParams {
                    interval: t.interval.at(l),
                    radius: t.radius.at(l),
                    damage: t.damage.at(l),
                    force: t.force.at(l),
                }
            }
            SkillId::Aura => {
                let t = &k.aura;
                s.aura = AuraParams {
                    radius: t.radius.at(l),
                    dps: t.dps.at(l),
                    tick: t.tick.at(l),
                    epsilon: t.epsilon.at(l),
                    max_steps: t.max_steps.max(1),
                }
            }
            SkillId::Rhythm => {
                s.rhythm = RhythmParams {
                    period: k.rhythm.period.at(l),
                    peak: k.rhythm.peak.at(l),
                }
            }
            SkillId::Beat => {
                let t = &k.beat;
                s.beat = BeatParams {
                    f1: t.f1.at(l),
                    f2: t.f2.at(l),
                    threshold: t.threshold.at(l),
                    min_gap: t.min_gap.at(l),
                    radius: t.radius.at(l),
                    damage: t.damage.at(l),
                }
            }
            SkillId::Chaos => {
                s.chaos = ChaosParams {
                    radius: k.chaos.radius.at(l),
                    strength: k.chaos.strength.at(l),
                }
            }
            SkillId::Flow => {
                let t = &k.flow;
                s.flow = FlowParams {
                    radius: t.radius.at(l),
                    angular_speed: t.angular_speed.at(l),
                    band: t.band.at(l),
                    pull: t.pull.at(l),
                    push: t.push.at(l),
                }
            }
            SkillId::Attractor => s.attractor = force_field(&k.attractor, l),
            SkillId::Repulsor => s.repulsor = force_field(&k.repulsor, l),
            SkillId::DeathChain => {
                let t = &k.death_chain;
                s.death_chain = DeathChainParams {
                    chance: t.chance.at(l).min(1.0),
                    radius: t.radius.at(l),
                    damage: t.damage.at(l),
                }
            }
            SkillId::HitChain => {
                let t = &k.hit_chain;
                s.hit_chain = HitChainParams {
                    depth: t.depth.count_at(l),
                    fraction: t.fraction.at(l),
                    range: t.range.at(l),
                }
            }
            SkillId::EscapeBurst => {
                let t = &k.escape;
                s.escape = EscapeParams {
                    threshold: 0.0, // filled in once move speed is final
                    radius: t.radius.at(l),
                    damage: t.damage.at(l),
                    force: t.force.at(l),
                    cooldown: t.cooldown.at(l),
                }
            }
            SkillId::Doppler => {
                let t = &k.doppler;
                s.doppler = DopplerParams {
                    strength: t.strength.at(l),
                    reference_speed: t.reference_speed.at(l),
                    approach_cap: t.approach_cap.at(l),
                    recede_cap: t.recede_cap.at(l),
                }
            }
            SkillId::Orbit => {
                let t = &k.orbit;
                let radius = t.radius.at(l);
                s.orbit = OrbitParams {
                    count: t.count.count_at(l),
                    radius,
                    angular_speed: if radius > 0.0 { t.linear_speed.at(l) / radius } else { 0.0 },
                    damage: t.damage.at(l),
                    hit_cooldown: t.hit_cooldown.at(l),
                    size: t.size.at(l),
                }
            }
            SkillId::Ghost => {
                let t = &k.ghost;
                s.ghost = GhostParams {
                    interval: t.interval.at(l),
                    duration: t.duration.at(l),
                    damage: t.damage.at(l),
                }
            }
            SkillId::Beam => {
                let t = &k.beam;
                s.beam = BeamParams {
                    hops: t.hops.count_at(l),
                    range: t.range.at(l),
                    dps: t.dps.at(l),
                }
            }
            SkillId::Deflector => {
                s.deflector = DeflectorParams {
                    radius: k.deflector.radius.at(l),
                    strength: k.deflector.strength.at(l),
                }
            }
            SkillId::Hazard => {
                let t = &k.hazard;
                s.hazard = HazardParams {
                    interval: t.interval.at(l),
                    duration: t.duration.at(l),
                    radius: t.radius.at(l),
                    damage: t.damage.at(l),
                    drift: t.drift.at(l),
                }
            }
        }
    }

    s.move_speed = base.move_speed * s.move_speed_mult;
    s.fire_interval = base.fire_interval / s.fire_rate_mult.max(f32::EPSILON);
    s.knockback_force = base.knockback_force * s.knockback_mult;
    if s.escape.radius > 0.0 {
        let level = loadout.level(SkillId::EscapeBurst);
        s.escape.threshold = k.escape.threshold_factor.at(level) * s.move_speed;
    }
    s
}

fn force_field(t: &ForceFieldTuning, level: u8) -> ForceFieldParams {
    ForceFieldParams {
        strength: t.strength.at(level),
        radius: t.radius.at(level),
        epsilon: t.epsilon.at(level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::LevelScaled;
    use approx::assert_relative_eq;

    fn sheet(loadout: &SkillLoadout) -> Stats {
        recompute(
            &BaseStats::default(),
            &CharacterMultipliers::default(),
            loadout,
            PassiveTrait::None,
        )
    }

    #[test]
    fn test_empty_loadout_leaves_skills_unset() {
        let s = sheet(&SkillLoadout::default());
        assert_eq!(s.damage_mult, 1.0);
        assert_eq!(s.pierce, 1);
        assert_eq!(s.projectile_count, 1);
        assert_eq!(s.pulse, PulseParams::default());
        assert_eq!(s.orbit.count, 0);
        assert_eq!(s.escape.threshold, 0.0);
    }

    #[test]
    fn test_static_skills_fold_multiplicatively() {
        let mut loadout = SkillLoadout::default();
        loadout.add(SkillId::Might, 5);
        loadout.add(SkillId::Might, 5);
        loadout.add(SkillId::Haste, 5);
        let s = sheet(&loadout);
        assert_relative_eq!(s.damage_mult, 1.15 * 1.15, epsilon = 1e-5);
        assert_relative_eq!(s.fire_interval, 0.6 / 1.12, epsilon = 1e-5);
    }

    #[test]
    fn test_recompute_is_pure() {
        let mut loadout = SkillLoadout::default();
        loadout.add(SkillId::Orbit, 5);
        loadout.add(SkillId::Vitality, 5);
        let a = sheet(&loadout);
        let b = sheet(&loadout);
        assert_eq!(a, b);
    }

    #[test]
    fn test_passive_and_character_compose() {
        let character = CharacterMultipliers {
            damage: 1.2,
            ..CharacterMultipliers::default()
        };
        let s = recompute(
            &BaseStats::default(),
            &character,
            &SkillLoadout::default(),
            PassiveTrait::GlassCannon,
        );
        assert_relative_eq!(s.damage_mult, 1.2 * 1.3, epsilon = 1e-5);
        assert_relative_eq!(s.max_health, 100.0 * 0.7, epsilon = 1e-4);
    }

    #[test]
    fn test_orbit_level_three_has_four_projectiles() {
        let mut loadout = SkillLoadout::default();
        for _ in 0..3 {
            loadout.add(SkillId::Orbit, 5);
        }
        let s = sheet(&loadout);
        assert_eq!(s.orbit.count, 4);
        assert_relative_eq!(s.orbit.angular_speed * s.orbit.radius, 300.0, epsilon = 1e-3);
    }

    #[test]
    fn test_loadout_caps_level() {
        let mut loadout = SkillLoadout::default();
        assert!(loadout.add(SkillId::Beam, 2));
        assert!(loadout.add(SkillId::Beam, 2));
        assert!(!loadout.add(SkillId::Beam, 2));
        assert_eq!(loadout.level(SkillId::Beam), 2);
        assert_eq!(loadout.level(SkillId::Aura), 0);
    }

    #[test]
    fn test_skill_numbers_follow_tuning() {
        let mut tuning = Tuning::default();
        tuning.skills.ghost.interval = LevelScaled::linear(5.0, -1.0).at_least(1.5);
        tuning.skills.stat.might = 2.0;
        tuning.skills.aura.max_steps = 2;
        let base = BaseStats::from_tuning(&tuning);

        let mut loadout = SkillLoadout::default();
        loadout.add(SkillId::Ghost, 5);
        loadout.add(SkillId::Might, 5);
        loadout.add(SkillId::Aura, 5);
        let s = recompute(&base, &CharacterMultipliers::default(), &loadout, PassiveTrait::None);
        assert_relative_eq!(s.ghost.interval, 4.0, epsilon = 1e-5);
        assert_relative_eq!(s.damage_mult, 2.0, epsilon = 1e-5);
        assert_eq!(s.aura.max_steps, 2);

        for _ in 0..4 {
            loadout.add(SkillId::Ghost, 5);
        }
        let s = recompute(&base, &CharacterMultipliers::default(), &loadout, PassiveTrait::None);
        assert_eq!(s.ghost.interval, 1.5, "held at the floor");
    }

    #[test]
    fn test_escape_threshold_tracks_move_speed() {
        let mut loadout = SkillLoadout::default();
        loadout.add(SkillId::EscapeBurst, 5);
        loadout.add(SkillId::Swiftness, 5);
        let s = sheet(&loadout);
        assert_relative_eq!(s.escape.threshold, 1.25 * 220.0 * 1.08, epsilon = 1e-3);
    }
}
