//! Combat Session
//!
//! Owns one run: the world, every subsystem and the clocks. `tick` advances
//! the simulation in a fixed order:
//!
//! 1. gravity field
//! 2. spawn director
//! 3. player movement
//! 4. weapon + projectile movement
//! 5. enemy steering, merges, projectile hits, player contact
//! 6. skill effects (then this tick's hits are replayed to on-hit skills)
//! 7. combo window, orb pickup, xp
//! 8. cleanup: death rewards, on-death skills, despawn flush
//!
//! A hitstop window skips steps 1-8 entirely while the idle clock keeps
//! running for the presenter. `reset` checks its inputs first and then
//! rebuilds everything in one go.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::collision::Resolver;
use super::components::{Player, Projectile, Tier};
use super::event::{Events, KillTierEvent, LevelUpEvent, ShakeEvent};
use super::movement;
use super::physics;
use super::present::{dispatch_events, HudPayload, Presenter, VisualKind};
use super::progression::{ComboTracker, Progression};
use super::skills::{Modifiers, SkillContext, SkillEngine, SkillId};
use super::spawn::SpawnDirector;
use super::stats::{recompute, BaseStats, SkillLoadout, Stats};
use super::transform::Transform2;
use super::world::{DeathRecord, PhysicsTally, World};
use crate::catalog::{Character, CharacterMultipliers, PassiveTrait};
use crate::tuning::Tuning;
use crate::worldgen::Arena;

/// Longest frame the simulation accepts; longer frames are clamped.
const MAX_FRAME_DT: f32 = 0.1;

/// On-death skills may kill more enemies; cleanup repeats at most this often.
const MAX_DEATH_PASSES: usize = 8;

const MAX_TIME_SCALE: f32 = 4.0;

/// Error type for session setup
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// A required collaborator was never configured
    MissingSubsystem(&'static str),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::MissingSubsystem(name) => write!(f, "cannot reset: no {} configured", name),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunOutcome {
    #[default]
    InProgress,
    Defeat,
    Victory,
}

/// End-of-run numbers handed to persistence and the result screen.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub character: String,
    pub stage: String,
    /// Game seconds survived
    pub elapsed: f32,
    pub level: u32,
    pub kills: u32,
    pub score: u64,
    pub max_streak: u32,
    pub skills: Vec<(SkillId, u8)>,
    pub physics: PhysicsTally,
    pub outcome: RunOutcome,
}

impl RunSummary {
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

/// One run of the combat simulation
pub struct Session {
    pub tuning: Tuning,
    arena: Option<Arena>,
    character: Option<&'static Character>,

    pub world: World,
    pub events: Events,
    rng: StdRng,

    base: BaseStats,
    stats: Stats,
    loadout: SkillLoadout,
    engine: SkillEngine,
    modifiers: Modifiers,

    resolver: Resolver,
    spawner: SpawnDirector,
    progression: Progression,
    combo: ComboTracker,

    /// Game time in seconds (scaled, stops during hitstop)
    time: f32,
    /// Wall time seen by `tick`/`idle`, for presentation timers
    idle_time: f32,
    hitstop: f32,
    time_scale: f32,
    fire_timer: f32,

    kills: u32,
    score: u64,
    offers: Vec<SkillId>,
    outcome: RunOutcome,
}

impl Session {
    pub fn new(tuning: Tuning) -> Self {
        let base = BaseStats::from_tuning(&tuning);
        let progression = Progression::new(&tuning.progression);
        let combo = ComboTracker::new(&tuning.combo);
        Self {
            arena: None,
            character: None,
            world: World::default(),
            events: Events::new(),
            rng: StdRng::seed_from_u64(0),
            base,
            stats: Stats::default(),
            loadout: SkillLoadout::default(),
            engine: SkillEngine::new(),
            modifiers: Modifiers::default(),
            resolver: Resolver::new(),
            spawner: SpawnDirector::new(1.0),
            progression,
            combo,
            time: 0.0,
            idle_time: 0.0,
            hitstop: 0.0,
            time_scale: 1.0,
            fire_timer: 0.0,
            kills: 0,
            score: 0,
            offers: Vec::new(),
            outcome: RunOutcome::InProgress,
            tuning,
        }
    }

    pub fn set_character(&mut self, character: Option<&'static Character>) {
        self.character = character;
    }

    pub fn set_arena(&mut self, arena: Option<Arena>) {
        self.arena = arena;
    }

    pub fn configure(&mut self, character: &'static Character, arena: Arena) {
        self.character = Some(character);
        self.arena = Some(arena);
    }

    pub fn arena(&self) -> Option<&Arena> {
        self.arena.as_ref()
    }

    pub fn character(&self) -> Option<&'static Character> {
        self.character
    }

    /// Start the run over.
    ///
    /// Fails without touching any state if the character or arena is missing.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        let Some(arena) = self.arena.as_ref() else {
            log::warn!("reset aborted: no arena");
            return Err(SessionError::MissingSubsystem("arena"));
        };
        let Some(character) = self.character else {
            log::warn!("reset aborted: no character");
            return Err(SessionError::MissingSubsystem("character"));
        };

        self.base = BaseStats::from_tuning(&self.tuning);
        self.loadout.clear();
        self.stats = recompute(&self.base, &character.multipliers, &self.loadout, character.passive);

        self.world.clear();
        self.world.bounds = arena.bounds;
        self.world.field = arena.field;
        self.world.player = Player::new(
            arena.player_spawn,
            self.stats.max_health,
            self.tuning.player.size,
            character.multipliers,
        );
        self.events.clear_all();
        self.rng = StdRng::seed_from_u64(arena.seed);

        self.engine.clear();
        self.modifiers = Modifiers::default();
        self.resolver.clear();
        self.spawner = SpawnDirector::new(arena.stage.spawn_rate);
        self.progression = Progression::new(&self.tuning.progression);
        self.combo = ComboTracker::new(&self.tuning.combo);

        self.time = 0.0;
        self.idle_time = 0.0;
        self.hitstop = 0.0;
        self.time_scale = 1.0;
        self.fire_timer = 0.0;
        self.kills = 0;
        self.score = 0;
        self.offers.clear();
        self.outcome = RunOutcome::InProgress;

        log::info!("run reset: {} on {} (seed {})", character.name, arena.stage.name, arena.seed);
        Ok(())
    }

    // =========================================================================
    // Clock
    // =========================================================================

    /// Advance one frame. Returns the run outcome after the frame.
    pub fn tick(&mut self, frame_dt: f32) -> RunOutcome {
        if self.outcome != RunOutcome::InProgress || self.arena.is_none() {
            return self.outcome;
        }
        let frame_dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.idle_time += frame_dt;

        if self.hitstop > 0.0 {
            self.hitstop = (self.hitstop - frame_dt).max(0.0);
            return self.outcome;
        }

        let dt = frame_dt * self.time_scale;
        if dt <= 0.0 {
            return self.outcome;
        }
        self.time += dt;

        // Gravity field
        if let Some(field) = self.world.field {
            field.apply(&mut self.world, &self.tuning.gravity, &mut self.events, dt);
        }

        // Spawning
        let report = self
            .spawner
            .update(&mut self.world, &self.tuning, &mut self.rng, &mut self.events, self.time, dt);

        // Player
        movement::move_player(&mut self.world, &self.stats, &self.tuning.player, dt);

        // Skill windows and modifiers that gate firing and contact
        self.modifiers = Modifiers::default();
        {
            let mut ctx = SkillContext {
                world: &mut self.world,
                stats: &self.stats,
                events: &mut self.events,
                rng: &mut self.rng,
                time: self.time,
                modifiers: &mut self.modifiers,
            };
            self.engine.prepare(&mut ctx, dt);
        }

        // Projectiles
        self.fire_weapon(dt);
        movement::advance_projectiles(&mut self.world, &self.stats, &self.tuning.arena, dt);

        // Enemies
        movement::steer_enemies(&mut self.world, self.tuning.enemies.steering, dt);
        self.resolver
            .resolve_merges(&mut self.world, &self.tuning, &mut self.events, dt);
        self.resolver
            .resolve_projectiles(&mut self.world, &self.stats, &self.engine, &mut self.events);
        self.resolver
            .resolve_player_contact(&mut self.world, &self.tuning, &mut self.events);

        // Skills
        {
            let mut ctx = SkillContext {
                world: &mut self.world,
                stats: &self.stats,
                events: &mut self.events,
                rng: &mut self.rng,
                time: self.time,
                modifiers: &mut self.modifiers,
            };
            self.engine.apply(&mut ctx, dt);
        }

        // Progression
        self.combo.update(dt);
        let xp = movement::collect_orbs(&mut self.world, &self.stats, dt);
        self.grant_xp(xp);

        // Cleanup
        self.cleanup();

        if self.world.player.is_dead() {
            self.world.player.health = 0.0;
            self.outcome = RunOutcome::Defeat;
            log::info!("player died at {:.1}s", self.time);
        } else if report.victory {
            self.outcome = RunOutcome::Victory;
        }
        self.outcome
    }

    /// Frame with no combat (paused, loading, menus).
    pub fn idle(&mut self, frame_dt: f32) {
        if frame_dt.is_finite() && frame_dt > 0.0 {
            self.idle_time += frame_dt.min(MAX_FRAME_DT);
        }
    }

    /// Slow motion. Non-finite or negative values fall back to 1.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = if scale.is_finite() && scale >= 0.0 {
            scale.min(MAX_TIME_SCALE)
        } else {
            1.0
        };
    }

    pub fn start_hitstop(&mut self, duration: f32) {
        if duration.is_finite() {
            self.hitstop = self.hitstop.max(duration);
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn idle_time(&self) -> f32 {
        self.idle_time
    }

    pub fn hitstop(&self) -> f32 {
        self.hitstop
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    // =========================================================================
    // Systems owned by the session
    // =========================================================================

    /// Auto-fire at the nearest enemy.
    fn fire_weapon(&mut self, dt: f32) {
        let interval = self.stats.fire_interval / self.modifiers.fire_rate.max(f32::EPSILON);
        self.fire_timer = (self.fire_timer + dt).min(interval);
        if self.fire_timer < interval {
            return;
        }

        let origin = self.world.player.position;
        let Some(target) = self
            .world
            .nearest_enemy(origin, f32::INFINITY, |_| true)
            .and_then(|(id, _)| self.world.enemies.get(id))
            .map(|e| e.position)
        else {
            return;
        };
        self.fire_timer = 0.0;

        let (aim, _) = physics::direction(origin, target);
        let s = &self.stats;
        let count = s.projectile_count.max(1);
        let damage = s.projectile_damage * s.damage_mult * self.modifiers.damage;
        let center = (count - 1) as f32 * 0.5;
        let mut volley = Vec::with_capacity(count as usize);
        for i in 0..count {
            let dir = physics::rotate(aim, (i as f32 - center) * s.spread);
            volley.push(
                Projectile::bolt(
                    origin,
                    dir * s.projectile_speed,
                    damage,
                    s.projectile_mass,
                    s.projectile_size,
                    s.projectile_lifetime,
                )
                .with_budget(s.pierce, s.bounces),
            );
        }
        for projectile in volley {
            self.world.spawn_projectile(projectile);
        }
    }

    /// Rewards, on-death skills, multi-kill signal, despawn flush.
    fn cleanup(&mut self) {
        let mut all_deaths: Vec<DeathRecord> = Vec::new();
        for _ in 0..MAX_DEATH_PASSES {
            let deaths = self
                .resolver
                .process_deaths(&mut self.world, &self.tuning, &mut self.events);
            if deaths.is_empty() {
                break;
            }
            for death in &deaths {
                self.kills += 1;
                self.score += u64::from(self.tuning.tier(death.tier).score);
                if let Some(streak) = self.combo.register_kill() {
                    self.events.kill_streak.send(streak);
                }

                let feel = &self.tuning.feel;
                let (stop, shake) = match death.tier {
                    Tier::Large => (feel.hitstop_large, feel.shake_large),
                    Tier::Boss => (feel.hitstop_boss, feel.shake_boss),
                    _ => (0.0, 0.0),
                };
                if stop > 0.0 {
                    self.hitstop = self.hitstop.max(stop);
                }
                if shake > 0.0 {
                    self.events.shake.send(ShakeEvent { intensity: shake });
                }
                if death.tier == Tier::Boss {
                    log::info!("boss down at {:.1}s", self.time);
                }

                let mut ctx = SkillContext {
                    world: &mut self.world,
                    stats: &self.stats,
                    events: &mut self.events,
                    rng: &mut self.rng,
                    time: self.time,
                    modifiers: &mut self.modifiers,
                };
                self.engine.on_enemy_death(&mut ctx, death);
            }
            all_deaths.extend(deaths);
        }

        let count = all_deaths.len() as u32;
        let tier = match count {
            0 | 1 => 0,
            2 => 1,
            3 | 4 => 2,
            _ => 3,
        };
        if tier > 0 {
            let sum: Vec2 = all_deaths.iter().map(|d| d.position).sum();
            self.events.kill_tier.send(KillTierEvent {
                position: sum / count as f32,
                count,
                tier,
            });
        }

        self.world.flush_despawns();
    }

    // =========================================================================
    // Progression and skill choice
    // =========================================================================

    /// Add experience and queue one level-up per level crossed.
    /// Returns the levels gained.
    pub fn grant_xp(&mut self, amount: u32) -> u32 {
        if amount == 0 {
            return 0;
        }
        let gained = self.progression.add_xp(amount);
        let level = self.progression.level();
        for l in (level + 1 - gained)..=level {
            self.events.level_up.send(LevelUpEvent { level: l });
        }
        gained
    }

    pub fn pending_level_ups(&self) -> u32 {
        self.progression.pending()
    }

    /// Roll a fresh set of distinct, not yet maxed skills to offer.
    pub fn roll_offers(&mut self) -> &[SkillId] {
        let max = self.tuning.progression.max_skill_level;
        let available: Vec<SkillId> = SkillId::ALL
            .iter()
            .copied()
            .filter(|s| self.loadout.level(*s) < max)
            .collect();
        self.offers = available
            .choose_multiple(&mut self.rng, self.tuning.progression.offer_count)
            .copied()
            .collect();
        &self.offers
    }

    /// Roll offers for the next pending level-up. When every skill is
    /// maxed the queued level-ups are spent unrewarded and `false` comes back.
    pub fn prepare_offers(&mut self) -> bool {
        if self.progression.pending() == 0 {
            return false;
        }
        if !self.roll_offers().is_empty() {
            return true;
        }
        let mut dropped = 0;
        while self.progression.take_pending() {
            dropped += 1;
        }
        log::info!("every skill maxed; {} level-up(s) spent without an offer", dropped);
        false
    }

    /// Current offers with the level each would reach.
    pub fn offers(&self) -> Vec<(SkillId, u8)> {
        self.offers
            .iter()
            .map(|s| (*s, self.loadout.level(*s).saturating_add(1)))
            .collect()
    }

    /// Take offer `index`, spending one pending level-up. Out-of-range
    /// indices and calls without a pending level-up change nothing.
    pub fn choose_skill(&mut self, index: usize) -> Option<SkillId> {
        let skill = *self.offers.get(index)?;
        if self.progression.pending() == 0 || !self.loadout.add(skill, self.tuning.progression.max_skill_level) {
            return None;
        }
        self.progression.take_pending();
        self.offers.clear();
        self.refresh_stats();
        log::info!("picked {} (level {})", skill.label(), self.loadout.level(skill));
        Some(skill)
    }

    pub fn loadout(&self) -> &SkillLoadout {
        &self.loadout
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Rebuild the stat sheet from scratch and sync the effect list.
    fn refresh_stats(&mut self) {
        let (multipliers, passive) = self
            .character
            .map_or((CharacterMultipliers::default(), PassiveTrait::None), |c| {
                (c.multipliers, c.passive)
            });
        self.stats = recompute(&self.base, &multipliers, &self.loadout, passive);
        self.world.player.set_max_health(self.stats.max_health);
        self.engine.sync(&self.loadout);
    }

    // =========================================================================
    // Output
    // =========================================================================

    pub fn hud(&self) -> HudPayload {
        HudPayload {
            health: self.world.player.health,
            max_health: self.world.player.max_health,
            xp: self.progression.xp(),
            xp_next: self.progression.next_threshold(),
            level: self.progression.level(),
            elapsed: self.time,
            kills: self.kills,
            skills: self.loadout.as_slice().to_vec(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            character: self.character.map(|c| c.name.to_string()).unwrap_or_default(),
            stage: self
                .arena
                .as_ref()
                .map(|a| a.stage.name.to_string())
                .unwrap_or_default(),
            elapsed: self.time,
            level: self.progression.level(),
            kills: self.kills,
            score: self.score,
            max_streak: self.combo.max_streak(),
            skills: self.loadout.as_slice().to_vec(),
            physics: self.world.tally.clone(),
            outcome: self.outcome,
        }
    }

    /// Push visuals, transforms and this frame's events to the presenter.
    pub fn sync_presentation(&mut self, presenter: &mut dyn Presenter) {
        for handle in self.world.take_released_visuals() {
            presenter.remove_visual(handle);
        }
        for (entity, kind) in self.world.take_spawn_log() {
            if self.world.is_alive(entity) {
                let handle = presenter.add_visual(kind);
                self.world.visuals.insert(entity, handle);
            }
        }

        let player_visual = match self.world.player_visual {
            Some(handle) => handle,
            None => {
                let handle = presenter.add_visual(VisualKind::Player);
                self.world.player_visual = Some(handle);
                handle
            }
        };
        presenter.set_transform(player_visual, Transform2::from(&self.world.player));

        let w = &self.world;
        for (entity, handle) in w.visuals.iter() {
            let transform = if let Some(e) = w.enemies.get(entity) {
                Transform2::from(e)
            } else if let Some(p) = w.projectiles.get(entity) {
                Transform2::from(p)
            } else if let Some(o) = w.orbs.get(entity) {
                Transform2::from(o)
            } else if let Some(h) = w.hazards.get(entity) {
                Transform2::from(h)
            } else {
                continue;
            };
            presenter.set_transform(*handle, transform);
        }

        dispatch_events(&mut self.events, presenter);
        if let Some(field) = self.world.field {
            presenter.on_field_proximity(field.proximity(self.world.player.position));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CHARACTERS, STAGES};
    use crate::game::present::HeadlessPresenter;
    use crate::tuning::{LevelScaled, TierTuning};
    use crate::worldgen::generate_arena;

    const DT: f32 = 1.0 / 60.0;

    fn quiet_tuning() -> Tuning {
        let mut tuning = Tuning::default();
        tuning.spawn.interval_start = 1.0e5;
        tuning.spawn.interval_end = 1.0e5;
        tuning.spawn.formation_interval = 1.0e5;
        tuning.spawn.boss_time = 1.0e5;
        tuning
    }

    fn session(tuning: Tuning, stage: usize) -> Session {
        let arena = generate_arena(&STAGES[stage], &tuning, 99).unwrap();
        let mut s = Session::new(tuning);
        s.configure(&CHARACTERS[0], arena);
        s.reset().unwrap();
        s
    }

    #[test]
    fn test_reset_requires_collaborators() {
        let mut s = Session::new(Tuning::default());
        assert_eq!(s.reset(), Err(SessionError::MissingSubsystem("arena")));

        let mut s = session(Tuning::default(), 0);
        for _ in 0..120 {
            s.tick(DT);
        }
        let (time, entities) = (s.time(), s.world.entity_count());
        s.set_character(None);
        assert_eq!(s.reset(), Err(SessionError::MissingSubsystem("character")));
        assert_eq!(s.time(), time, "failed reset leaves the run alone");
        assert_eq!(s.world.entity_count(), entities);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut s = session(Tuning::default(), 1);
        for _ in 0..600 {
            s.tick(DT);
        }
        assert!(s.time() > 0.0);

        s.reset().unwrap();
        let first = (s.summary(), s.hud(), s.world.entity_count(), s.stats().clone());
        s.reset().unwrap();
        let second = (s.summary(), s.hud(), s.world.entity_count(), s.stats().clone());
        assert_eq!(first, second);
        assert_eq!(first.0.elapsed, 0.0);
        assert_eq!(first.0.kills, 0);
        assert_eq!(first.2, 0);
        assert!(s.events.is_empty());
    }

    #[test]
    fn test_reset_replays_the_same_run() {
        let mut s = session(Tuning::default(), 1);
        for _ in 0..900 {
            s.tick(DT);
        }
        let a = s.summary();
        s.reset().unwrap();
        for _ in 0..900 {
            s.tick(DT);
        }
        assert_eq!(s.summary(), a);
    }

    #[test]
    fn test_hitstop_skips_combat_but_not_idle_clock() {
        let mut s = session(Tuning::default(), 0);
        s.tick(DT);
        let t = s.time();
        s.start_hitstop(0.05);
        s.tick(0.02);
        s.tick(0.02);
        assert_eq!(s.time(), t);
        assert!(s.idle_time() > t);
        s.tick(0.02);
        s.tick(0.02);
        assert!(s.time() > t);
    }

    #[test]
    fn test_time_scale_slows_game_clock() {
        let mut s = session(Tuning::default(), 0);
        s.set_time_scale(0.5);
        s.tick(0.02);
        assert!((s.time() - 0.01).abs() < 1e-6);
        s.set_time_scale(f32::NAN);
        s.tick(0.02);
        assert!((s.time() - 0.03).abs() < 1e-6);
    }

    #[test]
    fn test_ghost_window_blocks_contact_damage() {
        let mut tuning = quiet_tuning();
        tuning.skills.ghost.interval = LevelScaled::flat(0.5);
        tuning.skills.ghost.duration = LevelScaled::flat(1.0);
        let mut s = session(tuning, 0);
        s.loadout.add(SkillId::Ghost, 5);
        s.refresh_stats();
        // Heavy, stationary and effectively unkillable, parked on the player
        s.world.spawn_enemy(
            Vec2::ZERO,
            Tier::Small,
            &TierTuning {
                health: 1.0e9,
                mass: 1.0e6,
                speed: 0.0,
                ..TierTuning::default()
            },
        );

        let mut openings = 0;
        let mut protected_ticks = 0;
        let mut hurt = false;
        for _ in 0..180 {
            let was_shielded = s.world.player.invulnerable;
            let health = s.world.player.health;
            s.tick(DT);
            if s.world.player.invulnerable {
                protected_ticks += 1;
                if !was_shielded {
                    openings += 1;
                }
                assert_eq!(s.world.player.health, health, "hit during ghost window at {}", s.time());
            } else if s.world.player.health < health {
                hurt = true;
            }
        }
        assert!(openings >= 2, "window opened {openings} times");
        assert!(protected_ticks > openings);
        assert!(hurt, "contact damage applies outside the window");
    }

    #[test]
    fn test_rhythm_boost_applies_to_this_ticks_volley() {
        let mut s = session(quiet_tuning(), 0);
        s.loadout.add(SkillId::Rhythm, 5);
        s.refresh_stats();
        s.world.spawn_enemy(
            Vec2::new(400.0, 0.0),
            Tier::Small,
            &TierTuning {
                health: 1.0e9,
                speed: 0.0,
                ..TierTuning::default()
            },
        );
        // Short of the unboosted interval, past the boosted one
        s.fire_timer = s.stats.fire_interval * 0.9;
        s.tick(DT);

        let plain = s.stats.projectile_damage * s.stats.damage_mult;
        let damages: Vec<f32> = s.world.projectiles.iter().map(|(_, p)| p.damage).collect();
        assert_eq!(damages.len(), 1, "boosted fire rate lets the volley out");
        assert!(damages[0] > plain * 1.2, "{} vs {}", damages[0], plain);
    }

    #[test]
    fn test_skill_choice_bounds() {
        let mut s = session(quiet_tuning(), 0);
        assert_eq!(s.choose_skill(0), None, "nothing offered yet");

        let xp = s.progression.threshold(2);
        assert_eq!(s.grant_xp(xp), 1);
        assert_eq!(s.pending_level_ups(), 1);
        assert_eq!(s.events.level_up.len(), 1);
        assert_eq!(s.roll_offers().len(), 3);

        assert_eq!(s.choose_skill(99), None);
        assert_eq!(s.pending_level_ups(), 1);
        assert!(s.loadout().is_empty());

        let picked = s.choose_skill(0).unwrap();
        assert_eq!(s.pending_level_ups(), 0);
        assert_eq!(s.loadout().level(picked), 1);
        assert!(s.offers().is_empty());
    }

    #[test]
    fn test_maxed_loadout_spends_level_ups_without_offers() {
        let mut tuning = quiet_tuning();
        tuning.progression.max_skill_level = 1;
        let mut s = session(tuning, 0);
        for skill in SkillId::ALL {
            s.loadout.add(skill, 1);
        }
        s.grant_xp(s.progression.threshold(3));
        assert_eq!(s.pending_level_ups(), 2);

        assert!(!s.prepare_offers());
        assert_eq!(s.pending_level_ups(), 0);
        assert!(s.offers().is_empty());
        assert!(!s.prepare_offers(), "nothing queued");
    }

    #[test]
    fn test_player_death_ends_run() {
        let mut s = session(Tuning::default(), 0);
        s.world.player.health = -1.0;
        assert_eq!(s.tick(DT), RunOutcome::Defeat);
        let t = s.time();
        s.tick(DT);
        assert_eq!(s.time(), t);
        assert_eq!(s.summary().outcome, RunOutcome::Defeat);
    }

    #[test]
    fn test_victory_at_session_end() {
        let mut tuning = quiet_tuning();
        tuning.spawn.session_duration = 0.5;
        let mut s = session(tuning, 0);
        let mut outcome = RunOutcome::InProgress;
        for _ in 0..60 {
            outcome = s.tick(DT);
        }
        assert_eq!(outcome, RunOutcome::Victory);
    }

    #[test]
    fn test_large_kill_rewards_once_and_hitstops() {
        let mut s = session(quiet_tuning(), 0);
        let large = s.tuning.enemies.large.clone();
        let e = s.world.spawn_enemy(Vec2::new(400.0, 0.0), Tier::Large, &large);
        s.world.damage_enemy(e, 1.0e6);
        s.tick(DT);

        let summary = s.summary();
        assert_eq!(summary.kills, 1);
        assert_eq!(summary.score, u64::from(large.score));
        assert!(s.hitstop() > 0.0);
        assert_eq!(s.events.kill.len(), 1);
        assert_eq!(s.world.orbs.count(), 1);
        assert!(!s.world.is_alive(e));
    }

    #[test]
    fn test_presentation_tracks_visuals() {
        let mut s = session(quiet_tuning(), 1);
        let mut presenter = HeadlessPresenter::default();
        let e = s.world.spawn_enemy(Vec2::new(300.0, 0.0), Tier::Small, &TierTuning::default());
        s.sync_presentation(&mut presenter);
        assert_eq!(presenter.live_visuals, 2);

        s.world.despawn(e);
        s.world.flush_despawns();
        s.sync_presentation(&mut presenter);
        assert_eq!(presenter.live_visuals, 1);
        assert!(s.events.is_empty());
    }

    #[test]
    fn test_summary_serialises() {
        let s = session(Tuning::default(), 0);
        let text = s.summary().to_ron().unwrap();
        assert!(text.contains("kills"));
        let back: RunSummary = ron::from_str(&text).unwrap();
        assert_eq!(back.character, CHARACTERS[0].name);
    }
}
