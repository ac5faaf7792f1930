//! Game phase state machine
//!
//! Drives a run from the menus through the fight to the result screen.
//! Every change of phase goes through `App::handle` with a named event;
//! `App::frame` polls world generation, ticks the session while playing
//! and raises the events the session produces (level-ups, death, victory).

use glam::Vec2;

use crate::catalog::{self, Character, Stage};
use crate::game::{Presenter, RunOutcome, Screen, ScreenId, Session};
use crate::tuning::Tuning;
use crate::worldgen::{generate_async, Arena, AsyncOp};

/// Seconds the opening card stays up before the fight starts
const OPENING_DURATION: f32 = 1.5;

/// Seconds between game-over/victory and the result screen
const RESULT_DELAY: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamePhase {
    CharacterSelect,
    StageSelect,
    /// Waiting for world generation; no combat ticks
    Loading,
    Opening,
    Playing,
    SkillSelection,
    Paused,
    GameOver,
    Victory,
    Result,
}

impl GamePhase {
    pub fn label(&self) -> &'static str {
        match self {
            GamePhase::CharacterSelect => "character select",
            GamePhase::StageSelect => "stage select",
            GamePhase::Loading => "loading",
            GamePhase::Opening => "opening",
            GamePhase::Playing => "playing",
            GamePhase::SkillSelection => "skill selection",
            GamePhase::Paused => "paused",
            GamePhase::GameOver => "game over",
            GamePhase::Victory => "victory",
            GamePhase::Result => "result",
        }
    }

    /// Screen shown while in this phase.
    pub fn screen_id(&self) -> ScreenId {
        match self {
            GamePhase::CharacterSelect => ScreenId::CharacterSelect,
            GamePhase::StageSelect => ScreenId::StageSelect,
            GamePhase::Loading => ScreenId::Loading,
            GamePhase::Opening => ScreenId::Opening,
            GamePhase::Playing => ScreenId::Hud,
            GamePhase::SkillSelection => ScreenId::SkillSelection,
            GamePhase::Paused => ScreenId::Pause,
            GamePhase::GameOver => ScreenId::GameOver,
            GamePhase::Victory => ScreenId::Victory,
            GamePhase::Result => ScreenId::Result,
        }
    }
}

/// Named transitions. Events that make no sense in the current phase are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    CharacterChosen(usize),
    StageChosen(usize),
    WorldReady,
    OpeningFinished,
    LevelUp,
    SkillChosen(usize),
    Pause,
    Resume,
    PlayerDied,
    VictoryReached,
    ShowResult,
    Restart,
}

pub struct App {
    phase: GamePhase,
    pub session: Session,
    character: Option<&'static Character>,
    stage: Option<&'static Stage>,
    /// World generation in flight
    pending_world: Option<AsyncOp<Arena>>,
    /// Finished arena waiting for `WorldReady`
    ready_world: Option<Arena>,
    seed: u64,
    /// Counts down the opening card and the result delay
    phase_timer: f32,
    /// Where `Resume` returns to
    resume_to: GamePhase,
}

impl App {
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        Self {
            phase: GamePhase::CharacterSelect,
            session: Session::new(tuning),
            character: None,
            stage: None,
            pending_world: None,
            ready_world: None,
            seed,
            phase_timer: 0.0,
            resume_to: GamePhase::Playing,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Show the screen of the current phase. Call once after construction.
    pub fn start(&mut self, presenter: &mut dyn Presenter) {
        let screen = self.screen_for(self.phase);
        presenter.show_screen(screen);
    }

    /// Apply a phase event. Returns true if it was accepted.
    pub fn handle(&mut self, event: PhaseEvent, presenter: &mut dyn Presenter) -> bool {
        use GamePhase as P;
        use PhaseEvent as E;

        let next = match (self.phase, event) {
            (P::CharacterSelect, E::CharacterChosen(i)) => {
                let Some(character) = catalog::character(i) else {
                    return false;
                };
                self.character = Some(character);
                P::StageSelect
            }
            (P::StageSelect, E::StageChosen(i)) => {
                let Some(stage) = catalog::stage(i) else {
                    return false;
                };
                self.stage = Some(stage);
                self.ready_world = None;
                self.pending_world = Some(generate_async(stage, self.session.tuning.clone(), self.seed));
                P::Loading
            }
            (P::Loading, E::WorldReady) => {
                let Some(arena) = self.ready_world.take() else {
                    return false;
                };
                self.session.set_character(self.character);
                self.session.set_arena(Some(arena));
                if let Err(e) = self.session.reset() {
                    log::error!("could not start run: {}", e);
                    P::StageSelect
                } else {
                    self.phase_timer = OPENING_DURATION;
                    P::Opening
                }
            }
            (P::Opening, E::OpeningFinished) => P::Playing,
            (P::Playing, E::LevelUp) => {
                if !self.session.prepare_offers() {
                    return false;
                }
                P::SkillSelection
            }
            (P::SkillSelection, E::SkillChosen(i)) => {
                if self.session.choose_skill(i).is_none() {
                    return false;
                }
                if self.session.prepare_offers() {
                    // Another level is queued: offer again without leaving
                    presenter.show_screen(self.screen_for(P::SkillSelection));
                    return true;
                }
                P::Playing
            }
            (P::Playing | P::SkillSelection, E::Pause) => {
                self.resume_to = self.phase;
                P::Paused
            }
            (P::Paused, E::Resume) => self.resume_to,
            (P::Playing, E::PlayerDied) => {
                self.phase_timer = RESULT_DELAY;
                P::GameOver
            }
            (P::Playing, E::VictoryReached) => {
                self.phase_timer = RESULT_DELAY;
                P::Victory
            }
            (P::GameOver | P::Victory, E::ShowResult) => {
                match self.session.summary().to_ron() {
                    Ok(text) => log::info!("run summary:\n{}", text),
                    Err(e) => log::warn!("could not serialise run summary: {}", e),
                }
                P::Result
            }
            (P::Result | P::Paused, E::Restart) => {
                self.character = None;
                self.stage = None;
                self.pending_world = None;
                self.ready_world = None;
                self.seed = self.seed.wrapping_add(1);
                P::CharacterSelect
            }
            _ => return false,
        };

        self.enter(next, presenter);
        true
    }

    fn enter(&mut self, next: GamePhase, presenter: &mut dyn Presenter) {
        log::info!("phase: {} -> {}", self.phase.label(), next.label());
        presenter.hide_screen(self.phase.screen_id());
        self.phase = next;
        let screen = self.screen_for(next);
        presenter.show_screen(screen);
    }

    fn screen_for(&self, phase: GamePhase) -> Screen {
        match phase {
            GamePhase::CharacterSelect => Screen::CharacterSelect,
            GamePhase::StageSelect => Screen::StageSelect,
            GamePhase::Loading => Screen::Loading,
            GamePhase::Opening => Screen::Opening {
                stage: self.stage.map_or("", |s| s.name),
            },
            GamePhase::Playing => Screen::Hud(self.session.hud()),
            GamePhase::SkillSelection => Screen::SkillSelection {
                offers: self.session.offers(),
                hud: self.session.hud(),
            },
            GamePhase::Paused => Screen::Pause(self.session.hud()),
            GamePhase::GameOver => Screen::GameOver(self.session.summary()),
            GamePhase::Victory => Screen::Victory(self.session.summary()),
            GamePhase::Result => Screen::Result(self.session.summary()),
        }
    }

    /// Run one frame. `movement` is the player's steering input.
    pub fn frame(&mut self, dt: f32, movement: Vec2, presenter: &mut dyn Presenter) {
        match self.phase {
            GamePhase::Loading => {
                self.session.idle(dt);
                let done = self.pending_world.as_mut().is_some_and(|op| op.is_complete());
                if !done {
                    return;
                }
                let result = self.pending_world.take().and_then(|op| op.take());
                match result {
                    Some(Ok(arena)) => {
                        self.ready_world = Some(arena);
                        self.handle(PhaseEvent::WorldReady, presenter);
                    }
                    Some(Err(e)) => {
                        log::error!("world generation failed: {}", e);
                        self.enter(GamePhase::StageSelect, presenter);
                    }
                    None => self.enter(GamePhase::StageSelect, presenter),
                }
            }
            GamePhase::Opening => {
                self.session.idle(dt);
                self.phase_timer -= dt;
                if self.phase_timer <= 0.0 {
                    self.handle(PhaseEvent::OpeningFinished, presenter);
                }
            }
            GamePhase::Playing => {
                self.session.world.player.input = movement;
                let outcome = self.session.tick(dt);
                self.session.sync_presentation(presenter);
                match outcome {
                    RunOutcome::Defeat => {
                        self.handle(PhaseEvent::PlayerDied, presenter);
                    }
                    RunOutcome::Victory => {
                        self.handle(PhaseEvent::VictoryReached, presenter);
                    }
                    RunOutcome::InProgress => {
                        if !self.handle(PhaseEvent::LevelUp, presenter) {
                            presenter.show_screen(Screen::Hud(self.session.hud()));
                        }
                    }
                }
            }
            GamePhase::GameOver | GamePhase::Victory => {
                self.session.idle(dt);
                self.phase_timer -= dt;
                if self.phase_timer <= 0.0 {
                    self.handle(PhaseEvent::ShowResult, presenter);
                }
            }
            _ => self.session.idle(dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{HeadlessPresenter, SkillId};

    const DT: f32 = 1.0 / 60.0;

    fn quiet_tuning() -> Tuning {
        let mut tuning = Tuning::default();
        tuning.spawn.interval_start = 1.0e5;
        tuning.spawn.interval_end = 1.0e5;
        tuning.spawn.formation_interval = 1.0e5;
        tuning.spawn.boss_time = 1.0e5;
        tuning
    }

    /// Drive frames until `phase` is reached or give up after a while.
    fn run_until(app: &mut App, presenter: &mut HeadlessPresenter, phase: GamePhase) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while app.phase() != phase {
            assert!(std::time::Instant::now() < deadline, "stuck in {:?}", app.phase());
            app.frame(DT, Vec2::ZERO, presenter);
            std::thread::yield_now();
        }
    }

    /// Grant exactly enough xp for one level.
    fn level_up(app: &mut App) {
        let hud = app.session.hud();
        assert_eq!(app.session.grant_xp(hud.xp_next - hud.xp), 1);
    }

    fn playing(tuning: Tuning) -> (App, HeadlessPresenter) {
        let mut app = App::new(tuning, 7);
        let mut presenter = HeadlessPresenter::default();
        app.start(&mut presenter);
        assert!(app.handle(PhaseEvent::CharacterChosen(0), &mut presenter));
        assert!(app.handle(PhaseEvent::StageChosen(0), &mut presenter));
        run_until(&mut app, &mut presenter, GamePhase::Playing);
        (app, presenter)
    }

    #[test]
    fn test_menu_flow_reaches_playing() {
        let mut app = App::new(Tuning::default(), 1);
        let mut presenter = HeadlessPresenter::default();
        app.start(&mut presenter);
        assert_eq!(presenter.screens, vec![ScreenId::CharacterSelect]);

        assert!(!app.handle(PhaseEvent::CharacterChosen(99), &mut presenter), "out of range");
        assert!(!app.handle(PhaseEvent::Pause, &mut presenter), "not playing yet");
        assert_eq!(app.phase(), GamePhase::CharacterSelect);

        assert!(app.handle(PhaseEvent::CharacterChosen(1), &mut presenter));
        assert!(!app.handle(PhaseEvent::StageChosen(42), &mut presenter));
        assert!(app.handle(PhaseEvent::StageChosen(1), &mut presenter));
        assert_eq!(app.phase(), GamePhase::Loading);

        run_until(&mut app, &mut presenter, GamePhase::Opening);
        assert_eq!(app.session.time(), 0.0, "no combat before the fight");
        run_until(&mut app, &mut presenter, GamePhase::Playing);
        assert_eq!(presenter.screens, vec![ScreenId::Hud]);
    }

    #[test]
    fn test_pause_freezes_simulation() {
        let (mut app, mut presenter) = playing(quiet_tuning());
        app.frame(DT, Vec2::X, &mut presenter);
        assert!(app.handle(PhaseEvent::Pause, &mut presenter));

        let time = app.session.time();
        let idle = app.session.idle_time();
        for _ in 0..30 {
            app.frame(DT, Vec2::X, &mut presenter);
        }
        assert_eq!(app.session.time(), time);
        assert!(app.session.idle_time() > idle);

        assert!(!app.handle(PhaseEvent::Pause, &mut presenter));
        assert!(app.handle(PhaseEvent::Resume, &mut presenter));
        app.frame(DT, Vec2::X, &mut presenter);
        assert!(app.session.time() > time);
    }

    #[test]
    fn test_skill_selection_reenters_while_levels_pending() {
        let (mut app, mut presenter) = playing(quiet_tuning());
        // Two levels at once with the default curve
        assert_eq!(app.session.grant_xp(20), 2);
        app.frame(DT, Vec2::ZERO, &mut presenter);
        assert_eq!(app.phase(), GamePhase::SkillSelection);

        let time = app.session.time();
        app.frame(DT, Vec2::ZERO, &mut presenter);
        assert_eq!(app.session.time(), time, "no combat while choosing");

        assert!(!app.handle(PhaseEvent::SkillChosen(10), &mut presenter));
        assert!(app.handle(PhaseEvent::Pause, &mut presenter));
        assert!(!app.handle(PhaseEvent::SkillChosen(0), &mut presenter));
        assert!(app.handle(PhaseEvent::Resume, &mut presenter));
        assert_eq!(app.phase(), GamePhase::SkillSelection);

        assert!(app.handle(PhaseEvent::SkillChosen(0), &mut presenter));
        assert_eq!(app.phase(), GamePhase::SkillSelection);
        assert!(app.handle(PhaseEvent::SkillChosen(1), &mut presenter));
        assert_eq!(app.phase(), GamePhase::Playing);
        assert_eq!(app.session.pending_level_ups(), 0);
        let levels: u32 = app.session.loadout().iter().map(|(_, l)| l as u32).sum();
        assert_eq!(levels, 2);
    }

    #[test]
    fn test_level_up_with_every_skill_maxed_keeps_playing() {
        let mut tuning = quiet_tuning();
        tuning.progression.max_skill_level = 1;
        tuning.progression.offer_count = SkillId::ALL.len();
        let (mut app, mut presenter) = playing(tuning);

        // One level with every skill on offer, then pick them all
        for _ in 0..SkillId::ALL.len() {
            level_up(&mut app);
            app.frame(DT, Vec2::ZERO, &mut presenter);
            assert_eq!(app.phase(), GamePhase::SkillSelection);
            assert!(app.handle(PhaseEvent::SkillChosen(0), &mut presenter));
            assert_eq!(app.phase(), GamePhase::Playing);
        }
        assert_eq!(app.session.loadout().len(), SkillId::ALL.len());

        level_up(&mut app);
        let time = app.session.time();
        app.frame(DT, Vec2::ZERO, &mut presenter);
        assert_eq!(app.phase(), GamePhase::Playing);
        assert_eq!(app.session.pending_level_ups(), 0);
        app.frame(DT, Vec2::ZERO, &mut presenter);
        assert!(app.session.time() > time, "the run keeps going");
    }

    #[test]
    fn test_death_leads_to_result_and_restart() {
        let (mut app, mut presenter) = playing(quiet_tuning());
        app.session.world.player.health = -5.0;
        app.frame(DT, Vec2::ZERO, &mut presenter);
        assert_eq!(app.phase(), GamePhase::GameOver);

        run_until(&mut app, &mut presenter, GamePhase::Result);
        assert_eq!(presenter.screens, vec![ScreenId::Result]);

        assert!(app.handle(PhaseEvent::Restart, &mut presenter));
        assert_eq!(app.phase(), GamePhase::CharacterSelect);
    }

    #[test]
    fn test_victory_path() {
        let mut tuning = quiet_tuning();
        tuning.spawn.session_duration = 0.25;
        let (mut app, mut presenter) = playing(tuning);
        run_until(&mut app, &mut presenter, GamePhase::Victory);
        assert!(!app.handle(PhaseEvent::Pause, &mut presenter));
        run_until(&mut app, &mut presenter, GamePhase::Result);
    }
}
