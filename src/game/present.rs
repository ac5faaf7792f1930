//! Presentation seam
//!
//! Rendering, UI layout and audio live outside the core. The core talks
//! to them through `Presenter`:
//! - visual handles are created when an entity appears and released when
//!   it is despawned; the core stores the handle next to the entity
//! - every frame each handle receives its entity's transform
//! - screens are shown/hidden with typed payloads
//! - discrete events arrive as callbacks, one per occurrence

use serde::{Deserialize, Serialize};

use super::components::Tier;
use super::event::*;
use super::runtime::RunSummary;
use super::skills::SkillId;
use super::transform::Transform2;

/// Opaque reference to something the presenter draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualHandle(pub u64);

/// What kind of thing a visual represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    Player,
    Enemy(Tier),
    Projectile,
    Orbital,
    Orb,
    Hazard,
}

/// Numbers for the in-run HUD
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HudPayload {
    pub health: f32,
    pub max_health: f32,
    pub xp: u32,
    /// Threshold of the next level
    pub xp_next: u32,
    pub level: u32,
    pub elapsed: f32,
    pub kills: u32,
    pub skills: Vec<(SkillId, u8)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenId {
    CharacterSelect,
    StageSelect,
    Loading,
    Opening,
    Hud,
    SkillSelection,
    Pause,
    GameOver,
    Victory,
    Result,
}

/// A screen and the data it displays.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    CharacterSelect,
    StageSelect,
    Loading,
    Opening { stage: &'static str },
    Hud(HudPayload),
    SkillSelection { offers: Vec<(SkillId, u8)>, hud: HudPayload },
    Pause(HudPayload),
    GameOver(RunSummary),
    Victory(RunSummary),
    Result(RunSummary),
}

impl Screen {
    pub fn id(&self) -> ScreenId {
        match self {
            Screen::CharacterSelect => ScreenId::CharacterSelect,
            Screen::StageSelect => ScreenId::StageSelect,
            Screen::Loading => ScreenId::Loading,
            Screen::Opening { .. } => ScreenId::Opening,
            Screen::Hud(_) => ScreenId::Hud,
            Screen::SkillSelection { .. } => ScreenId::SkillSelection,
            Screen::Pause(_) => ScreenId::Pause,
            Screen::GameOver(_) => ScreenId::GameOver,
            Screen::Victory(_) => ScreenId::Victory,
            Screen::Result(_) => ScreenId::Result,
        }
    }
}

/// Everything the core needs from whoever draws the game.
///
/// Event callbacks default to no-ops so a presenter only implements what
/// it renders.
pub trait Presenter {
    fn add_visual(&mut self, kind: VisualKind) -> VisualHandle;
    fn remove_visual(&mut self, handle: VisualHandle);
    fn set_transform(&mut self, handle: VisualHandle, transform: Transform2);
    fn show_screen(&mut self, screen: Screen);
    fn hide_screen(&mut self, id: ScreenId);

    fn on_kill(&mut self, _event: &KillEvent) {}
    fn on_kill_tier(&mut self, _event: &KillTierEvent) {}
    fn on_kill_streak(&mut self, _event: &KillStreakEvent) {}
    fn on_knockback(&mut self, _event: &KnockbackEvent) {}
    fn on_shake(&mut self, _event: &ShakeEvent) {}
    fn on_burst(&mut self, _event: &BurstEvent) {}
    fn on_beam(&mut self, _event: &BeamEvent) {}
    fn on_merge(&mut self, _event: &MergeEvent) {}
    fn on_absorbed(&mut self, _event: &AbsorbedEvent) {}
    fn on_player_damaged(&mut self, _event: &PlayerDamagedEvent) {}
    fn on_boss_warning(&mut self, _event: &BossWarningEvent) {}
    fn on_boss_spawned(&mut self, _event: &BossSpawnedEvent) {}
    fn on_level_up(&mut self, _event: &LevelUpEvent) {}

    /// Field proximity 0..1 for screen tint / audio; presentation only.
    fn on_field_proximity(&mut self, _intensity: f32) {}
}

/// Hand every queued event to the presenter, then clear the queues.
pub fn dispatch_events(events: &mut Events, presenter: &mut dyn Presenter) {
    for e in events.kill.drain() {
        presenter.on_kill(&e);
    }
    for e in events.kill_tier.drain() {
        presenter.on_kill_tier(&e);
    }
    for e in events.kill_streak.drain() {
        presenter.on_kill_streak(&e);
    }
    for e in events.knockback.drain() {
        presenter.on_knockback(&e);
    }
    for e in events.shake.drain() {
        presenter.on_shake(&e);
    }
    for e in events.burst.drain() {
        presenter.on_burst(&e);
    }
    for e in events.beam.drain() {
        presenter.on_beam(&e);
    }
    for e in events.merge.drain() {
        presenter.on_merge(&e);
    }
    for e in events.absorbed.drain() {
        presenter.on_absorbed(&e);
    }
    for e in events.player_damaged.drain() {
        presenter.on_player_damaged(&e);
    }
    for e in events.boss_warning.drain() {
        presenter.on_boss_warning(&e);
    }
    for e in events.boss_spawned.drain() {
        presenter.on_boss_spawned(&e);
    }
    for e in events.level_up.drain() {
        presenter.on_level_up(&e);
    }
}

/// Presenter that draws nothing and hands out sequential handles.
/// Used by headless runs and tests.
#[derive(Debug, Default)]
pub struct HeadlessPresenter {
    next_handle: u64,
    pub live_visuals: usize,
    pub screens: Vec<ScreenId>,
    pub kills_seen: usize,
    pub streaks_seen: Vec<u32>,
}

impl Presenter for HeadlessPresenter {
    fn add_visual(&mut self, _kind: VisualKind) -> VisualHandle {
        self.next_handle += 1;
        self.live_visuals += 1;
        VisualHandle(self.next_handle)
    }

    fn remove_visual(&mut self, _handle: VisualHandle) {
        self.live_visuals = self.live_visuals.saturating_sub(1);
    }

    fn set_transform(&mut self, _handle: VisualHandle, _transform: Transform2) {}

    fn show_screen(&mut self, screen: Screen) {
        self.screens.push(screen.id());
    }

    fn hide_screen(&mut self, id: ScreenId) {
        self.screens.retain(|s| *s != id);
    }

    fn on_kill(&mut self, _event: &KillEvent) {
        self.kills_seen += 1;
    }

    fn on_kill_streak(&mut self, event: &KillStreakEvent) {
        self.streaks_seen.push(event.streak);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Entity;
    use glam::Vec2;

    #[test]
    fn test_dispatch_drains_queues() {
        let mut events = Events::new();
        events.kill.send(KillEvent {
            entity: Entity::default(),
            position: Vec2::ZERO,
            tier: Tier::Medium,
            score: 30,
        });
        events.kill_streak.send(KillStreakEvent { streak: 5, tier: 0 });

        let mut presenter = HeadlessPresenter::default();
        dispatch_events(&mut events, &mut presenter);

        assert_eq!(presenter.kills_seen, 1);
        assert_eq!(presenter.streaks_seen, vec![5]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_headless_screens() {
        let mut presenter = HeadlessPresenter::default();
        presenter.show_screen(Screen::Loading);
        presenter.show_screen(Screen::Hud(HudPayload::default()));
        presenter.hide_screen(ScreenId::Loading);
        assert_eq!(presenter.screens, vec![ScreenId::Hud]);
    }
}
