//! VOIDRUSH demo shell
//!
//! Plays a run with flat shapes: circles for bodies, text for screens.
//! Everything that matters happens in the library; this file is one
//! possible presenter.

use std::collections::HashMap;
use std::path::Path;

use macroquad::prelude::*;

use voidrush::app::{App, GamePhase, PhaseEvent};
use voidrush::catalog::{CHARACTERS, STAGES};
use voidrush::game::event::{BossWarningEvent, KillStreakEvent, KillTierEvent, PlayerDamagedEvent, ShakeEvent};
use voidrush::game::{Presenter, RunSummary, Screen, ScreenId, Tier, Transform2, VisualHandle, VisualKind};
use voidrush::tuning::Tuning;
use voidrush::VERSION;

const TUNING_PATH: &str = "tuning.ron";

/// Seconds a banner line stays on screen
const BANNER_TIME: f32 = 1.2;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("VOIDRUSH v{}", VERSION),
        window_width: 1280,
        window_height: 800,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

/// Draws what the session tells it to with macroquad primitives.
#[derive(Default)]
struct MacroquadPresenter {
    next_handle: u64,
    visuals: HashMap<VisualHandle, (VisualKind, Transform2)>,
    screen: Option<Screen>,
    shake: f32,
    /// Red flash after taking damage
    hurt: f32,
    field_intensity: f32,
    banner: Option<(String, f32)>,
}

impl MacroquadPresenter {
    fn banner(&mut self, text: impl Into<String>) {
        self.banner = Some((text.into(), BANNER_TIME));
    }

    fn update(&mut self, dt: f32) {
        self.shake = (self.shake - dt * 2.0).max(0.0);
        self.hurt = (self.hurt - dt * 3.0).max(0.0);
        if let Some((_, t)) = &mut self.banner {
            *t -= dt;
            if *t <= 0.0 {
                self.banner = None;
            }
        }
    }

    fn player_position(&self) -> Vec2 {
        self.visuals
            .values()
            .find(|(kind, _)| *kind == VisualKind::Player)
            .map_or(Vec2::ZERO, |(_, t)| t.position)
    }
}

impl Presenter for MacroquadPresenter {
    fn add_visual(&mut self, kind: VisualKind) -> VisualHandle {
        self.next_handle += 1;
        let handle = VisualHandle(self.next_handle);
        self.visuals.insert(handle, (kind, Transform2::IDENTITY));
        handle
    }

    fn remove_visual(&mut self, handle: VisualHandle) {
        self.visuals.remove(&handle);
    }

    fn set_transform(&mut self, handle: VisualHandle, transform: Transform2) {
        if let Some(entry) = self.visuals.get_mut(&handle) {
            entry.1 = transform;
        }
    }

    fn show_screen(&mut self, screen: Screen) {
        self.screen = Some(screen);
    }

    fn hide_screen(&mut self, id: ScreenId) {
        if self.screen.as_ref().is_some_and(|s| s.id() == id) {
            self.screen = None;
        }
    }

    fn on_kill_tier(&mut self, event: &KillTierEvent) {
        let text = match event.tier {
            1 => "DOUBLE",
            2 => "MULTI",
            _ => "MASSACRE",
        };
        self.banner(format!("{} x{}", text, event.count));
    }

    fn on_kill_streak(&mut self, event: &KillStreakEvent) {
        self.banner(format!("{} STREAK", event.streak));
    }

    fn on_shake(&mut self, event: &ShakeEvent) {
        self.shake = self.shake.max(event.intensity);
    }

    fn on_player_damaged(&mut self, _event: &PlayerDamagedEvent) {
        self.hurt = 1.0;
    }

    fn on_boss_warning(&mut self, _event: &BossWarningEvent) {
        self.banner("WARNING: BOSS INBOUND");
    }

    fn on_field_proximity(&mut self, intensity: f32) {
        self.field_intensity = intensity;
    }
}

fn kind_color(kind: VisualKind) -> Color {
    match kind {
        VisualKind::Player => Color::from_rgba(120, 220, 255, 255),
        VisualKind::Enemy(Tier::Small) => Color::from_rgba(230, 90, 90, 255),
        VisualKind::Enemy(Tier::Medium) => Color::from_rgba(230, 140, 60, 255),
        VisualKind::Enemy(Tier::Large) => Color::from_rgba(200, 60, 160, 255),
        VisualKind::Enemy(Tier::Boss) => Color::from_rgba(160, 40, 220, 255),
        VisualKind::Projectile => Color::from_rgba(255, 250, 200, 255),
        VisualKind::Orbital => Color::from_rgba(150, 255, 180, 255),
        VisualKind::Orb => Color::from_rgba(90, 200, 255, 255),
        VisualKind::Hazard => Color::from_rgba(255, 70, 40, 120),
    }
}

/// Draw all bodies, centred on the player.
fn draw_world(presenter: &MacroquadPresenter, app: &App) {
    let camera = presenter.player_position();
    let shake = if presenter.shake > 0.0 {
        vec2(rand::gen_range(-1.0, 1.0), rand::gen_range(-1.0, 1.0)) * presenter.shake * 8.0
    } else {
        Vec2::ZERO
    };
    let centre = vec2(screen_width(), screen_height()) * 0.5 + shake;
    let to_screen = |p: Vec2| centre + (p - camera);

    if let Some(arena) = app.session.arena() {
        let min = to_screen(-arena.bounds.half);
        let size = arena.bounds.half * 2.0;
        draw_rectangle_lines(min.x, min.y, size.x, size.y, 2.0, Color::from_rgba(70, 70, 90, 255));

        if let Some(field) = arena.field {
            let c = to_screen(field.position);
            draw_circle_lines(c.x, c.y, field.radius, 1.0, Color::from_rgba(90, 60, 140, 255));
            draw_circle(c.x, c.y, field.horizon, Color::from_rgba(10, 0, 20, 255));
            draw_circle_lines(c.x, c.y, field.horizon, 2.0, Color::from_rgba(180, 120, 255, 255));
        }
    }

    for (kind, transform) in presenter.visuals.values() {
        let p = to_screen(transform.position);
        draw_circle(p.x, p.y, (transform.scale * 0.5).max(1.0), kind_color(*kind));
    }

    if presenter.hurt > 0.0 {
        let a = (presenter.hurt * 90.0) as u8;
        draw_rectangle(0.0, 0.0, screen_width(), screen_height(), Color::from_rgba(255, 0, 0, a));
    }
    if presenter.field_intensity > 0.0 {
        let a = (presenter.field_intensity * 70.0) as u8;
        draw_rectangle(0.0, 0.0, screen_width(), screen_height(), Color::from_rgba(80, 0, 140, a));
    }
}

fn draw_lines(lines: &[String], x: f32, y: f32, size: f32) {
    for (i, line) in lines.iter().enumerate() {
        draw_text(line, x, y + i as f32 * size * 1.2, size, WHITE);
    }
}

fn summary_lines(title: &str, s: &RunSummary) -> Vec<String> {
    let mut lines = vec![
        title.to_string(),
        format!("{} on {}", s.character, s.stage),
        format!("time {:.0}s  level {}  kills {}  score {}", s.elapsed, s.level, s.kills, s.score),
        format!("best streak {}", s.max_streak),
        format!(
            "pierces {}  bounces {}  merges {}  absorbed {}",
            s.physics.pierces, s.physics.bounces, s.physics.merges, s.physics.absorbed
        ),
    ];
    for (skill, level) in &s.skills {
        lines.push(format!("  {} {}", skill.label(), level));
    }
    lines
}

fn draw_screen(presenter: &MacroquadPresenter) {
    let Some(screen) = &presenter.screen else {
        return;
    };
    let lines: Vec<String> = match screen {
        Screen::CharacterSelect => std::iter::once("Choose a pilot".to_string())
            .chain(CHARACTERS.iter().enumerate().map(|(i, c)| format!("[{}] {}", i + 1, c.name)))
            .collect(),
        Screen::StageSelect => std::iter::once("Choose a sector".to_string())
            .chain(STAGES.iter().enumerate().map(|(i, s)| format!("[{}] {}", i + 1, s.name)))
            .collect(),
        Screen::Loading => vec!["Charting sector...".to_string()],
        Screen::Opening { stage } => vec![stage.to_string()],
        Screen::Hud(hud) | Screen::Pause(hud) => {
            let mut lines = vec![
                format!("HP {:.0}/{:.0}", hud.health, hud.max_health),
                format!("LV {}  XP {}/{}", hud.level, hud.xp, hud.xp_next),
                format!("{:.0}s  kills {}", hud.elapsed, hud.kills),
            ];
            if matches!(screen, Screen::Pause(_)) {
                lines.push("PAUSED  [Esc] resume  [Q] quit".to_string());
            }
            lines
        }
        Screen::SkillSelection { offers, hud } => std::iter::once(format!("Level {}! Choose a skill", hud.level))
            .chain(
                offers
                    .iter()
                    .enumerate()
                    .map(|(i, (skill, level))| format!("[{}] {} -> {}", i + 1, skill.label(), level)),
            )
            .collect(),
        Screen::GameOver(s) => summary_lines("DESTROYED", s),
        Screen::Victory(s) => summary_lines("SURVIVED", s),
        Screen::Result(s) => {
            let mut lines = summary_lines("Run complete", s);
            lines.push("[Enter] new run".to_string());
            lines
        }
    };
    draw_lines(&lines, 24.0, 40.0, 28.0);

    if let Some((text, _)) = &presenter.banner {
        let dims = measure_text(text, None, 40, 1.0);
        draw_text(text, (screen_width() - dims.width) * 0.5, screen_height() * 0.25, 40.0, YELLOW);
    }
}

fn number_key() -> Option<usize> {
    const KEYS: [KeyCode; 5] = [KeyCode::Key1, KeyCode::Key2, KeyCode::Key3, KeyCode::Key4, KeyCode::Key5];
    KEYS.iter().position(|k| is_key_pressed(*k))
}

fn movement_input() -> Vec2 {
    let mut v = Vec2::ZERO;
    if is_key_down(KeyCode::W) || is_key_down(KeyCode::Up) {
        v.y -= 1.0;
    }
    if is_key_down(KeyCode::S) || is_key_down(KeyCode::Down) {
        v.y += 1.0;
    }
    if is_key_down(KeyCode::A) || is_key_down(KeyCode::Left) {
        v.x -= 1.0;
    }
    if is_key_down(KeyCode::D) || is_key_down(KeyCode::Right) {
        v.x += 1.0;
    }
    v.normalize_or_zero()
}

/// Turn key presses into phase events for the current phase.
fn handle_input(app: &mut App, presenter: &mut MacroquadPresenter) {
    let event = match app.phase() {
        GamePhase::CharacterSelect => number_key().map(PhaseEvent::CharacterChosen),
        GamePhase::StageSelect => number_key().map(PhaseEvent::StageChosen),
        GamePhase::SkillSelection => number_key().map(PhaseEvent::SkillChosen),
        GamePhase::Playing if is_key_pressed(KeyCode::Escape) => Some(PhaseEvent::Pause),
        GamePhase::Paused if is_key_pressed(KeyCode::Escape) => Some(PhaseEvent::Resume),
        GamePhase::Paused if is_key_pressed(KeyCode::Q) => Some(PhaseEvent::Restart),
        GamePhase::Result if is_key_pressed(KeyCode::Enter) => Some(PhaseEvent::Restart),
        _ => None,
    };
    if let Some(event) = event {
        if !app.handle(event, presenter) {
            log::debug!("ignored {:?} in {}", event, app.phase().label());
        }
    }
}

fn load_tuning() -> Tuning {
    let path = Path::new(TUNING_PATH);
    if !path.exists() {
        return Tuning::default();
    }
    match Tuning::load(path) {
        Ok(tuning) => {
            log::info!("loaded tuning from {}", TUNING_PATH);
            tuning
        }
        Err(e) => {
            log::warn!("ignoring {}: {}", TUNING_PATH, e);
            Tuning::default()
        }
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    // Initialize crash logging FIRST (before any other code)
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    env_logger::init();

    let seed = (get_time() * 1000.0) as u64 ^ 0x5eed;
    let mut app = App::new(load_tuning(), seed);
    let mut presenter = MacroquadPresenter::default();
    app.start(&mut presenter);

    loop {
        let dt = get_frame_time();
        handle_input(&mut app, &mut presenter);
        app.frame(dt, movement_input(), &mut presenter);
        presenter.update(dt);

        clear_background(Color::from_rgba(12, 12, 18, 255));
        if matches!(
            app.phase(),
            GamePhase::Playing | GamePhase::SkillSelection | GamePhase::Paused | GamePhase::GameOver | GamePhase::Victory
        ) {
            draw_world(&presenter, &app);
        }
        draw_screen(&presenter);

        next_frame().await;
    }
}
