//! Experience, levels and the kill-streak combo.

use crate::tuning::{ComboTuning, ProgressionTuning};

use super::event::KillStreakEvent;

/// Hard ceiling for the level search loop.
const MAX_LEVEL: u32 = 999;

/// Experience curve plus the queue of unspent level-ups.
#[derive(Debug, Clone, PartialEq)]
pub struct Progression {
    xp: u32,
    level: u32,
    pending: u32,
    base: f32,
    growth: f32,
}

impl Progression {
    pub fn new(tuning: &ProgressionTuning) -> Self {
        Self {
            xp: 0,
            level: 1,
            pending: 0,
            base: tuning.xp_base,
            growth: tuning.xp_growth,
        }
    }

    /// Total xp needed to reach `level` (level 1 needs none).
    pub fn threshold(&self, level: u32) -> u32 {
        if level <= 1 {
            return 0;
        }
        let n = (level - 1) as f32;
        (self.base * n + self.growth * n * n).round() as u32
    }

    /// Highest level whose threshold `xp` meets.
    pub fn level_for_xp(&self, xp: u32) -> u32 {
        let mut level = 1;
        while level < MAX_LEVEL && self.threshold(level + 1) <= xp {
            level += 1;
        }
        level
    }

    /// Add xp; returns the levels gained, each queued as a pending level-up.
    pub fn add_xp(&mut self, amount: u32) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        let level = self.level_for_xp(self.xp);
        let gained = level.saturating_sub(self.level);
        self.level = level;
        self.pending += gained;
        gained
    }

    /// Spend one pending level-up. False when none are queued.
    pub fn take_pending(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }

    pub fn xp(&self) -> u32 {
        self.xp
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    pub fn next_threshold(&self) -> u32 {
        self.threshold(self.level + 1)
    }
}

/// Rolling kill window.
#[derive(Debug, Clone, PartialEq)]
pub struct ComboTracker {
    streak: u32,
    max_streak: u32,
    since_kill: f32,
    window: f32,
    thresholds: Vec<u32>,
}

impl ComboTracker {
    pub fn new(tuning: &ComboTuning) -> Self {
        Self {
            streak: 0,
            max_streak: 0,
            since_kill: 0.0,
            window: tuning.window,
            thresholds: tuning.thresholds.clone(),
        }
    }

    /// Advance the window; the streak drops once it lapses without a kill.
    pub fn update(&mut self, dt: f32) {
        if self.streak == 0 {
            return;
        }
        self.since_kill += dt;
        if self.since_kill > self.window {
            self.streak = 0;
            self.since_kill = 0.0;
        }
    }

    /// Count a kill. Returns the streak signal when a threshold is hit.
    pub fn register_kill(&mut self) -> Option<KillStreakEvent> {
        self.streak += 1;
        self.since_kill = 0.0;
        self.max_streak = self.max_streak.max(self.streak);
        self.thresholds
            .iter()
            .position(|t| *t == self.streak)
            .map(|tier| KillStreakEvent {
                streak: self.streak,
                tier,
            })
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn max_streak(&self) -> u32 {
        self.max_streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_curve_is_monotonic_and_inverse() {
        let p = Progression::new(&ProgressionTuning::default());
        assert_eq!(p.threshold(1), 0);
        let mut prev = 0;
        for level in 2..60 {
            let t = p.threshold(level);
            assert!(t > prev);
            assert_eq!(p.level_for_xp(t), level);
            assert_eq!(p.level_for_xp(t - 1), level - 1);
            prev = t;
        }
    }

    #[test]
    fn test_each_level_queues_a_token() {
        let mut p = Progression::new(&ProgressionTuning::default());
        let gained = p.add_xp(p.threshold(4));
        assert_eq!(gained, 3);
        assert_eq!(p.level(), 4);
        assert_eq!(p.pending(), 3);
        assert!(p.take_pending());
        assert!(p.take_pending());
        assert!(p.take_pending());
        assert!(!p.take_pending());
    }

    #[test]
    fn test_combo_thresholds_and_expiry() {
        let tuning = ComboTuning {
            window: 1.0,
            thresholds: vec![3, 5],
        };
        let mut combo = ComboTracker::new(&tuning);
        assert!(combo.register_kill().is_none());
        combo.update(0.5);
        assert!(combo.register_kill().is_none());
        let signal = combo.register_kill().unwrap();
        assert_eq!((signal.streak, signal.tier), (3, 0));

        combo.update(1.5);
        assert_eq!(combo.streak(), 0);
        assert_eq!(combo.max_streak(), 3);
        assert!(combo.register_kill().is_none());
        assert_eq!(combo.streak(), 1);
    }
}
