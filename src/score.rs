//! Score and speed progression

use std::time::Duration;

/// Scoring rules taken from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRules {
    /// Points per cleared cell
    pub point_value: u64,
    /// Score that triggers the first speed-up
    pub score_level: f64,
    /// Growth of the threshold after each speed-up
    pub score_level_ratio: f64,
    /// Growth of the speed multiplier after each speed-up
    pub speed_ratio: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            point_value: 100,
            score_level: 2000.0,
            score_level_ratio: 2.0,
            speed_ratio: 1.5,
        }
    }
}

/// Scoring state
#[derive(Debug, Clone)]
pub struct Score {
    /// Current score
    pub points: u64,
    /// Total lines cleared
    pub lines: u32,
    /// Fall speed multiplier, starts at 1
    pub speed: f64,
    /// Score that must be exceeded for the next speed-up
    pub score_level: f64,
    rules: ScoringRules,
}

impl Default for Score {
    fn default() -> Self {
        Self::new(ScoringRules::default())
    }
}

impl Score {
    pub fn new(rules: ScoringRules) -> Self {
        Self {
            points: 0,
            lines: 0,
            speed: 1.0,
            score_level: rules.score_level,
            rules,
        }
    }

    /// Award a cleared line of `columns` cells.
    ///
    /// Returns true when the score crossed the threshold and the game sped up.
    pub fn add_line(&mut self, columns: i32) -> bool {
        let gained = (columns.max(0) as u64).saturating_mul(self.rules.point_value);
        self.points = self.points.saturating_add(gained);
        self.lines += 1;

        if self.points as f64 > self.score_level {
            self.score_level *= self.rules.score_level_ratio;
            self.speed *= self.rules.speed_ratio;
            true
        } else {
            false
        }
    }

    /// Time between gravity ticks at the current speed, never below 1ms
    pub fn fall_interval(&self, base_tick: Duration) -> Duration {
        let millis = (base_tick.as_millis() as f64 / self.speed).floor() as u64;
        Duration::from_millis(millis.max(1))
    }

    /// Speed multiplier formatted for the status line ("1", "1.5", "3.375")
    pub fn speed_label(&self) -> String {
        format!("{}", self.speed)
    }
}
