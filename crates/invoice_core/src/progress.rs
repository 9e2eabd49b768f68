use std::time::Duration;

use crate::Stage;

/// Ceiling for simulated progress until the backend confirms a transition.
pub const PROGRESS_CEILING: f32 = 95.0;

/// Simulated progress inside the active stage.
///
/// The backend reports discrete stages only, so progress within a stage is
/// estimated from elapsed time against the stage's expected duration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageProgress {
    stage: Stage,
    elapsed: Duration,
    frozen: bool,
}

impl StageProgress {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            elapsed: Duration::ZERO,
            frozen: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Moves to `stage`, resetting the timer when the stage actually changes.
    pub fn enter(&mut self, stage: Stage) -> bool {
        if stage == self.stage {
            return false;
        }
        self.stage = stage;
        self.elapsed = Duration::ZERO;
        true
    }

    pub fn advance(&mut self, elapsed: Duration) {
        if self.frozen || self.stage.is_terminal() {
            return;
        }
        self.elapsed = self.elapsed.saturating_add(elapsed);
    }

    /// Stops the timer where it is. Used when processing halts.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn percent(&self) -> f32 {
        if self.stage.is_terminal() {
            return 100.0;
        }
        let estimate = self.stage.estimated_duration();
        if estimate.is_zero() {
            return PROGRESS_CEILING;
        }
        let raw = self.elapsed.as_secs_f32() / estimate.as_secs_f32() * 100.0;
        raw.min(PROGRESS_CEILING)
    }

    /// Whole-pipeline estimate combining the stage index with the in-stage timer.
    pub fn overall_percent(&self) -> f32 {
        let last = Stage::TERMINAL.index() as f32;
        if self.stage.is_terminal() {
            return 100.0;
        }
        (self.stage.index() as f32 * 100.0 + self.percent()) / last
    }
}
