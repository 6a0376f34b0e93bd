//! Progress Tracker
//!
//! Turns step completion and wall-clock time into a non-decreasing
//! percentage plus a status message, written into the result store.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::store::AssessmentStore;

pub struct Step {
    pub name: &'static str,
    pub weight: u32,
}

/// Ordered steps; weights sum to 100
pub const STEPS: [Step; 9] = [
    Step { name: "Initializing assessment", weight: 5 },
    Step { name: "Scanning breach history", weight: 15 },
    Step { name: "Analyzing privacy practices", weight: 15 },
    Step { name: "Detecting AI services", weight: 15 },
    Step { name: "Discovering compliance documentation", weight: 15 },
    Step { name: "Locating trust center", weight: 10 },
    Step { name: "Mapping data flows", weight: 10 },
    Step { name: "Calculating risk scores", weight: 10 },
    Step { name: "Finalizing report", weight: 5 },
];

pub const INIT_STEP: usize = 0;
pub const FIRST_SCAN_STEP: usize = 1;
pub const LAST_SCAN_STEP: usize = 6;
pub const SCORING_STEP: usize = 7;
pub const FINAL_STEP: usize = 8;

fn prior_weight(step: usize) -> f64 {
    STEPS[..step].iter().map(|s| s.weight as f64).sum()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub struct ProgressTracker {
    store: Arc<dyn AssessmentStore>,
    assessment_id: Uuid,
    current_step: Option<usize>,
    step_progress: f64,
    percentage: f64,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn AssessmentStore>, assessment_id: Uuid) -> Self {
        Self {
            store,
            assessment_id,
            current_step: None,
            step_progress: 0.0,
            percentage: 0.0,
            start_time: Instant::now(),
        }
    }

    pub fn current_step(&self) -> Option<usize> {
        self.current_step
    }

    pub fn step_progress(&self) -> f64 {
        self.step_progress
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Move to step `index`. Regressions and unknown steps are ignored.
    pub fn start_step(&mut self, index: usize) {
        if index >= STEPS.len() || self.current_step.is_some_and(|current| index <= current) {
            return;
        }

        self.current_step = Some(index);
        self.step_progress = 0.0;
        self.update_progress(prior_weight(index), STEPS[index].name);
    }

    /// Progress within the current step, 0..=100. Decreases are ignored.
    pub fn update_step_progress(&mut self, progress: f64) {
        let Some(step) = self.current_step else {
            return;
        };
        let progress = progress.clamp(0.0, 100.0);
        if progress <= self.step_progress {
            return;
        }

        self.step_progress = progress;
        let pct = prior_weight(step) + progress / 100.0 * STEPS[step].weight as f64;
        self.update_progress(pct, STEPS[step].name);
    }

    /// Small within-step advance, capped below step completion
    pub fn nudge(&mut self, increment: f64, cap: f64) {
        let target = (self.step_progress + increment).min(cap);
        self.update_step_progress(target);
    }

    /// Write percentage, status text, elapsed time and ETA into the store
    pub fn update_progress(&mut self, pct: f64, status: &str) {
        let pct = round1(pct.clamp(0.0, 100.0));
        if pct < self.percentage {
            return;
        }
        self.percentage = pct;

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let remaining = (pct > 0.0).then(|| round1(elapsed / pct * (100.0 - pct)));

        let updated = self.store.update(&self.assessment_id, &mut |assessment| {
            assessment.record_progress(pct, status, round1(elapsed), remaining);
        });
        if !updated {
            tracing::warn!("Progress update for unknown assessment {}", self.assessment_id);
        }
    }
}
