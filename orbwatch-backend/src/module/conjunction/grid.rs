///! Shared sampling grid for one analysis run
///!
///! Every component that needs sample times builds them here. Step and
///! offsets are held in days; conversion to an absolute timestamp happens
///! only in `TimeGrid::timestamp`.
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use orbwatch_common::tle::SECONDS_PER_DAY;
use std::time::Duration;
use thiserror::Error;

/// Tolerance for the window/step ratio so 3600 s / 30 s yields 120, not 119
const RATIO_EPSILON: f64 = 1e-9;

/// Upper bound on samples per object in one run
pub const MAX_GRID_POINTS: usize = 100_000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("grid step must be positive and finite, got {0} days")]
    InvalidStep(f64),

    #[error("grid of {points} points exceeds the limit of {max}")]
    TooManyPoints { points: f64, max: usize },
}

/// Grid spacing expressed as a fraction of a day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStep {
    days: f64,
}

impl GridStep {
    pub fn from_seconds(seconds: f64) -> Self {
        Self {
            days: seconds / SECONDS_PER_DAY,
        }
    }

    pub fn days(&self) -> f64 {
        self.days
    }

    pub fn seconds(&self) -> f64 {
        self.days * SECONDS_PER_DAY
    }
}

/// Evenly spaced, increasing sample times starting at `start`
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    start: DateTime<Utc>,
    step: GridStep,
    len: usize,
}

impl TimeGrid {
    /// `max(1, floor(window / step))` points, the first one at `start`, at
    /// most `MAX_GRID_POINTS`.
    pub fn new(start: DateTime<Utc>, window: Duration, step: GridStep) -> Result<Self, GridError> {
        if !step.days.is_finite() || step.days <= 0.0 {
            return Err(GridError::InvalidStep(step.days));
        }
        let window_days = window.as_secs_f64() / SECONDS_PER_DAY;
        let ratio = (window_days / step.days + RATIO_EPSILON).floor();
        if ratio > MAX_GRID_POINTS as f64 {
            return Err(GridError::TooManyPoints {
                points: ratio,
                max: MAX_GRID_POINTS,
            });
        }
        let len = if ratio >= 1.0 { ratio as usize } else { 1 };

        Ok(Self { start, step, len })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn step(&self) -> GridStep {
        self.step
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of point `index` from the start, in days.
    pub fn offset_days(&self, index: usize) -> f64 {
        index as f64 * self.step.days
    }

    pub fn timestamp(&self, index: usize) -> DateTime<Utc> {
        let micros = (self.offset_days(index) * SECONDS_PER_DAY * 1e6).round() as i64;
        self.start + ChronoDuration::microseconds(micros)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        (0..self.len).map(|i| self.timestamp(i))
    }
}
