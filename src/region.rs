//! Playable region of a clip.
//!
//! A region is the `[start, end]` sub-interval of a clip selected for
//! audition. It is tracked independently of the clip itself: the end bound
//! stays unset until the decoder reports a duration, and both bounds are
//! re-clamped against each other on every edit so that
//! `0 <= start <= end <= duration` always holds.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    start: f64,
    end: Option<f64>,
    duration: f64,
}

impl Region {
    /// Empty region: start at zero, end unset, no known duration.
    pub fn new() -> Self {
        Self {
            start: 0.0,
            end: None,
            duration: 0.0,
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    /// The operator-visible end bound, `None` until a duration is known.
    pub fn end(&self) -> Option<f64> {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// End bound used for playback: the explicit end, or the full duration.
    pub fn effective_end(&self) -> f64 {
        self.end.unwrap_or(self.duration)
    }

    pub fn length(&self) -> f64 {
        self.effective_end() - self.start
    }

    /// Whether `t` lies within `[start, effective_end]`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.effective_end()
    }

    /// Set the start bound, clamped to `[0, effective_end]`.
    ///
    /// Non-finite input is ignored.
    pub fn set_start(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.start = value.clamp(0.0, self.effective_end());
    }

    /// Set the end bound, clamped to `[start, duration]`.
    ///
    /// Non-finite input is ignored.
    pub fn set_end(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.end = Some(value.clamp(self.start, self.duration));
    }

    /// Record the decoded duration.
    ///
    /// Fills in the end bound only when the operator has not chosen one.
    pub fn on_duration_known(&mut self, duration: f64) {
        let duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        self.duration = duration;
        match self.end {
            None => self.end = Some(duration),
            Some(end) if end > duration => {
                // Only reachable when a duration shrinks without a reset.
                self.end = Some(duration);
                self.start = self.start.min(duration);
            }
            Some(_) => {}
        }
    }

    /// Forget all bounds. Called before a new source starts decoding.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}
