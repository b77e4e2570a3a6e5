//! Single-shot interpolation of a position over a fixed duration.
//!
//! A `Timeline` is pure state: it is advanced with host timestamps, computes
//! progress from the elapsed time (not from frame counts), and therefore lands
//! exactly on `end` however late or irregular the frames are.

use nalgebra::Vector3;
use std::fmt;
use std::time::Duration;

use crate::clock::Timestamp;
use crate::easing::Easing;
use crate::error::TimelineError;
use crate::ids::TimelineId;

/// Callback fired once with the end value when a timeline completes.
pub type CompletionFn = Box<dyn FnOnce(Vector3<f32>) + Send + Sync>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimelineState {
    Running,
    Completed,
    Cancelled,
}

impl TimelineState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, TimelineState::Running)
    }
}

#[inline]
pub fn lerp_vec3(a: &Vector3<f32>, b: &Vector3<f32>, t: f32) -> Vector3<f32> {
    a + (b - a) * t
}

pub struct Timeline {
    id: TimelineId,
    start: Vector3<f32>,
    end: Vector3<f32>,
    start_time: Timestamp,
    duration: Duration,
    easing: Easing,
    on_complete: Option<CompletionFn>,
    state: TimelineState,
    progress: f32,
    last_value: Vector3<f32>,
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("id", &self.id)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("start_time", &self.start_time)
            .field("duration", &self.duration)
            .field("easing", &self.easing)
            .field("state", &self.state)
            .field("progress", &self.progress)
            .field("has_on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl Timeline {
    /// Create a running timeline. `duration` must be non-zero.
    pub fn new(
        id: TimelineId,
        start: Vector3<f32>,
        end: Vector3<f32>,
        start_time: Timestamp,
        duration: Duration,
        easing: Easing,
    ) -> Result<Self, TimelineError> {
        if duration.is_zero() {
            return Err(TimelineError::InvalidDuration { duration });
        }
        Ok(Self {
            id,
            start,
            end,
            start_time,
            duration,
            easing,
            on_complete: None,
            state: TimelineState::Running,
            progress: 0.0,
            last_value: start,
        })
    }

    /// Attach the completion callback, replacing any previous one.
    pub fn with_on_complete<F>(mut self, on_complete: F) -> Self
    where
        F: FnOnce(Vector3<f32>) + Send + Sync + 'static,
    {
        self.on_complete = Some(Box::new(on_complete));
        self
    }

    pub fn id(&self) -> TimelineId {
        self.id
    }

    pub fn start(&self) -> Vector3<f32> {
        self.start
    }

    pub fn end(&self) -> Vector3<f32> {
        self.end
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn state(&self) -> TimelineState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Linear progress in [0, 1] reached by the latest `advance`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Value produced by the latest `advance` (the start value before the first).
    pub fn current(&self) -> Vector3<f32> {
        self.last_value
    }

    /// Pure sample of the curve at linear progress `t`, without touching state.
    pub fn sample(&self, t: f32) -> Vector3<f32> {
        lerp_vec3(&self.start, &self.end, self.easing.apply(t))
    }

    /// Progress the timeline to `now` and return the interpolated value.
    ///
    /// Progress is derived from `now - start_time` and clamped to [0, 1]; it
    /// never moves backwards, even if `now` does. The frame that reaches 1
    /// completes the timeline and runs the completion callback before
    /// returning `end`. Later calls return `end` (or the last value, once
    /// cancelled) without side effects.
    pub fn advance(&mut self, now: Timestamp) -> Vector3<f32> {
        match self.state {
            TimelineState::Completed => return self.end,
            TimelineState::Cancelled => return self.last_value,
            TimelineState::Running => {}
        }

        let elapsed = now.saturating_duration_since(self.start_time);
        let ratio = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let progress = (ratio.clamp(0.0, 1.0) as f32).max(self.progress);

        if progress >= 1.0 {
            self.progress = 1.0;
            self.last_value = self.end;
            self.state = TimelineState::Completed;
            if let Some(on_complete) = self.on_complete.take() {
                on_complete(self.end);
            }
            return self.end;
        }

        self.progress = progress;
        self.last_value = self.sample(progress);
        self.last_value
    }

    /// Stop a running timeline. The completion callback is dropped without
    /// being called. Terminal timelines are left untouched.
    pub fn cancel(&mut self) {
        if self.state == TimelineState::Running {
            self.state = TimelineState::Cancelled;
            self.on_complete = None;
            log::debug!("timeline {:?} cancelled at progress {}", self.id, self.progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn mk(duration_ms: u64) -> Timeline {
        Timeline::new(
            TimelineId(0),
            Vector3::new(0.0, 5.0, 0.0),
            Vector3::new(-3.5, 0.3, 0.0),
            Timestamp::from_millis(1_000),
            Duration::from_millis(duration_ms),
            Easing::EaseInOutQuad,
        )
        .unwrap()
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = Timeline::new(
            TimelineId(0),
            Vector3::zeros(),
            Vector3::zeros(),
            Timestamp::ZERO,
            Duration::ZERO,
            Easing::Linear,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TimelineError::InvalidDuration {
                duration: Duration::ZERO
            }
        );
    }

    #[test]
    fn midpoint_uses_easing() {
        let mut tl = mk(1_000);
        let v = tl.advance(Timestamp::from_millis(1_250));
        // ease-in-out-quad(0.25) = 0.125
        assert_relative_eq!(v, tl.sample(0.25), epsilon = 1e-6);
        assert_relative_eq!(v.y, 5.0 + (0.3 - 5.0) * 0.125, epsilon = 1e-5);
        assert_eq!(tl.state(), TimelineState::Running);
    }

    #[test]
    fn before_start_time_is_progress_zero() {
        let mut tl = mk(1_000);
        let v = tl.advance(Timestamp::from_millis(10));
        assert_eq!(v, tl.start());
        assert_eq!(tl.progress(), 0.0);
    }

    #[test]
    fn late_frame_lands_exactly_on_end_and_fires_once() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        let mut tl = mk(1_000).with_on_complete(move |end| {
            assert_eq!(end, Vector3::new(-3.5, 0.3, 0.0));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let v = tl.advance(Timestamp::from_millis(9_000));
        assert_eq!(v, tl.end());
        assert_eq!(tl.state(), TimelineState::Completed);
        assert_eq!(tl.advance(Timestamp::from_millis(10_000)), tl.end());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_suppresses_completion() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        let mut tl = mk(1_000).with_on_complete(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mid = tl.advance(Timestamp::from_millis(1_500));
        tl.cancel();
        assert_eq!(tl.state(), TimelineState::Cancelled);
        assert_eq!(tl.advance(Timestamp::from_millis(5_000)), mid);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_after_completion_is_ignored() {
        let mut tl = mk(10);
        tl.advance(Timestamp::from_millis(2_000));
        tl.cancel();
        assert_eq!(tl.state(), TimelineState::Completed);
    }

    #[test]
    fn progress_does_not_regress_when_time_goes_back() {
        let mut tl = mk(1_000);
        tl.advance(Timestamp::from_millis(1_600));
        let p = tl.progress();
        tl.advance(Timestamp::from_millis(1_100));
        assert_eq!(tl.progress(), p);
    }
}
