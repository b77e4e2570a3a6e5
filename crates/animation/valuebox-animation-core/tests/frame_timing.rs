use std::time::Duration;

use nalgebra::Vector3;
use valuebox_animation_core::{
    clock::{Clock, ManualClock, Timestamp},
    easing::Easing,
    ids::IdAllocator,
    timeline::{Timeline, TimelineState},
};

/// Small deterministic generator for irregular frame gaps.
struct Lcg(u64);

impl Lcg {
    fn next_ms(&mut self, max: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % max
    }
}

fn interpolation_parameter(tl: &Timeline, v: Vector3<f32>) -> f32 {
    // Start and end differ on y only in these tests.
    (v.y - tl.start().y) / (tl.end().y - tl.start().y)
}

fn mk(ids: &mut IdAllocator, start_time: Timestamp, easing: Easing) -> Timeline {
    Timeline::new(
        ids.alloc_timeline(),
        Vector3::new(0.0, 5.0, 0.0),
        Vector3::new(0.0, 0.3, 0.0),
        start_time,
        Duration::from_millis(1_000),
        easing,
    )
    .unwrap()
}

#[test]
fn irregular_frames_never_overshoot_or_regress() {
    let mut ids = IdAllocator::new();
    for (seed, easing) in Easing::ALL.into_iter().enumerate() {
        let mut rng = Lcg(seed as u64 + 17);
        let mut clock = ManualClock::new(Timestamp::from_millis(500));
        let mut tl = mk(&mut ids, clock.now(), easing);
        let mut prev = 0.0f32;
        let mut frames = 0;
        while tl.state() == TimelineState::Running {
            // Gaps from 0ms (duplicate frame) up to 250ms (dropped frames).
            clock.advance(Duration::from_millis(rng.next_ms(250)));
            let v = tl.advance(clock.now());
            let s = interpolation_parameter(&tl, v);
            assert!((-1e-5..=1.0 + 1e-5).contains(&s), "{easing:?}: s={s}");
            assert!(s + 1e-5 >= prev, "{easing:?}: {s} < {prev}");
            prev = s;
            frames += 1;
            assert!(frames < 10_000, "timeline never completed");
        }
        assert_eq!(tl.current(), tl.end());
    }
}

#[test]
fn single_huge_gap_completes_in_one_frame() {
    let mut ids = IdAllocator::new();
    let mut tl = mk(&mut ids, Timestamp::ZERO, Easing::EaseInOutQuad);
    let v = tl.advance(Timestamp::from_millis(60_000));
    assert_eq!(v, tl.end());
    assert_eq!(tl.state(), TimelineState::Completed);
}

#[test]
fn advance_after_completion_always_returns_end() {
    let mut ids = IdAllocator::new();
    let mut tl = mk(&mut ids, Timestamp::ZERO, Easing::Linear);
    tl.advance(Timestamp::from_millis(1_000));
    for ms in [0, 10, 999, 1_000, 50_000] {
        assert_eq!(tl.advance(Timestamp::from_millis(ms)), tl.end());
    }
}
