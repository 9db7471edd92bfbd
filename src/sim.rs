use crate::config::{SimConfig, SIZE_RANGE, SPEED_RANGE};
use crate::model::{CelestialBody, OrbitState, TrailBuffer, Vec3};
use serde::Serialize;
use std::collections::BTreeMap;

pub(crate) const DEFAULT_Z_AMPLITUDE: f64 = 0.05;

const SPEED_STEP: f64 = 0.005;
const SPEED_START: f64 = 0.02;
const SIZE_STEP: f64 = 0.25;

// -------------------- Orbit sampling --------------------

/// Closed-form position sampler. `z_amplitude` is a cosmetic out-of-plane wobble.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Sampler {
    pub(crate) z_amplitude: f64,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            z_amplitude: DEFAULT_Z_AMPLITUDE,
        }
    }
}

impl Sampler {
    pub(crate) fn new(z_amplitude: f64) -> Self {
        Self { z_amplitude }
    }

    pub(crate) fn sample(
        &self,
        body: &CelestialBody,
        frame_index: f64,
        speed_override: Option<f64>,
    ) -> OrbitState {
        let speed = speed_override.unwrap_or(body.angular_speed);
        let phase = speed * frame_index;
        let (s, c) = phase.sin_cos();
        OrbitState {
            phase,
            position: Vec3::new(
                body.semi_major_axis * c,
                body.semi_minor_axis * s,
                self.z_amplitude * (2.0 * phase).sin(),
            ),
        }
    }
}

pub(crate) fn append_trail(mut buffer: TrailBuffer, position: Vec3, max_len: usize) -> TrailBuffer {
    buffer.push(position, max_len);
    buffer
}

// -------------------- Render-loop state --------------------

/// Simulation-wide knobs the user can change while running.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Knobs {
    pub(crate) speed: Option<f64>,
    pub(crate) show_trails: bool,
    pub(crate) size_multiplier: f64,
    pub(crate) max_trail_length: usize,
    pub(crate) frame_step: f64,
}

#[derive(Clone, Debug)]
struct BodyTrack {
    state: OrbitState,
    trail: TrailBuffer,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct BodyFrame {
    pub(crate) position: Vec3,
    pub(crate) phase: f64,
    pub(crate) display_size: f64,
    pub(crate) color: String,
    pub(crate) trail: Vec<Vec3>,
}

/// Everything the renderer needs for one frame, keyed by body name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct FrameSnapshot {
    pub(crate) frame_index: f64,
    pub(crate) bodies: BTreeMap<String, BodyFrame>,
}

/// Owns per-body orbit state and trails for one session.
pub(crate) struct Orrery {
    bodies: Vec<CelestialBody>,
    tracks: BTreeMap<String, BodyTrack>,
    sampler: Sampler,
    knobs: Knobs,
    initial_knobs: Knobs,
    frame: f64,
    last_sampled: f64,
}

impl Orrery {
    pub(crate) fn new(cfg: &SimConfig) -> Self {
        let cap = cfg.knobs.max_trail_length.min(4096);
        let sampler = Sampler::new(cfg.z_amplitude);
        let tracks = cfg
            .bodies
            .iter()
            .map(|b| {
                let track = BodyTrack {
                    state: sampler.sample(b, 0.0, cfg.knobs.speed),
                    trail: TrailBuffer::with_capacity(cap),
                };
                (b.name.clone(), track)
            })
            .collect();
        Self {
            bodies: cfg.bodies.clone(),
            tracks,
            sampler,
            knobs: cfg.knobs,
            initial_knobs: cfg.knobs,
            frame: 0.0,
            last_sampled: 0.0,
        }
    }

    pub(crate) fn bodies(&self) -> &[CelestialBody] {
        &self.bodies
    }
    pub(crate) fn knobs(&self) -> &Knobs {
        &self.knobs
    }
    pub(crate) fn frame(&self) -> f64 {
        self.frame
    }
    /// Frame index of the most recent sample, the one on screen.
    pub(crate) fn sampled_frame(&self) -> f64 {
        self.last_sampled
    }

    /// Samples every body at the current frame, records trails, then advances.
    pub(crate) fn step(&mut self) -> FrameSnapshot {
        let frame = self.frame;
        for b in &self.bodies {
            let state = self.sampler.sample(b, frame, self.knobs.speed);
            if let Some(track) = self.tracks.get_mut(&b.name) {
                track.state = state;
                let trail = std::mem::take(&mut track.trail);
                track.trail = append_trail(trail, state.position, self.knobs.max_trail_length);
            }
        }
        self.last_sampled = frame;
        self.frame += self.knobs.frame_step;
        self.snapshot()
    }

    pub(crate) fn snapshot(&self) -> FrameSnapshot {
        let bodies = self
            .bodies
            .iter()
            .filter_map(|b| {
                let track = self.tracks.get(&b.name)?;
                let trail = if self.knobs.show_trails { track.trail.to_vec() } else { Vec::new() };
                Some((
                    b.name.clone(),
                    BodyFrame {
                        position: track.state.position,
                        phase: track.state.phase,
                        display_size: b.display_size * self.knobs.size_multiplier,
                        color: b.color.clone(),
                        trail,
                    },
                ))
            })
            .collect();
        FrameSnapshot {
            frame_index: self.last_sampled,
            bodies,
        }
    }

    pub(crate) fn trail_len(&self, name: &str) -> Option<usize> {
        self.tracks.get(name).map(|t| t.trail.len())
    }

    pub(crate) fn toggle_trails(&mut self) {
        self.knobs.show_trails = !self.knobs.show_trails;
    }

    pub(crate) fn speed_up(&mut self) {
        self.knobs.speed = Some(match self.knobs.speed {
            None => SPEED_START,
            Some(s) => (s + SPEED_STEP).clamp(SPEED_RANGE.0, SPEED_RANGE.1),
        });
    }

    pub(crate) fn speed_down(&mut self) {
        self.knobs.speed = Some(match self.knobs.speed {
            None => SPEED_START,
            Some(s) => (s - SPEED_STEP).clamp(SPEED_RANGE.0, SPEED_RANGE.1),
        });
    }

    pub(crate) fn clear_speed_override(&mut self) {
        self.knobs.speed = None;
    }

    pub(crate) fn grow(&mut self) {
        self.knobs.size_multiplier = (self.knobs.size_multiplier + SIZE_STEP).clamp(SIZE_RANGE.0, SIZE_RANGE.1);
    }

    pub(crate) fn shrink(&mut self) {
        self.knobs.size_multiplier = (self.knobs.size_multiplier - SIZE_STEP).clamp(SIZE_RANGE.0, SIZE_RANGE.1);
    }

    /// Back to frame 0 with empty trails and the configured knobs.
    pub(crate) fn reset(&mut self) {
        self.knobs = self.initial_knobs;
        self.frame = 0.0;
        self.last_sampled = 0.0;
        for b in &self.bodies {
            if let Some(track) = self.tracks.get_mut(&b.name) {
                track.state = self.sampler.sample(b, 0.0, self.knobs.speed);
                track.trail.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::model::default_bodies;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn sample_position(body: &CelestialBody, frame: f64, speed_override: Option<f64>) -> Vec3 {
        Sampler::default().sample(body, frame, speed_override).position
    }

    fn earth() -> CelestialBody {
        CelestialBody::new("Earth", 1.0, 0.99, 120.0, 0.02, "blue")
    }

    fn config(max_trail_length: i64) -> SimConfig {
        Settings {
            max_trail_length,
            ..Settings::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn earth_starts_on_the_positive_x_axis() {
        let p = sample_position(&earth(), 0.0, None);
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn quarter_turn_lands_on_minor_axis() {
        let body = earth();
        let frame = (PI / 2.0) / body.angular_speed;
        let s = Sampler::default().sample(&body, frame, None);
        assert_abs_diff_eq!(s.phase, PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.position.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.position.y, 0.99, epsilon = 1e-12);
        assert_abs_diff_eq!(s.position.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn wobble_peaks_at_eighth_turn() {
        let body = earth();
        let frame = (PI / 4.0) / body.angular_speed;
        let p = Sampler::new(0.05).sample(&body, frame, None).position;
        assert_abs_diff_eq!(p.z, 0.05, epsilon = 1e-12);
        let flat = Sampler::new(0.0).sample(&body, frame, None).position;
        assert_eq!(flat.z, 0.0);
    }

    #[test]
    fn override_replaces_body_speed() {
        let body = earth();
        let a = Sampler::default().sample(&body, 10.0, Some(0.05));
        assert_abs_diff_eq!(a.phase, 0.5, epsilon = 1e-12);
        let b = Sampler::default().sample(&body, 10.0, None);
        assert_abs_diff_eq!(b.phase, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn append_trail_keeps_last_three() {
        let pts: Vec<Vec3> = (0..4).map(|i| Vec3::new(i as f64, 0.0, 0.0)).collect();
        let mut buf = TrailBuffer::default();
        for p in &pts {
            buf = append_trail(buf, *p, 3);
        }
        assert_eq!(buf.to_vec(), pts[1..].to_vec());
    }

    #[test]
    fn append_trail_with_zero_limit_is_empty() {
        let buf = append_trail(TrailBuffer::default(), Vec3::new(1.0, 1.0, 1.0), 0);
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn step_advances_by_frame_step_and_reports_sampled_frame() {
        let mut o = Orrery::new(&config(150));
        let first = o.step();
        assert_eq!(first.frame_index, 0.0);
        let second = o.step();
        assert_eq!(second.frame_index, 2.0);
        assert_eq!(o.frame(), 4.0);
        assert_eq!(o.sampled_frame(), 2.0);

        let earth = &second.bodies["Earth"];
        assert_eq!(earth.position, sample_position(&default_bodies()[2], 2.0, None));
        assert_eq!(earth.trail.len(), 2);
        assert_eq!(earth.trail.last(), Some(&earth.position));
    }

    #[test]
    fn trails_stay_bounded_per_body() {
        let mut o = Orrery::new(&config(5));
        for _ in 0..40 {
            o.step();
        }
        for b in default_bodies() {
            assert_eq!(o.trail_len(&b.name), Some(5));
        }
        let snap = o.snapshot();
        assert!(snap.bodies.values().all(|f| f.trail.len() == 5));
    }

    #[test]
    fn hidden_trails_are_recorded_but_not_emitted() {
        let mut o = Orrery::new(&config(10));
        o.toggle_trails();
        for _ in 0..3 {
            o.step();
        }
        assert!(o.snapshot().bodies.values().all(|f| f.trail.is_empty()));
        o.toggle_trails();
        assert!(o.snapshot().bodies.values().all(|f| f.trail.len() == 3));
    }

    #[test]
    fn size_multiplier_scales_display_size() {
        let mut o = Orrery::new(&config(10));
        o.grow();
        o.grow();
        let snap = o.snapshot();
        assert_abs_diff_eq!(snap.bodies["Jupiter"].display_size, 300.0, epsilon = 1e-9);
        for _ in 0..20 {
            o.grow();
        }
        assert_eq!(o.knobs().size_multiplier, SIZE_RANGE.1);
        for _ in 0..20 {
            o.shrink();
        }
        assert_eq!(o.knobs().size_multiplier, SIZE_RANGE.0);
    }

    #[test]
    fn speed_controls_stay_in_range() {
        let mut o = Orrery::new(&config(10));
        o.speed_up();
        assert_eq!(o.knobs().speed, Some(SPEED_START));
        for _ in 0..50 {
            o.speed_up();
        }
        assert_eq!(o.knobs().speed, Some(SPEED_RANGE.1));
        for _ in 0..50 {
            o.speed_down();
        }
        assert_eq!(o.knobs().speed, Some(SPEED_RANGE.0));
        o.clear_speed_override();
        assert_eq!(o.knobs().speed, None);
    }

    #[test]
    fn reset_clears_trails_and_rewinds() {
        let mut o = Orrery::new(&config(10));
        o.speed_up();
        for _ in 0..6 {
            o.step();
        }
        o.reset();
        assert_eq!(o.frame(), 0.0);
        assert_eq!(o.knobs().speed, None);
        assert_eq!(o.trail_len("Mars"), Some(0));
        let snap = o.snapshot();
        assert_abs_diff_eq!(snap.bodies["Mars"].position.x, 1.5, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_xy_projection_lies_on_ellipse(
            a in 0.1f64..10.0,
            b in 0.1f64..10.0,
            speed in 0.001f64..0.2,
            frame in 0.0f64..100_000.0,
        ) {
            let body = CelestialBody::new("X", a, b, 100.0, speed, "grey");
            let p = sample_position(&body, frame, None);
            let r = (p.x / a).powi(2) + (p.y / b).powi(2);
            prop_assert!((r - 1.0).abs() < 1e-9);
            prop_assert!(p.z.abs() <= DEFAULT_Z_AMPLITUDE + 1e-12);
        }

        #[test]
        fn prop_position_repeats_after_one_period(
            speed in 0.005f64..0.1,
            frame in 0.0f64..5_000.0,
        ) {
            let body = CelestialBody::new("X", 2.2, 2.15, 200.0, speed, "brown");
            let p0 = sample_position(&body, frame, None);
            let p1 = sample_position(&body, frame + 2.0 * PI / speed, None);
            prop_assert!((p0.x - p1.x).abs() < 1e-6);
            prop_assert!((p0.y - p1.y).abs() < 1e-6);
            prop_assert!((p0.z - p1.z).abs() < 1e-6);
        }

        #[test]
        fn prop_sampling_is_deterministic(frame in 0.0f64..1e6, speed in proptest::option::of(0.01f64..0.1)) {
            let body = earth();
            prop_assert_eq!(sample_position(&body, frame, speed), sample_position(&body, frame, speed));
        }

        #[test]
        fn prop_trail_holds_last_max_len_in_order(
            max_len in 0usize..20,
            n in 0usize..60,
        ) {
            let mut buf = TrailBuffer::default();
            for i in 0..n {
                buf = append_trail(buf, Vec3::new(i as f64, 0.0, 0.0), max_len);
                prop_assert!(buf.len() <= max_len);
            }
            let expected: Vec<f64> = (n.saturating_sub(max_len)..n).map(|i| i as f64).collect();
            let got: Vec<f64> = buf.iter().map(|p| p.x).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
