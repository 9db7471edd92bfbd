use crate::config::SimConfig;
use crate::input::{collect_input_nonblocking, map_key, Action};
use crate::render::{Camera, Hud, SceneRenderer, Terminal};
use crate::sim::Orrery;
use chrono::Local;
use std::time::{Duration, Instant};

const TILT_STEP_DEG: f64 = 5.0;
const TURN_STEP_DEG: f64 = 10.0;

pub(crate) struct App {
    orrery: Orrery,
    scene: SceneRenderer,
    fps: u32,
    paused: bool,
    step_once: bool,
    should_quit: bool,
}

impl App {
    pub(crate) fn new(cfg: &SimConfig) -> Self {
        let orrery = Orrery::new(cfg);
        let camera = Camera::new(cfg.camera.elevation_deg, cfg.camera.spin_deg_per_frame);
        let scene = SceneRenderer::new(orrery.bodies(), camera);
        Self {
            orrery,
            scene,
            fps: cfg.fps_cap,
            paused: false,
            step_once: false,
            should_quit: false,
        }
    }

    pub(crate) fn apply(&mut self, action: Action) {
        let frame = self.orrery.sampled_frame();
        tracing::debug!(?action, frame, "action");
        match action {
            Action::Quit => self.should_quit = true,
            Action::TogglePause => self.paused = !self.paused,
            Action::Step => {
                if self.paused {
                    self.step_once = true;
                }
            }
            Action::ToggleTrails => self.orrery.toggle_trails(),
            Action::ToggleLabels => self.scene.show_labels = !self.scene.show_labels,
            Action::SpeedUp => self.orrery.speed_up(),
            Action::SpeedDown => self.orrery.speed_down(),
            Action::PerBodySpeed => self.orrery.clear_speed_override(),
            Action::Grow => self.orrery.grow(),
            Action::Shrink => self.orrery.shrink(),
            Action::TiltUp => self.scene.camera.tilt(TILT_STEP_DEG),
            Action::TiltDown => self.scene.camera.tilt(-TILT_STEP_DEG),
            Action::TurnLeft => self.scene.camera.turn(-TURN_STEP_DEG),
            Action::TurnRight => self.scene.camera.turn(TURN_STEP_DEG),
            Action::ToggleSpin => self.scene.camera.toggle_spin(frame),
            Action::Reset => {
                self.orrery.reset();
                self.scene.camera.reset();
            }
        }
    }

    /// Advances one frame unless paused (a queued single step still runs).
    pub(crate) fn tick(&mut self) {
        if !self.paused || self.step_once {
            self.orrery.step();
            self.step_once = false;
        }
    }

    fn run(&mut self, term: &mut Terminal) -> anyhow::Result<()> {
        let frame_dt = Duration::from_secs_f64(1.0 / self.fps as f64);
        let start = Instant::now();

        while !self.should_quit {
            let frame_start = Instant::now();
            term.resize_if_needed()?;

            for k in collect_input_nonblocking(frame_dt)? {
                if let Some(action) = map_key(k) {
                    self.apply(action);
                }
            }
            if self.should_quit {
                break;
            }

            self.tick();

            let snap = self.orrery.snapshot();
            let clock = Local::now().format("%H:%M:%S").to_string();
            let trail_fill = self
                .orrery
                .bodies()
                .first()
                .and_then(|b| self.orrery.trail_len(&b.name))
                .unwrap_or(0);
            let hud = Hud {
                knobs: self.orrery.knobs(),
                paused: self.paused,
                trail_fill,
                fps: self.fps,
                clock: &clock,
            };
            self.scene
                .draw(&mut term.cur, &snap, start.elapsed().as_secs_f64(), &hud);
            term.present()?;

            spin_sleep(frame_dt, frame_start);
        }
        Ok(())
    }
}

pub(crate) fn run(cfg: &SimConfig) -> anyhow::Result<()> {
    let mut app = App::new(cfg);
    let mut term = Terminal::begin()?;
    tracing::info!(cols = term.cols, rows = term.rows, fps = cfg.fps_cap, "interactive session started");
    let res = app.run(&mut term);
    drop(term);
    tracing::info!(frame = app.orrery.frame(), ok = res.is_ok(), "interactive session ended");
    res
}

fn spin_sleep(target: Duration, since: Instant) {
    let end = since + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        if end - t > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
