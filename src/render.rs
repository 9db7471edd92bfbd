use crate::model::{CelestialBody, Vec3, SUN_DISPLAY_SIZE};
use crate::sim::{FrameSnapshot, Knobs};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    collections::BTreeMap,
    f64::consts::PI,
    io::{self, Write},
};

pub(crate) const MIN_COLS: u16 = 60;
pub(crate) const MIN_ROWS: u16 = 20;

const HUD_W: u16 = 34;
/// Half-width of the visible region in orbit units.
const VIEW_RADIUS: f64 = 4.6;
/// Terminal cells are roughly twice as tall as wide.
const CELL_ASPECT: f64 = 2.0;

const BG: Color = Color::Black;
const FG: Color = Color::Rgb { r: 220, g: 220, b: 220 };
const DIM: Color = Color::Rgb { r: 120, g: 120, b: 120 };
const EDGE: Color = Color::Rgb { r: 80, g: 95, b: 120 };

// -------------------- Cells --------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Cell {
    fn blank() -> Self {
        Self { ch: ' ', fg: Color::Reset, bg: BG }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::blank(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    #[cfg(test)]
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self) {
        self.cells.fill(Cell::blank());
    }

    pub(crate) fn text(&mut self, x: u16, y: u16, s: &str, fg: Color) {
        for (i, ch) in s.chars().enumerate() {
            let xx = x.saturating_add(i as u16);
            if xx >= self.w || y >= self.h {
                break;
            }
            self.set(xx, y, Cell { ch, fg, bg: BG });
        }
    }

    fn boxed(&mut self, x0: u16, y0: u16, bw: u16, bh: u16, fg: Color) {
        if bw < 2 || bh < 2 {
            return;
        }
        let x1 = x0.saturating_add(bw - 1);
        let y1 = y0.saturating_add(bh - 1);
        for x in x0 + 1..x1 {
            self.set(x, y0, Cell { ch: '─', fg, bg: BG });
            self.set(x, y1, Cell { ch: '─', fg, bg: BG });
        }
        for y in y0 + 1..y1 {
            self.set(x0, y, Cell { ch: '│', fg, bg: BG });
            self.set(x1, y, Cell { ch: '│', fg, bg: BG });
        }
        self.set(x0, y0, Cell { ch: '┌', fg, bg: BG });
        self.set(x1, y0, Cell { ch: '┐', fg, bg: BG });
        self.set(x0, y1, Cell { ch: '└', fg, bg: BG });
        self.set(x1, y1, Cell { ch: '┘', fg, bg: BG });
    }
}

// -------------------- Terminal --------------------

pub(crate) struct Terminal {
    out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    /// Enters raw mode and the alternate screen. Dropping the value restores
    /// both, including on early return and unwinding.
    pub(crate) fn begin() -> anyhow::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut term = Self {
            out: io::stdout(),
            cols: MIN_COLS,
            rows: MIN_ROWS,
            prev: CellBuffer::new(MIN_COLS, MIN_ROWS),
            cur: CellBuffer::new(MIN_COLS, MIN_ROWS),
        };
        execute!(
            term.out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            Clear(ClearType::All)
        )?;
        term.resize_if_needed()?;
        Ok(term)
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        let (c, r) = (c.max(MIN_COLS), r.max(MIN_ROWS));
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        execute!(self.out, Clear(ClearType::All))?;
        tracing::debug!(cols = c, rows = r, "terminal resized");
        Ok(true)
    }

    /// Writes only the cells that changed since the last call.
    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;
        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }
                queue!(self.out, cursor::MoveTo(x, y))?;
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }
                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = queue_restore(&mut self.out);
        let _ = self.out.flush();
        let _ = terminal::disable_raw_mode();
    }
}

fn queue_restore<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(
        out,
        EndSynchronizedUpdate,
        ResetColor,
        Clear(ClearType::All),
        cursor::Show,
        EnableLineWrap,
        LeaveAlternateScreen
    )
}

// -------------------- Colors --------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

impl Rgb {
    const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
    fn to_color(self) -> Color {
        Color::Rgb { r: self.r, g: self.g, b: self.b }
    }
    fn scale(self, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let f = |c: u8| (c as f64 * t).round().clamp(0.0, 255.0) as u8;
        Rgb::new(f(self.r), f(self.g), f(self.b))
    }
}

const SUN_RGB: Rgb = Rgb::new(255, 220, 90);
const FALLBACK_RGB: Rgb = Rgb::new(170, 170, 170);

/// Named colors used by the default catalog, plus `#rrggbb`.
pub(crate) fn parse_color(name: &str) -> Option<Rgb> {
    let n = name.trim().to_ascii_lowercase();
    if let Some(hex) = n.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let v = u32::from_str_radix(hex, 16).ok()?;
        return Some(Rgb::new((v >> 16) as u8, (v >> 8) as u8, v as u8));
    }
    let rgb = match n.as_str() {
        "grey" | "gray" => Rgb::new(170, 170, 170),
        "orange" => Rgb::new(255, 165, 0),
        "blue" => Rgb::new(70, 120, 255),
        "red" => Rgb::new(230, 70, 60),
        "brown" => Rgb::new(165, 100, 60),
        "gold" => Rgb::new(255, 215, 0),
        "lightblue" => Rgb::new(150, 200, 240),
        "darkblue" => Rgb::new(40, 60, 190),
        "yellow" => SUN_RGB,
        "white" => Rgb::new(240, 240, 240),
        "green" => Rgb::new(80, 200, 100),
        "cyan" => Rgb::new(80, 210, 255),
        "purple" => Rgb::new(170, 90, 220),
        _ => return None,
    };
    Some(rgb)
}

/// Glyph for a scaled marker size (original sizes range 80..400).
pub(crate) fn marker_glyph(size: f64) -> char {
    if size < 60.0 {
        '·'
    } else if size < 110.0 {
        '•'
    } else if size < 170.0 {
        '●'
    } else {
        '◉'
    }
}

// -------------------- Camera --------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Projected {
    pub(crate) right: f64,
    pub(crate) up: f64,
    /// Larger is farther from the viewer.
    pub(crate) depth: f64,
}

/// Orbiting camera: azimuth about +z, then elevation above the orbital plane.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Camera {
    pub(crate) elevation_deg: f64,
    azimuth_offset_deg: f64,
    spin_deg_per_frame: f64,
    pub(crate) auto_spin: bool,
    initial: (f64, f64),
}

impl Camera {
    pub(crate) fn new(elevation_deg: f64, spin_deg_per_frame: f64) -> Self {
        Self {
            elevation_deg,
            azimuth_offset_deg: 0.0,
            spin_deg_per_frame,
            auto_spin: true,
            initial: (elevation_deg, spin_deg_per_frame),
        }
    }

    pub(crate) fn azimuth_deg(&self, frame: f64) -> f64 {
        let spin = if self.auto_spin { frame * self.spin_deg_per_frame } else { 0.0 };
        (self.azimuth_offset_deg + spin).rem_euclid(360.0)
    }

    pub(crate) fn tilt(&mut self, delta_deg: f64) {
        self.elevation_deg = (self.elevation_deg + delta_deg).clamp(-90.0, 90.0);
    }

    pub(crate) fn turn(&mut self, delta_deg: f64) {
        self.azimuth_offset_deg += delta_deg;
    }

    /// Freezes or resumes spinning without a jump in azimuth.
    pub(crate) fn toggle_spin(&mut self, frame: f64) {
        let spin = frame * self.spin_deg_per_frame;
        if self.auto_spin {
            self.azimuth_offset_deg += spin;
        } else {
            self.azimuth_offset_deg -= spin;
        }
        self.auto_spin = !self.auto_spin;
    }

    pub(crate) fn reset(&mut self) {
        *self = Camera::new(self.initial.0, self.initial.1);
    }

    pub(crate) fn project(&self, p: Vec3, frame: f64) -> Projected {
        let (sa, ca) = (self.azimuth_deg(frame) * PI / 180.0).sin_cos();
        let (se, ce) = (self.elevation_deg * PI / 180.0).sin_cos();
        let right = p.x * ca + p.y * sa;
        let fwd = -p.x * sa + p.y * ca;
        Projected {
            right,
            up: p.z * ce + fwd * se,
            depth: fwd * ce - p.z * se,
        }
    }
}

// -------------------- Scene --------------------

#[derive(Clone, Copy)]
struct Star {
    x: u16,
    y: u16,
    phase: f64,
    depth: f64,
}

fn build_stars(w: u16, h: u16, seed: u64) -> Vec<Star> {
    if w < 3 || h < 3 {
        return Vec::new();
    }
    let count = ((w as usize * h as usize) / 70).clamp(40, 240);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Star {
            x: rng.gen_range(1..w - 1),
            y: rng.gen_range(1..h - 1),
            phase: rng.gen_range(0.0..(PI * 2.0)),
            depth: rng.gen_range(0.35..1.0),
        })
        .collect()
}

#[derive(Clone, Copy, Debug)]
struct Viewport {
    w: u16,
    h: u16,
    cx: f64,
    cy: f64,
    scale: f64,
}

impl Viewport {
    fn new(w: u16, h: u16) -> Self {
        let sy = (h as f64 / 2.0 - 1.0) / VIEW_RADIUS;
        let sx = (w as f64 / 2.0 - 1.0) / (VIEW_RADIUS * CELL_ASPECT);
        Self {
            w,
            h,
            cx: w as f64 / 2.0,
            cy: h as f64 / 2.0,
            scale: sy.min(sx).max(0.1),
        }
    }

    fn to_cell(&self, p: Projected) -> Option<(u16, u16)> {
        let x = self.cx + p.right * self.scale * CELL_ASPECT;
        let y = self.cy - p.up * self.scale;
        if x >= 1.0 && y >= 1.0 && x < (self.w - 1) as f64 && y < (self.h - 1) as f64 {
            Some((x as u16, y as u16))
        } else {
            None
        }
    }
}

/// Status values shown in the side panel.
pub(crate) struct Hud<'a> {
    pub(crate) knobs: &'a Knobs,
    pub(crate) paused: bool,
    pub(crate) trail_fill: usize,
    pub(crate) fps: u32,
    pub(crate) clock: &'a str,
}

/// Long-lived drawing state: camera, palette and star backdrop.
pub(crate) struct SceneRenderer {
    pub(crate) camera: Camera,
    pub(crate) show_labels: bool,
    palette: BTreeMap<String, Rgb>,
    stars: Vec<Star>,
    stars_for: (u16, u16),
}

impl SceneRenderer {
    pub(crate) fn new(bodies: &[CelestialBody], camera: Camera) -> Self {
        let palette = bodies
            .iter()
            .map(|b| {
                let rgb = parse_color(&b.color).unwrap_or_else(|| {
                    tracing::warn!(body = %b.name, color = %b.color, "unknown color, using grey");
                    FALLBACK_RGB
                });
                (b.name.clone(), rgb)
            })
            .collect();
        Self {
            camera,
            show_labels: true,
            palette,
            stars: Vec::new(),
            stars_for: (0, 0),
        }
    }

    pub(crate) fn draw(&mut self, buf: &mut CellBuffer, snap: &FrameSnapshot, t_real: f64, hud: &Hud<'_>) {
        buf.clear();
        let hud_w = HUD_W.min(buf.w / 2);
        let main_w = buf.w.saturating_sub(hud_w);
        if (main_w, buf.h) != self.stars_for {
            let seed = 0x5A17_5A17u64 ^ ((main_w as u64) << 32) ^ (buf.h as u64);
            self.stars = build_stars(main_w, buf.h, seed);
            self.stars_for = (main_w, buf.h);
        }

        self.draw_orbits(buf, main_w, snap, hud.knobs.size_multiplier, t_real);
        draw_hud(buf, main_w, hud_w, snap, hud, &self.camera);
    }

    fn draw_orbits(
        &self,
        buf: &mut CellBuffer,
        main_w: u16,
        snap: &FrameSnapshot,
        size_multiplier: f64,
        t_real: f64,
    ) {
        if main_w < 4 || buf.h < 4 {
            return;
        }
        let vp = Viewport::new(main_w, buf.h);
        let frame = snap.frame_index;

        for s in &self.stars {
            let tw = (t_real * 0.65 + s.phase).sin() * 0.5 + 0.5;
            let b = 0.2 + 0.8 * tw * s.depth;
            let c = (40.0 + b * 140.0).clamp(0.0, 255.0) as u8;
            let ch = if b > 0.8 { '•' } else { '·' };
            let fg = Color::Rgb { r: c, g: c, b: c.saturating_add(25) };
            buf.set(s.x, s.y, Cell { ch, fg, bg: BG });
        }

        let sun = self.camera.project(Vec3::ZERO, frame);
        if let Some((x, y)) = vp.to_cell(sun) {
            buf.set(x, y, Cell { ch: '●', fg: SUN_RGB.to_color(), bg: BG });
            if SUN_DISPLAY_SIZE * size_multiplier >= 300.0 {
                let halo = Cell { ch: '·', fg: SUN_RGB.scale(0.6).to_color(), bg: BG };
                buf.set(x.saturating_sub(1), y, halo);
                buf.set(x + 1, y, halo);
            }
        }

        for (name, body) in &snap.bodies {
            let rgb = self.rgb(name);
            let n = body.trail.len().max(1) as f64;
            for (i, p) in body.trail.iter().enumerate() {
                let fade = 0.15 + (0.90 - 0.15) * (i as f64 / n);
                if let Some((x, y)) = vp.to_cell(self.camera.project(*p, frame)) {
                    buf.set(x, y, Cell { ch: '·', fg: rgb.scale(fade).to_color(), bg: BG });
                }
            }
        }

        // far bodies first so nearer ones overdraw them
        let mut order: Vec<(&String, Projected)> = snap
            .bodies
            .iter()
            .map(|(name, b)| (name, self.camera.project(b.position, frame)))
            .collect();
        order.sort_by(|a, b| b.1.depth.total_cmp(&a.1.depth));

        for (name, proj) in order {
            let Some((x, y)) = vp.to_cell(proj) else { continue };
            let body = &snap.bodies[name];
            let fg = self.rgb(name).to_color();
            buf.set(x, y, Cell { ch: marker_glyph(body.display_size), fg, bg: BG });
            if self.show_labels && x + 2 < main_w {
                let room = (main_w - x - 2) as usize;
                let label: String = name.chars().take(room.saturating_sub(1)).collect();
                buf.text(x + 2, y, &label, DIM);
            }
        }
    }

    fn rgb(&self, name: &str) -> Rgb {
        self.palette.get(name).copied().unwrap_or(FALLBACK_RGB)
    }
}

fn draw_hud(buf: &mut CellBuffer, main_w: u16, hud_w: u16, snap: &FrameSnapshot, hud: &Hud<'_>, cam: &Camera) {
    if hud_w < 8 {
        return;
    }
    for y in 0..buf.h {
        buf.set(main_w, y, Cell { ch: '│', fg: EDGE, bg: BG });
    }
    let top_h = 11u16.min(buf.h / 2);
    buf.boxed(main_w, 0, hud_w, top_h, EDGE);
    buf.boxed(main_w, top_h, hud_w, buf.h.saturating_sub(top_h), EDGE);

    let px = main_w + 2;
    let pw = hud_w.saturating_sub(4) as usize;
    let fit = |s: String| -> String { s.chars().take(pw).collect() };

    let k = hud.knobs;
    let speed = match k.speed {
        Some(s) => format!("Speed: {s:.3} rad/frame"),
        None => "Speed: per-body".to_string(),
    };
    let status = [
        format!("Frame: {:.0}", snap.frame_index),
        speed,
        format!(
            "Trails: {} {}/{}",
            if k.show_trails { "on" } else { "off" },
            hud.trail_fill,
            k.max_trail_length
        ),
        format!("Size: {:.2}x", k.size_multiplier),
        format!(
            "Camera: el {:.0}° az {:.0}°{}",
            cam.elevation_deg,
            cam.azimuth_deg(snap.frame_index),
            if cam.auto_spin { " ↻" } else { "" }
        ),
        format!("State: {}  {} fps", if hud.paused { "paused" } else { "running" }, hud.fps),
        format!("Clock: {}", hud.clock),
    ];
    buf.text(px, 1, "Solar System", FG);
    let mut y = 2u16;
    for line in status {
        if y + 1 >= top_h {
            break;
        }
        buf.text(px, y, &fit(line), DIM);
        y += 1;
    }

    let mut y = top_h + 1;
    let bottom = buf.h.saturating_sub(1);
    if y < bottom {
        buf.text(px, y, "Controls", FG);
        y += 1;
    }
    for line in [
        "Space/P pause  . step",
        "+/- speed  0 per-body",
        "]/[ size  T trails",
        "Arrows camera  C spin",
        "L labels  R reset",
        "Q quit",
    ] {
        if y >= bottom {
            break;
        }
        buf.text(px, y, &fit(line.to_string()), DIM);
        y += 1;
    }
}
