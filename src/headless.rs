use crate::config::SimConfig;
use crate::sim::Orrery;
use anyhow::Context;
use std::io::Write;

/// Frames 0..628 in steps of 2, the length of the classic exported animation.
pub(crate) const DEFAULT_FRAMES: usize = 314;

/// Steps the simulation `frames` times, writing each snapshot as one JSON line.
pub(crate) fn export<W: Write>(cfg: &SimConfig, frames: usize, out: &mut W) -> anyhow::Result<()> {
    let mut orrery = Orrery::new(cfg);
    for _ in 0..frames {
        let snap = orrery.step();
        serde_json::to_writer(&mut *out, &snap)
            .with_context(|| format!("failed to encode frame {}", snap.frame_index))?;
        out.write_all(b"\n").context("failed to write frame")?;
    }
    out.flush().context("failed to flush output")?;
    tracing::info!(frames, bodies = orrery.bodies().len(), "headless export finished");
    Ok(())
}

pub(crate) fn run(cfg: &SimConfig, frames: usize) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    export(cfg, frames, &mut out)
}
