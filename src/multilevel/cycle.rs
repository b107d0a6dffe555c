//! Recursive V/W/F-cycle.

use log::trace;

use crate::config::Cycle;
use crate::error::KError;
use crate::multilevel::coarse::CoarseSolver;
use crate::multilevel::level::Level;
use crate::solver::axpy;

/// Work accounting for one `solve` call.
///
/// Cycle complexity is only accumulated during the first cycle; every later cycle of
/// the same kind does identical work.
#[derive(Debug, Clone)]
pub struct CycleContext {
    ccx: usize,
    first_pass: bool,
    coarse_solves: usize,
}

impl Default for CycleContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleContext {
    pub fn new() -> Self {
        Self { ccx: 0, first_pass: true, coarse_solves: 0 }
    }

    /// Charge one sweep over level `l`'s matrix to the first cycle.
    pub fn record(&mut self, levels: &[Level], l: usize) {
        if self.first_pass {
            self.ccx += levels[l].nnz();
        }
    }

    /// Ends the first cycle; later `record` calls are ignored.
    pub fn finish_pass(&mut self) {
        self.first_pass = false;
    }

    pub fn is_first_pass(&self) -> bool {
        self.first_pass
    }

    pub(crate) fn count_coarse_solve(&mut self) {
        self.coarse_solves += 1;
    }

    /// Coarse solves performed so far, over all cycles.
    pub fn coarse_solves(&self) -> usize {
        self.coarse_solves
    }

    /// Work of one cycle in units of a finest-level mat-vec.
    pub fn cycle_complexity(&self, levels: &[Level]) -> f64 {
        match levels.first() {
            Some(finest) if finest.nnz() > 0 => self.ccx as f64 / finest.nnz() as f64,
            _ => 0.0,
        }
    }
}

/// One cycle at level `l`, improving `x` in place for `A_l x = b`.
///
/// `levels` must hold at least two levels from `l` on; the hierarchy controller
/// guarantees `p` and `r` exist on every level but the last.
pub(crate) fn run_cycle(
    levels: &[Level],
    coarse: &CoarseSolver,
    l: usize,
    x: &mut [f64],
    b: &[f64],
    cycle: Cycle,
    ctx: &mut CycleContext,
) -> Result<(), KError> {
    let level = &levels[l];
    let (p, r) = match (level.p.as_ref(), level.r.as_ref()) {
        (Some(p), Some(r)) => (p, r),
        (None, _) => return Err(KError::IncompleteLevel { level: l, what: "prolongation" }),
        (_, None) => return Err(KError::IncompleteLevel { level: l, what: "restriction" }),
    };
    trace!("{cycle}-cycle at level {l} (n = {})", level.size());

    level.presmooth(x, b)?;
    ctx.record(levels, l);

    let residual = level.a.residual(b, x);
    let mut coarse_b = vec![0.0; r.nrows()];
    r.spmv(&residual, &mut coarse_b);
    let mut coarse_x = vec![0.0; coarse_b.len()];

    if l + 2 == levels.len() {
        coarse_x = coarse.solve(&levels[l + 1].a, &coarse_b)?;
        ctx.record(levels, l);
        ctx.count_coarse_solve();
    } else {
        match cycle {
            Cycle::V => run_cycle(levels, coarse, l + 1, &mut coarse_x, &coarse_b, Cycle::V, ctx)?,
            Cycle::W => {
                run_cycle(levels, coarse, l + 1, &mut coarse_x, &coarse_b, Cycle::W, ctx)?;
                run_cycle(levels, coarse, l + 1, &mut coarse_x, &coarse_b, Cycle::W, ctx)?;
            }
            Cycle::F => {
                run_cycle(levels, coarse, l + 1, &mut coarse_x, &coarse_b, Cycle::F, ctx)?;
                run_cycle(levels, coarse, l + 1, &mut coarse_x, &coarse_b, Cycle::V, ctx)?;
            }
        }
    }

    let mut correction = vec![0.0; p.nrows()];
    p.spmv(&coarse_x, &mut correction);
    axpy(1.0, &correction, x);

    level.postsmooth(x, b)?;
    ctx.record(levels, l);
    Ok(())
}

/// Replays the recursion of one cycle without numerical work, charging the same
/// nonzero counts `run_cycle` would on a first pass.
pub(crate) fn dry_cycle(levels: &[Level], l: usize, cycle: Cycle, ctx: &mut CycleContext) {
    ctx.record(levels, l);
    if l + 2 == levels.len() {
        ctx.record(levels, l);
        ctx.count_coarse_solve();
    } else {
        match cycle {
            Cycle::V => dry_cycle(levels, l + 1, Cycle::V, ctx),
            Cycle::W => {
                dry_cycle(levels, l + 1, Cycle::W, ctx);
                dry_cycle(levels, l + 1, Cycle::W, ctx);
            }
            Cycle::F => {
                dry_cycle(levels, l + 1, Cycle::F, ctx);
                dry_cycle(levels, l + 1, Cycle::V, ctx);
            }
        }
    }
    ctx.record(levels, l);
}
