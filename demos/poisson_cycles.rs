//! Solve a 1D Poisson problem with each cycle kind and print the hierarchy summary.
//!
//! Run with `RUST_LOG=debug` to see the per-cycle residuals.

use mlcycle::{CsrMatrix, Cycle, KError, Level, MultilevelSolver, SolveOptions};
use rand::Rng;

fn gauss_seidel(a: &CsrMatrix<f64>, x: &mut [f64], b: &[f64]) {
    for i in 0..a.nrows() {
        let mut diag = 1.0;
        let mut sum = b[i];
        for (j, v) in a.row(i) {
            if j == i {
                diag = v;
            } else {
                sum -= v * x[j];
            }
        }
        x[i] = sum / diag;
    }
}

fn main() -> Result<(), KError> {
    env_logger::init();

    let n = 511;
    let mut a = CsrMatrix::from_fn(n, n, |i, j| match i.abs_diff(j) {
        0 => 2.0,
        1 => -1.0,
        _ => 0.0,
    });
    let mut levels = Vec::new();
    while a.nrows() > 7 {
        let nf = a.nrows();
        let nc = (nf - 1) / 2;
        let p = CsrMatrix::from_fn(nf, nc, |i, j| match i as isize - 2 * j as isize - 1 {
            0 => 1.0,
            -1 | 1 => 0.5,
            _ => 0.0,
        });
        let ac = p.transpose().matmul(&a)?.matmul(&p)?;
        levels.push(Level::new(a).with_prolongation(p).with_smoother(gauss_seidel));
        a = ac;
    }
    levels.push(Level::new(a));

    let ml = MultilevelSolver::new(levels, "splu")?;
    println!("{ml}");

    let mut rng = rand::thread_rng();
    let b: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    for cycle in [Cycle::V, Cycle::W, Cycle::F] {
        let opts = SolveOptions::default().with_tol(1e-10).with_cycle(cycle).with_residuals(true);
        let sol = ml.solve(&b, None, &opts)?;
        let r0 = sol.residuals.as_ref().and_then(|r| r.first().copied()).unwrap_or(1.0);
        let factor = (sol.stats.final_residual / r0).powf(1.0 / sol.stats.iterations.max(1) as f64);
        println!(
            "{cycle}-cycle: {} cycles, converged = {}, convergence factor {:.3}, cycle complexity {:.3}, coarse solves {}",
            sol.stats.iterations, sol.stats.converged, factor, sol.cycle_complexity, sol.coarse_solves
        );
    }
    Ok(())
}
