//! End-to-end cycling on 1D Poisson hierarchies.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use approx::assert_abs_diff_eq;
use common::{aggregation, gauss_seidel, norm, poisson, poisson_hierarchy};
use mlcycle::{CsrMatrix, Cycle, KError, Level, MultilevelSolver, SolveOptions, Smoother};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn random_rhs(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn assert_solves(a: &CsrMatrix<f64>, b: &[f64], x: &[f64], rtol: f64) {
    let r = a.residual(b, x);
    assert!(norm(&r) <= rtol * norm(b), "residual {} too large", norm(&r) / norm(b));
}

#[test]
fn two_level_aggregation_v_cycle() {
    let a = poisson(4);
    let p = aggregation(4);
    let ac = p.transpose().matmul(&a).unwrap().matmul(&p).unwrap();
    let levels = vec![Level::new(a).with_prolongation(p).with_smoother(gauss_seidel), Level::new(ac)];
    let ml = MultilevelSolver::new(levels, "pinv2").unwrap();

    let b = vec![1.0, 1.0, 1.0, 1.0];
    let opts = SolveOptions::default().with_tol(1e-8);
    let sol = ml.solve(&b, None, &opts).unwrap();
    assert!(sol.stats.converged);
    assert!(sol.stats.iterations > 0);
    // exact solution of tridiag(-1,2,-1) x = 1 is x_i = (i+1)(4-i)/2
    for (i, xi) in sol.x.iter().enumerate() {
        assert_abs_diff_eq!(*xi, ((i + 1) * (4 - i)) as f64 / 2.0, epsilon = 1e-6);
    }
}

fn two_level_poisson4() -> MultilevelSolver {
    let a = poisson(4);
    let p = aggregation(4);
    let ac = p.transpose().matmul(&a).unwrap().matmul(&p).unwrap();
    let levels = vec![Level::new(a).with_prolongation(p).with_smoother(gauss_seidel), Level::new(ac)];
    MultilevelSolver::new(levels, "pinv2").unwrap()
}

#[test]
fn recovers_ones_from_zero_guess() {
    let ml = two_level_poisson4();
    // A · (1, 1, 1, 1)
    let b = vec![1.0, 0.0, 0.0, 1.0];
    let opts = SolveOptions::default().with_maxiter(100).with_residuals(true);
    let sol = ml.solve(&b, Some(&[0.0; 4]), &opts).unwrap();
    assert!(sol.stats.converged);
    assert!(sol.stats.iterations <= 100);
    let residuals = sol.residuals.unwrap();
    assert!(sol.stats.final_residual / residuals[0] < 1e-5);
    for xi in &sol.x {
        assert_abs_diff_eq!(*xi, 1.0, epsilon = 1e-4);
    }
}

#[test]
fn warm_restart_does_not_worsen_residual() {
    let ml = two_level_poisson4();
    let b = vec![1.0, 0.0, 0.0, 1.0];
    let opts = SolveOptions::default().with_residuals(true);
    let first = ml.solve(&b, None, &opts).unwrap();
    assert!(first.stats.converged);

    let second = ml.solve(&b, Some(&first.x), &opts).unwrap();
    let history = second.residuals.unwrap();
    assert_eq!(history[0], first.stats.final_residual);
    for res in &history {
        assert!(*res <= history[0], "residual grew from {} to {res}", history[0]);
    }
}

#[test]
fn history_starts_at_residual_of_initial_guess() {
    let ml = two_level_poisson4();
    let b = vec![1.0, 0.0, 0.0, 1.0];
    let x0 = [0.5, -1.0, 2.0, 0.0];
    let expected = norm(&ml.levels()[0].a().residual(&b, &x0));
    assert!(expected > 0.0 && expected != norm(&b));

    let sol = ml.solve(&b, Some(&x0), &SolveOptions::default().with_residuals(true)).unwrap();
    let history = sol.residuals.unwrap();
    assert_abs_diff_eq!(history[0], expected, epsilon = 1e-12);
    assert!(sol.stats.converged);
    assert!(sol.stats.final_residual <= 1e-5 * history[0]);
}

#[test]
fn every_cycle_kind_converges_on_four_levels() {
    let ml = MultilevelSolver::new(poisson_hierarchy(31, 4, gauss_seidel), "splu").unwrap();
    assert_eq!(ml.levels().iter().map(Level::size).collect::<Vec<_>>(), vec![31, 15, 7, 3]);
    let a = ml.levels()[0].a().clone();
    let b = random_rhs(31, 7);

    let mut iterations = Vec::new();
    for cycle in [Cycle::V, Cycle::W, Cycle::F] {
        let opts = SolveOptions::default().with_tol(1e-8).with_cycle(cycle);
        let sol = ml.solve(&b, None, &opts).unwrap();
        assert!(sol.stats.converged, "{cycle}-cycle did not converge");
        assert_solves(&a, &b, &sol.x, 1e-8);
        iterations.push(sol.stats.iterations);
    }
    assert!(iterations[1] <= iterations[0], "W {} vs V {}", iterations[1], iterations[0]);
}

#[test]
fn residual_history() {
    let ml = MultilevelSolver::new(poisson_hierarchy(31, 3, gauss_seidel), "pinv2").unwrap();
    let b = random_rhs(31, 11);
    let opts = SolveOptions::default().with_tol(1e-10).with_residuals(true);
    let sol = ml.solve(&b, None, &opts).unwrap();
    let residuals = sol.residuals.unwrap();

    assert_eq!(residuals.len(), sol.stats.iterations + 1);
    assert_abs_diff_eq!(residuals[0], norm(&b), epsilon = 1e-12);
    assert_eq!(residuals[residuals.len() - 1], sol.stats.final_residual);
    for pair in residuals.windows(2) {
        assert!(pair[1] < pair[0]);
    }
    assert!(sol.stats.final_residual <= 1e-10 * residuals[0]);

    let without = ml.solve(&b, None, &SolveOptions::default()).unwrap();
    assert!(without.residuals.is_none());
}

#[test]
fn coarse_solve_counts_and_cycle_complexity() {
    let three = MultilevelSolver::new(poisson_hierarchy(15, 3, gauss_seidel), "lu").unwrap();
    let two = MultilevelSolver::new(poisson_hierarchy(15, 2, gauss_seidel), "lu").unwrap();
    let b = random_rhs(15, 3);

    for (cycle, expected) in [(Cycle::V, 1), (Cycle::W, 2), (Cycle::F, 2)] {
        let opts = SolveOptions::default().with_cycle(cycle).with_maxiter(1);
        let sol = three.solve(&b, None, &opts).unwrap();
        assert_eq!(sol.stats.iterations, 1);
        assert_eq!(sol.coarse_solves, expected, "{cycle}-cycle on 3 levels");
        assert_abs_diff_eq!(sol.cycle_complexity, three.cycle_complexity(cycle), epsilon = 1e-12);

        let sol = two.solve(&b, None, &opts).unwrap();
        assert_eq!(sol.coarse_solves, 1, "{cycle}-cycle on 2 levels");
    }

    // cycle complexity counts the first cycle only; coarse solves accumulate over all of them
    let opts = SolveOptions::default().with_cycle(Cycle::W).with_maxiter(3).with_tol(1e-300);
    let sol = three.solve(&b, None, &opts).unwrap();
    assert_eq!(sol.stats.iterations, 3);
    assert_eq!(sol.coarse_solves, 6);
    assert_abs_diff_eq!(sol.cycle_complexity, three.cycle_complexity(Cycle::W), epsilon = 1e-12);
    assert!(three.cycle_complexity(Cycle::W) > three.cycle_complexity(Cycle::V));
}

#[test]
fn single_level_is_a_direct_solve() {
    let a = poisson(9);
    let ml = MultilevelSolver::new(vec![Level::new(a.clone())], "lu").unwrap();
    assert_eq!(ml.cycle_complexity(Cycle::V), 0.0);
    let b = random_rhs(9, 5);
    let sol = ml.solve(&b, None, &SolveOptions::default().with_tol(1e-10)).unwrap();
    assert_eq!(sol.stats.iterations, 1);
    assert_eq!(sol.coarse_solves, 1);
    assert!(sol.stats.converged);
    assert_solves(&a, &b, &sol.x, 1e-10);
}

#[test]
fn zero_initial_residual_runs_no_cycles() {
    let ml = MultilevelSolver::new(poisson_hierarchy(15, 3, gauss_seidel), "pinv2").unwrap();
    let opts = SolveOptions::default().with_residuals(true);

    // x = 1 gives b = (1, 0, ..., 0, 1) exactly
    let exact = vec![1.0; 15];
    let mut b = vec![0.0; 15];
    b[0] = 1.0;
    b[14] = 1.0;
    let sol = ml.solve(&b, Some(&exact), &opts).unwrap();
    assert_eq!(sol.stats.iterations, 0);
    assert!(sol.stats.converged);
    assert_eq!(sol.x, exact);
    assert_eq!(sol.residuals.unwrap(), vec![0.0]);
    assert_eq!(sol.coarse_solves, 0);

    let sol = ml.solve(&[0.0; 15], None, &opts).unwrap();
    assert_eq!(sol.stats.iterations, 0);
    assert_eq!(sol.x, vec![0.0; 15]);
}

#[test]
fn maxiter_bounds_cycles_and_callback_sees_each() {
    let ml = MultilevelSolver::new(poisson_hierarchy(31, 3, gauss_seidel), "pinv2").unwrap();
    let b = random_rhs(31, 13);
    let opts = SolveOptions::default().with_tol(1e-300).with_maxiter(4);
    let mut seen = Vec::new();
    let sol = ml.solve_with_callback(&b, None, &opts, |x| seen.push(x.to_vec())).unwrap();
    assert_eq!(sol.stats.iterations, 4);
    assert!(!sol.stats.converged);
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[3], sol.x);

    let none = ml.solve(&b, None, &SolveOptions::default().with_maxiter(0)).unwrap();
    assert_eq!(none.stats.iterations, 0);
    assert_eq!(none.x, vec![0.0; 31]);
}

#[test]
fn hooks_run_once_per_solve() {
    let pre_calls = Arc::new(AtomicUsize::new(0));
    let post_calls = Arc::new(AtomicUsize::new(0));
    let (pre, post) = (pre_calls.clone(), post_calls.clone());
    let ml = MultilevelSolver::new(poisson_hierarchy(15, 3, gauss_seidel), "pinv2")
        .unwrap()
        .with_preprocess(move |x, b| {
            pre.fetch_add(1, Ordering::SeqCst);
            // solve for 2x instead
            (x, b.iter().map(|v| 2.0 * v).collect())
        })
        .with_postprocess(move |x| {
            post.fetch_add(1, Ordering::SeqCst);
            x.iter().map(|v| v / 2.0).collect()
        });

    let b = random_rhs(15, 17);
    let sol = ml.solve(&b, None, &SolveOptions::default().with_tol(1e-10)).unwrap();
    assert!(sol.stats.iterations > 1);
    assert_eq!(pre_calls.load(Ordering::SeqCst), 1);
    assert_eq!(post_calls.load(Ordering::SeqCst), 1);
    assert_solves(ml.levels()[0].a(), &b, &sol.x, 1e-9);
}

#[test]
fn hook_changing_length_is_rejected() {
    let ml = MultilevelSolver::new(poisson_hierarchy(15, 2, gauss_seidel), "pinv2")
        .unwrap()
        .with_postprocess(|mut x| {
            x.pop();
            x
        });
    let err = ml.solve(&[1.0; 15], None, &SolveOptions::default()).unwrap_err();
    assert!(matches!(err, KError::DimensionMismatch { expected: 15, found: 14, .. }));
}

struct Diverged;

impl Smoother for Diverged {
    fn smooth(&self, _a: &CsrMatrix<f64>, _x: &mut [f64], _b: &[f64]) -> Result<(), KError> {
        Err(KError::SolveError("smoother diverged".into()))
    }
}

#[test]
fn smoother_failure_propagates() {
    let mut levels = poisson_hierarchy(15, 3, gauss_seidel);
    let coarse = levels.pop().unwrap();
    let middle = levels.pop().unwrap();
    let middle = Level::new(middle.a().clone())
        .with_prolongation(middle.p().unwrap().clone())
        .with_postsmoother(Diverged);
    levels.push(middle);
    levels.push(coarse);

    let ml = MultilevelSolver::new(levels, "pinv2").unwrap();
    let err = ml.solve(&[1.0; 15], None, &SolveOptions::default()).unwrap_err();
    assert!(matches!(err, KError::SolveError(ref m) if m == "smoother diverged"));
}

#[test]
fn input_lengths_are_checked() {
    let ml = MultilevelSolver::new(poisson_hierarchy(15, 2, gauss_seidel), "pinv2").unwrap();
    let err = ml.solve(&[1.0; 14], None, &SolveOptions::default()).unwrap_err();
    assert!(matches!(err, KError::DimensionMismatch { expected: 15, found: 14, .. }));
    let err = ml.solve(&[1.0; 15], Some(&[0.0; 3]), &SolveOptions::default()).unwrap_err();
    assert!(matches!(err, KError::DimensionMismatch { expected: 15, found: 3, .. }));
}

#[test]
fn repeated_solves_are_identical() {
    let ml = MultilevelSolver::new(poisson_hierarchy(31, 4, gauss_seidel), "pinv2").unwrap();
    let b = random_rhs(31, 19);
    let opts = SolveOptions::default().with_cycle(Cycle::F).with_residuals(true);
    let first = ml.solve(&b, None, &opts).unwrap();
    assert!(ml.coarse_solver().is_factored());
    let second = ml.solve(&b, None, &opts).unwrap();
    assert_eq!(first.x, second.x);
    assert_eq!(first.residuals, second.residuals);
    assert_eq!(first.cycle_complexity, second.cycle_complexity);
    assert_eq!(first.coarse_solves, second.coarse_solves);
}

#[test]
fn cycle_names_are_parsed() {
    assert_eq!(SolveOptions::default().with_cycle_name("W").unwrap().cycle, Cycle::W);
    let err = SolveOptions::default().with_cycle_name("Z").unwrap_err();
    assert!(matches!(err, KError::UnknownCycle(ref s) if s == "Z"));
    assert!(err.is_configuration());
}

#[test]
fn krylov_coarse_solver_inside_cycle() {
    let ml = MultilevelSolver::new(poisson_hierarchy(31, 3, gauss_seidel), "cg").unwrap();
    let b = random_rhs(31, 23);
    let sol = ml.solve(&b, None, &SolveOptions::default().with_tol(1e-8)).unwrap();
    assert!(sol.stats.converged);
    assert_solves(ml.levels()[0].a(), &b, &sol.x, 1e-8);
    assert!(!ml.coarse_solver().is_factored());
}
