//! Mat-vec and inner products on dense and CSR storage.

use approx::assert_abs_diff_eq;
use faer::Mat;
use mlcycle::{CsrMatrix, InnerProduct, MatTransVec, MatVec};
use rand::Rng;

/// Random sparse pattern with roughly a third of the entries kept.
fn random_pair(nrows: usize, ncols: usize) -> (Mat<f64>, CsrMatrix<f64>) {
    let mut rng = rand::thread_rng();
    let vals: Vec<f64> =
        (0..nrows * ncols).map(|_| if rng.gen_bool(0.35) { rng.gen_range(-1.0..1.0) } else { 0.0 }).collect();
    let dense = Mat::from_fn(nrows, ncols, |i, j| vals[i * ncols + j]);
    let csr = CsrMatrix::from_fn(nrows, ncols, |i, j| vals[i * ncols + j]);
    (dense, csr)
}

#[test]
fn matvec_random_small() {
    let n = 5;
    let mut rng = rand::thread_rng();
    let vals: Vec<f64> = (0..n * n).map(|_| rng.r#gen()).collect();
    let a = Mat::from_fn(n, n, |i, j| vals[j * n + i]);
    let x: Vec<f64> = (0..n).map(|_| rng.r#gen()).collect();
    let mut y = vec![0.0; n];
    a.matvec(&x, &mut y);

    for i in 0..n {
        let expected = (0..n).map(|j| vals[j * n + i] * x[j]).sum::<f64>();
        assert_abs_diff_eq!(y[i], expected, epsilon = 1e-12);
    }
}

#[test]
fn dot_and_norm() {
    let x = vec![1.0, 2.0, 3.0];
    let y = vec![4.0, -5.0, 6.0];
    let ip = ();
    assert_abs_diff_eq!(ip.dot(&x, &y), 4.0 - 10.0 + 18.0, epsilon = 1e-12);
    assert_abs_diff_eq!(ip.norm(&x), 14.0_f64.sqrt(), epsilon = 1e-12);
}

#[test]
fn csr_agrees_with_dense() {
    let (dense, csr) = random_pair(7, 4);
    assert_eq!(csr.to_dense(), dense);

    let mut rng = rand::thread_rng();
    let x: Vec<f64> = (0..4).map(|_| rng.r#gen()).collect();
    let (mut yd, mut ys) = (vec![0.0; 7], vec![0.0; 7]);
    dense.matvec(&x, &mut yd);
    csr.matvec(&x, &mut ys);
    for (d, s) in yd.iter().zip(&ys) {
        assert_abs_diff_eq!(*d, *s, epsilon = 1e-12);
    }

    let w: Vec<f64> = (0..7).map(|_| rng.r#gen()).collect();
    let (mut td, mut ts) = (vec![0.0; 4], vec![0.0; 4]);
    dense.mattransvec(&w, &mut td);
    csr.mattransvec(&w, &mut ts);
    for (d, s) in td.iter().zip(&ts) {
        assert_abs_diff_eq!(*d, *s, epsilon = 1e-12);
    }
}

#[test]
fn galerkin_product_matches_dense() {
    let (ad, a) = random_pair(6, 6);
    let (pd, p) = random_pair(6, 3);
    let coarse = p.transpose().matmul(&a).unwrap().matmul(&p).unwrap();
    let pt = pd.transpose();
    let expected = &(&pt * &ad) * &pd;
    let got = coarse.to_dense();
    for i in 0..3 {
        for j in 0..3 {
            assert_abs_diff_eq!(got[(i, j)], expected[(i, j)], epsilon = 1e-12);
        }
    }
    assert!(p.matmul(&p).is_err());
}
