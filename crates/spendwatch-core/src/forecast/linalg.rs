//! Dense helpers for the penalised least-squares fit. Matrices are row-major.

/// Computes `XᵀX` and `Xᵀy` for an `n × width` design matrix.
pub(crate) fn normal_equations(design: &[f64], ys: &[f64], width: usize) -> (Vec<f64>, Vec<f64>) {
    let mut gram = vec![0.0; width * width];
    let mut xty = vec![0.0; width];
    for (row, &y) in design.chunks_exact(width).zip(ys) {
        for i in 0..width {
            xty[i] += row[i] * y;
            for j in 0..=i {
                gram[i * width + j] += row[i] * row[j];
            }
        }
    }
    for i in 0..width {
        for j in 0..i {
            gram[j * width + i] = gram[i * width + j];
        }
    }
    (gram, xty)
}

/// Solves `a x = b` for symmetric positive-definite `a` via Cholesky factorisation.
/// Returns `None` when a pivot is not strictly positive.
pub(crate) fn cholesky_solve(a: &[f64], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }
            if i == j {
                if !(sum > 0.0 && sum.is_finite()) {
                    return None;
                }
                l[i * n + i] = sum.sqrt();
            } else {
                l[i * n + j] = sum / l[j * n + j];
            }
        }
    }

    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i * n + k] * z[k];
        }
        z[i] = sum / l[i * n + i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in i + 1..n {
            sum -= l[k * n + i] * x[k];
        }
        x[i] = sum / l[i * n + i];
    }
    Some(x)
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
