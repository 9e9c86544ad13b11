//! Ordinary least squares with HC1 robust standard errors.
//!
//! Coefficients are the minimum-norm least-squares solution
//! `β = (X'X)⁺ X' y`, with `(X'X)⁺` built from the eigendecomposition of the
//! symmetric normal matrix. For full-rank designs this is ordinary OLS.
//! For rank-deficient designs (fixed effects plus regressors that are
//! constant within a fixed-effect level) it picks the smallest-norm
//! coefficient vector among all least-squares solutions instead of failing.
//! [`RankPolicy`] decides whether that is acceptable.
//!
//! Covariance (White 1980, MacKinnon & White 1985):
//!
//! `V_HC1 = n / (n − r) · (X'X)⁺ X' diag(e²) X (X'X)⁺`
//!
//! where `r` is the numerical rank of `X`. Inference uses the normal
//! distribution (z statistics), two-sided.

use mx_core::{Error, Result};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use statrs::function::erf::erfc;

use super::design::Design;

/// 97.5 % quantile of the standard normal.
pub const Z_975: f64 = 1.959_963_984_540_054;

/// Eigenvalues of `X'X` below `EIG_RCOND · λ_max` are treated as zero.
const EIG_RCOND: f64 = 1e-12;

/// Relative tolerance for the Gram–Schmidt aliasing check.
const ALIAS_TOL: f64 = 1e-9;

/// What to do when the design matrix is rank deficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankPolicy {
    /// Keep every column, return the minimum-norm solution, warn and list
    /// the aliased columns.
    #[default]
    MinimumNorm,
    /// Rank deficiency is a computation error.
    Error,
}

/// Estimate for one named coefficient.
#[derive(Debug, Clone, Serialize)]
pub struct TermEstimate {
    /// Column name.
    pub name: String,
    /// Point estimate.
    pub coef: f64,
    /// HC1 standard error.
    pub std_error: f64,
    /// `coef / std_error`.
    pub z: f64,
    /// Two-sided normal p-value.
    pub p_value: f64,
    /// 95 % CI lower bound.
    pub ci_lower: f64,
    /// 95 % CI upper bound.
    pub ci_upper: f64,
}

/// Fitted OLS model.
#[derive(Debug, Clone, Serialize)]
pub struct OlsFit {
    /// Column names.
    pub names: Vec<String>,
    /// Coefficients, aligned with `names`.
    pub coefficients: Vec<f64>,
    /// HC1 standard errors.
    pub std_errors: Vec<f64>,
    /// z statistics.
    pub z_values: Vec<f64>,
    /// Two-sided p-values.
    pub p_values: Vec<f64>,
    /// 95 % CI lower bounds.
    pub ci_lower: Vec<f64>,
    /// 95 % CI upper bounds.
    pub ci_upper: Vec<f64>,
    /// Observations used.
    pub n_obs: usize,
    /// Numerical rank of the design.
    pub rank: usize,
    /// `n − rank`.
    pub df_resid: usize,
    /// Residual sum of squares.
    pub rss: f64,
    /// Centered R².
    pub r_squared: f64,
    /// Columns that are linear combinations of earlier columns.
    pub aliased: Vec<String>,
    /// Covariance estimator label.
    pub cov_type: String,
}

impl OlsFit {
    /// Full estimate for a named column.
    pub fn term(&self, name: &str) -> Option<TermEstimate> {
        let j = self.names.iter().position(|n| n == name)?;
        Some(TermEstimate {
            name: self.names[j].clone(),
            coef: self.coefficients[j],
            std_error: self.std_errors[j],
            z: self.z_values[j],
            p_value: self.p_values[j],
            ci_lower: self.ci_lower[j],
            ci_upper: self.ci_upper[j],
        })
    }

    /// `true` if at least one column is aliased.
    pub fn is_rank_deficient(&self) -> bool {
        self.rank < self.names.len()
    }
}

/// Two-sided standard-normal tail probability `P(|Z| > |z|)`.
pub fn normal_two_sided_p(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    erfc(z.abs() / std::f64::consts::SQRT_2)
}

/// Indices of columns that lie (numerically) in the span of earlier columns.
///
/// Modified Gram–Schmidt with one re-orthogonalization pass; all-zero columns
/// count as aliased.
pub fn aliased_columns(x: &DMatrix<f64>) -> Vec<usize> {
    let mut basis: Vec<DVector<f64>> = Vec::new();
    let mut aliased = Vec::new();
    for j in 0..x.ncols() {
        let col = x.column(j).into_owned();
        let norm0 = col.norm();
        if norm0 == 0.0 {
            aliased.push(j);
            continue;
        }
        let mut r = col;
        for _ in 0..2 {
            for q in &basis {
                let proj = q.dot(&r);
                r.axpy(-proj, q, 1.0);
            }
        }
        let norm = r.norm();
        if norm <= ALIAS_TOL * norm0 {
            aliased.push(j);
        } else {
            basis.push(r / norm);
        }
    }
    aliased
}

/// Fit `y = X β + ε` and compute HC1 standard errors.
pub fn ols_hc1(design: &Design, y: &[f64], policy: RankPolicy) -> Result<OlsFit> {
    let n = design.n_obs();
    let p = design.n_cols();
    if n == 0 || p == 0 {
        return Err(Error::Validation("design must be non-empty".into()));
    }
    if y.len() != n {
        return Err(Error::Validation(format!("y length ({}) != n ({})", y.len(), n)));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(Error::Validation("y must contain only finite values".into()));
    }

    let x = &design.x;
    let xt = x.transpose();
    let eig = (&xt * x).try_symmetric_eigen(f64::EPSILON, 0).ok_or_else(|| {
        Error::Computation("eigendecomposition of X'X did not converge".into())
    })?;
    let max_ev = eig.eigenvalues.iter().copied().fold(0.0_f64, f64::max);
    let tol = max_ev * EIG_RCOND;
    let rank = eig.eigenvalues.iter().filter(|&&l| l > tol).count();
    if rank == 0 {
        return Err(Error::Computation("design matrix has rank 0".into()));
    }

    let aliased: Vec<String> = if rank < p {
        aliased_columns(x).into_iter().map(|j| design.names[j].clone()).collect()
    } else {
        Vec::new()
    };
    if rank < p {
        match policy {
            RankPolicy::Error => {
                return Err(Error::Computation(format!(
                    "design matrix is rank deficient (rank {rank} < {p} columns); aliased: {}",
                    aliased.join(", ")
                )));
            }
            RankPolicy::MinimumNorm => {
                tracing::warn!(
                    rank,
                    columns = p,
                    aliased = %aliased.join(", "),
                    "design matrix is rank deficient; reporting minimum-norm estimates"
                );
            }
        }
    }

    if n <= rank {
        return Err(Error::Computation(format!(
            "no residual degrees of freedom (n = {n}, rank = {rank})"
        )));
    }
    let df_resid = n - rank;

    // (X'X)⁺ = V diag(1/λ) V' over the retained eigenvalues.
    let inv_ev = eig.eigenvalues.map(|l| if l > tol { 1.0 / l } else { 0.0 });
    let v = &eig.eigenvectors;
    let mut xtx_pinv = v * DMatrix::from_diagonal(&inv_ev) * v.transpose();
    // All-zero columns get exactly zero coefficient and variance.
    for j in (0..p).filter(|&j| x.column(j).iter().all(|&c| c == 0.0)) {
        xtx_pinv.row_mut(j).fill(0.0);
        xtx_pinv.column_mut(j).fill(0.0);
    }
    let pinv = xtx_pinv * xt;
    let y_vec = DVector::from_column_slice(y);
    let beta = &pinv * &y_vec;
    let resid = &y_vec - x * &beta;
    let rss = resid.norm_squared();

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };

    // HC0 sandwich (X'X)⁺X' diag(e²) X(X'X)⁺ = A A' with A = (X'X)⁺X' diag(e).
    let mut a = pinv;
    for (j, e) in resid.iter().enumerate() {
        a.column_mut(j).scale_mut(*e);
    }
    let scale = n as f64 / df_resid as f64;
    let cov = (&a * a.transpose()) * scale;

    let coefficients: Vec<f64> = beta.iter().copied().collect();
    let std_errors: Vec<f64> = (0..p).map(|j| cov[(j, j)].max(0.0).sqrt()).collect();
    let z_values: Vec<f64> = coefficients
        .iter()
        .zip(&std_errors)
        .map(|(b, s)| if *s > 0.0 { b / s } else { f64::NAN })
        .collect();
    let p_values = z_values.iter().map(|&z| normal_two_sided_p(z)).collect();
    let ci_lower = coefficients.iter().zip(&std_errors).map(|(b, s)| b - Z_975 * s).collect();
    let ci_upper = coefficients.iter().zip(&std_errors).map(|(b, s)| b + Z_975 * s).collect();

    tracing::debug!(n, p, rank, rss, r_squared, "OLS fit complete");

    Ok(OlsFit {
        names: design.names.clone(),
        coefficients,
        std_errors,
        z_values,
        p_values,
        ci_lower,
        ci_upper,
        n_obs: n,
        rank,
        df_resid,
        rss,
        r_squared,
        aliased,
        cov_type: "HC1".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::econometrics::design::DesignBuilder;
    use approx::assert_relative_eq;

    fn design(cols: &[(&str, Vec<f64>)], intercept: bool) -> Design {
        let n = cols.first().map(|c| c.1.len()).unwrap_or(0);
        let mut b = DesignBuilder::new(n);
        if intercept {
            b.intercept();
        }
        for (name, values) in cols {
            b.numeric(*name, values.clone()).unwrap();
        }
        b.build().unwrap()
    }

    #[test]
    fn test_intercept_only_hc1() {
        let y = [1.0, 2.0, 3.0, 4.0];
        let mut b = DesignBuilder::new(4);
        b.intercept();
        let fit = ols_hc1(&b.build().unwrap(), &y, RankPolicy::Error).unwrap();

        assert_relative_eq!(fit.coefficients[0], 2.5, epsilon = 1e-12);
        // HC0 = Σe²/n² = 5/16, HC1 = n/(n-1) · HC0.
        let expected_se = (4.0 / 3.0 * 5.0 / 16.0_f64).sqrt();
        assert_relative_eq!(fit.std_errors[0], expected_se, epsilon = 1e-12);
        assert_eq!(fit.rank, 1);
        assert_eq!(fit.df_resid, 3);
        assert!(fit.aliased.is_empty());
        assert_eq!(fit.cov_type, "HC1");
    }

    #[test]
    fn test_exact_line_recovers_coefficients() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 1.0 + 2.0 * v).collect();
        let fit = ols_hc1(&design(&[("x", x)], true), &y, RankPolicy::Error).unwrap();
        assert_relative_eq!(fit.coefficients[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients[1], 2.0, epsilon = 1e-10);
        assert!(fit.rss < 1e-18);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hc1_matches_sandwich_formula() {
        // Heteroskedastic toy data, full rank.
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = vec![1.1, 2.3, 2.8, 4.9, 4.2, 7.5];
        let d = design(&[("x", x.clone())], true);
        let fit = ols_hc1(&d, &y, RankPolicy::Error).unwrap();

        // Closed form for simple regression.
        let n = x.len() as f64;
        let xm = x.iter().sum::<f64>() / n;
        let ym = y.iter().sum::<f64>() / n;
        let sxx: f64 = x.iter().map(|v| (v - xm).powi(2)).sum();
        let sxy: f64 = x.iter().zip(&y).map(|(a, b)| (a - xm) * (b - ym)).sum();
        let slope = sxy / sxx;
        let icpt = ym - slope * xm;
        assert_relative_eq!(fit.coefficients[1], slope, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients[0], icpt, epsilon = 1e-10);

        // Slope HC0 variance: Σ (x_i - x̄)² e_i² / Sxx².
        let hc0: f64 = x
            .iter()
            .zip(&y)
            .map(|(a, b)| {
                let e = b - icpt - slope * a;
                (a - xm).powi(2) * e * e
            })
            .sum::<f64>()
            / (sxx * sxx);
        let hc1 = hc0 * n / (n - 2.0);
        assert_relative_eq!(fit.std_errors[1], hc1.sqrt(), epsilon = 1e-10);

        let t = fit.term("x").unwrap();
        assert_relative_eq!(t.ci_upper - t.coef, Z_975 * t.std_error, epsilon = 1e-12);
        assert!(t.p_value > 0.0 && t.p_value < 0.01);
    }

    #[test]
    fn test_rank_deficiency_policies() {
        // x2 = 2·x1 is aliased.
        let x1 = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let x2: Vec<f64> = x1.iter().map(|v| 2.0 * v).collect();
        let y = vec![0.9, 2.1, 2.9, 4.2, 5.0];
        let d = design(&[("x1", x1), ("x2", x2)], true);

        let err = ols_hc1(&d, &y, RankPolicy::Error).unwrap_err();
        assert!(err.to_string().contains("x2"), "{err}");

        let fit = ols_hc1(&d, &y, RankPolicy::MinimumNorm).unwrap();
        assert_eq!(fit.rank, 2);
        assert!(fit.is_rank_deficient());
        assert_eq!(fit.aliased, vec!["x2".to_string()]);
        // Minimum norm splits the slope b as b1 + 2 b2 with b2 = 2 b1.
        assert_relative_eq!(fit.coefficients[2], 2.0 * fit.coefficients[1], epsilon = 1e-9);
    }

    /// Two-way layout: 3 entities × 5 periods, `post` spanned by the period
    /// dummies, uneven outcome.
    fn twfe_layout(with_post: bool) -> (Design, Vec<f64>) {
        let mut entity = Vec::new();
        let mut period = Vec::new();
        let mut y = Vec::new();
        for e in 0..3u8 {
            for t in 0..5i32 {
                entity.push(e);
                period.push(t);
                let wobble = f64::from((i32::from(e) * 7 + t * 3) % 5) * 0.013;
                y.push(0.2 + 0.01 * f64::from(e) - 0.004 * f64::from(t) + wobble);
            }
        }
        let mut b = DesignBuilder::new(y.len());
        b.intercept();
        b.categorical("entity", &entity).unwrap();
        b.categorical("period", &period).unwrap();
        if with_post {
            b.numeric("post", period.iter().map(|&t| f64::from(u8::from(t >= 2))).collect())
                .unwrap();
        }
        (b.build().unwrap(), y)
    }

    #[test]
    fn test_rank_deficient_fit_is_least_squares() {
        let (d, y) = twfe_layout(true);
        let fit = ols_hc1(&d, &y, RankPolicy::MinimumNorm).unwrap();
        assert_eq!(fit.aliased, vec!["post".to_string()]);
        assert_eq!(fit.rank, 7);

        // Normal equations hold: X'r = 0.
        let beta = DVector::from_column_slice(&fit.coefficients);
        let r = DVector::from_column_slice(&y) - &d.x * beta;
        let xtr = d.x.transpose() * &r;
        assert!(xtr.amax() < 1e-12, "max |X'r| = {}", xtr.amax());
        assert_relative_eq!(r.norm_squared(), fit.rss, epsilon = 1e-15);

        // Same residuals as the full-rank design without the aliased column.
        let (d_ref, _) = twfe_layout(false);
        let reference = ols_hc1(&d_ref, &y, RankPolicy::Error).unwrap();
        assert_relative_eq!(fit.rss, reference.rss, max_relative = 1e-9);
        assert_relative_eq!(fit.r_squared, reference.r_squared, epsilon = 1e-12);
        assert_eq!(fit.df_resid, reference.df_resid);
    }

    #[test]
    fn test_zero_column_is_aliased() {
        let x = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 1.0, 1.0, 0.0, 2.0, 1.0, 0.0, 3.0]);
        assert_eq!(aliased_columns(&x), vec![1]);
    }

    #[test]
    fn test_validation_errors() {
        let mut b = DesignBuilder::new(2);
        b.intercept();
        let d = b.build().unwrap();
        assert!(ols_hc1(&d, &[1.0], RankPolicy::MinimumNorm).is_err());
        assert!(ols_hc1(&d, &[1.0, f64::INFINITY], RankPolicy::MinimumNorm).is_err());

        let mut b = DesignBuilder::new(1);
        b.intercept();
        assert!(ols_hc1(&b.build().unwrap(), &[1.0], RankPolicy::MinimumNorm).is_err());
    }

    #[test]
    fn test_normal_p_values() {
        assert_relative_eq!(normal_two_sided_p(0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(normal_two_sided_p(Z_975), 0.05, epsilon = 1e-9);
        assert_relative_eq!(normal_two_sided_p(-Z_975), 0.05, epsilon = 1e-9);
        assert!(normal_two_sided_p(f64::NAN).is_nan());
    }
}
