//! Two-way fixed-effects Difference-in-Differences.
//!
//! Model:
//!
//! `y_st = α + β₁·expansion_st + β₂·post_t + δ·(expansion × post)_st + μ_s + λ_t + ε_st`
//!
//! with state (`μ_s`) and year (`λ_t`) fixed effects in treatment coding and
//! HC1 standard errors. `post` is a function of the year alone, so it is
//! absorbed by the year effects; with staggered adoption starting in the
//! policy year `expansion` and `expansion × post` coincide. Both dependencies
//! are reported as aliased columns; under [`RankPolicy::MinimumNorm`] the
//! identified effect `β₁ + δ` is split evenly between the two coincident
//! columns.
//!
//! # References
//!
//! - Angrist & Pischke, *Mostly Harmless Econometrics*, Ch. 5.

use std::fmt::Display;

use mx_core::{Error, Result};
use serde::Serialize;

use super::design::DesignBuilder;
use super::ols::{OlsFit, RankPolicy, TermEstimate, ols_hc1};
use super::{ENTITY_VAR, TIME_VAR};

/// Column name of the treatment indicator.
pub const TREAT_COL: &str = "expansion";
/// Column name of the policy-period indicator.
pub const POST_COL: &str = "post";
/// Column name of the DiD interaction.
pub const INTERACTION_COL: &str = "expansion:post";

/// Result of [`did_twfe`].
#[derive(Debug, Clone, Serialize)]
pub struct DidResult {
    /// The `expansion:post` coefficient with HC1 inference.
    pub term: TermEstimate,
    /// Full fit, including the fixed-effect coefficients.
    pub fit: OlsFit,
    /// Number of observations.
    pub n_obs: usize,
    /// Distinct entities (states).
    pub n_entities: usize,
    /// Distinct periods (years).
    pub n_periods: usize,
}

impl DidResult {
    /// `true` if the interaction column is a linear combination of earlier
    /// columns, i.e. its coefficient is not separately identified.
    pub fn interaction_aliased(&self) -> bool {
        self.fit.aliased.iter().any(|a| a == INTERACTION_COL)
    }
}

pub(crate) fn check_binary(name: &str, values: &[u8]) -> Result<()> {
    if let Some(v) = values.iter().find(|&&v| v > 1) {
        return Err(Error::Validation(format!("{name} must be 0 or 1, found {v}")));
    }
    Ok(())
}

pub(crate) fn check_lengths(n: usize, lens: &[(&str, usize)]) -> Result<()> {
    if n == 0 {
        return Err(Error::Validation("y must be non-empty".into()));
    }
    for (name, len) in lens {
        if *len != n {
            return Err(Error::Validation(format!("{name} has length {len}, expected {n}")));
        }
    }
    Ok(())
}

pub(crate) fn count_distinct<K: Ord>(values: &[K]) -> usize {
    values.iter().collect::<std::collections::BTreeSet<_>>().len()
}

/// TWFE DiD: `y ~ expansion * post + C(statefip) + C(year)`, HC1.
///
/// # Arguments
///
/// - `y`: outcome (uninsured rate), length n.
/// - `entity`: state label per row.
/// - `time`: year per row.
/// - `treat`: expansion flag (0/1).
/// - `post`: policy-period flag (0/1).
pub fn did_twfe<E>(
    y: &[f64],
    entity: &[E],
    time: &[i32],
    treat: &[u8],
    post: &[u8],
    policy: RankPolicy,
) -> Result<DidResult>
where
    E: Ord + Display,
{
    let n = y.len();
    check_lengths(
        n,
        &[("entity", entity.len()), ("time", time.len()), ("treat", treat.len()), ("post", post.len())],
    )?;
    check_binary(TREAT_COL, treat)?;
    check_binary(POST_COL, post)?;

    let mut b = DesignBuilder::new(n);
    b.intercept();
    b.categorical(ENTITY_VAR, entity)?;
    b.categorical(TIME_VAR, time)?;
    b.numeric(TREAT_COL, treat.iter().map(|&v| f64::from(v)).collect())?;
    b.numeric(POST_COL, post.iter().map(|&v| f64::from(v)).collect())?;
    b.interaction(TREAT_COL, POST_COL)?;
    let design = b.build()?;

    let fit = ols_hc1(&design, y, policy)?;
    let term = fit
        .term(INTERACTION_COL)
        .ok_or_else(|| Error::Computation(format!("{INTERACTION_COL} missing from fit")))?;

    let n_entities = count_distinct(entity);
    let n_periods = count_distinct(time);
    tracing::info!(
        n,
        n_entities,
        n_periods,
        coef = term.coef,
        se = term.std_error,
        p = term.p_value,
        "TWFE DiD fit"
    );

    Ok(DidResult { term, fit, n_obs: n, n_entities, n_periods })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Balanced staggered-adoption panel: (state, year, adoption year).
    pub(crate) struct Panel {
        pub y: Vec<f64>,
        pub state: Vec<String>,
        pub year: Vec<i32>,
        pub treat: Vec<u8>,
        pub post: Vec<u8>,
    }

    pub(crate) fn staggered_panel(effect: f64, noise: f64) -> Panel {
        let adoption: [(&str, Option<i32>); 6] = [
            ("01", Some(2014)),
            ("02", Some(2016)),
            ("04", None),
            ("05", Some(2015)),
            ("06", None),
            ("08", Some(2018)),
        ];
        let mut p =
            Panel { y: vec![], state: vec![], year: vec![], treat: vec![], post: vec![] };
        let mut seed = 7u64;
        for (si, (code, adopt)) in adoption.iter().enumerate() {
            for year in 2010..=2019 {
                let treated = adopt.is_some_and(|a| year >= a);
                seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                let u = ((seed >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
                let y = 0.15
                    + 0.01 * si as f64
                    + 0.004 * f64::from(year - 2010)
                    + if treated { effect } else { 0.0 }
                    + noise * u;
                p.y.push(y);
                p.state.push((*code).to_string());
                p.year.push(year);
                p.treat.push(u8::from(treated));
                p.post.push(u8::from(year >= 2014));
            }
        }
        p
    }

    #[test]
    fn test_noise_free_effect_is_split_across_aliased_columns() {
        let p = staggered_panel(-0.03, 0.0);
        let r = did_twfe(&p.y, &p.state, &p.year, &p.treat, &p.post, RankPolicy::MinimumNorm)
            .unwrap();

        assert_eq!(r.n_obs, 60);
        assert_eq!(r.n_entities, 6);
        assert_eq!(r.n_periods, 10);
        // Intercept + 5 state + 9 year + expansion, post, expansion:post.
        assert_eq!(r.fit.names.len(), 18);
        assert_eq!(r.fit.rank, 16);
        assert_eq!(r.fit.aliased, vec!["post".to_string(), "expansion:post".to_string()]);
        assert!(r.interaction_aliased());

        let b_treat = r.fit.term("expansion").unwrap().coef;
        assert_relative_eq!(b_treat + r.term.coef, -0.03, epsilon = 1e-9);
        assert_relative_eq!(r.term.coef, -0.015, epsilon = 1e-9);
        assert!(r.fit.rss < 1e-20);
    }

    #[test]
    fn test_noisy_fit_has_finite_inference() {
        let p = staggered_panel(-0.03, 0.002);
        let r = did_twfe(&p.y, &p.state, &p.year, &p.treat, &p.post, RankPolicy::MinimumNorm)
            .unwrap();
        assert!(r.term.std_error > 0.0);
        assert!(r.term.ci_lower < r.term.coef && r.term.coef < r.term.ci_upper);
        assert!((0.0..=1.0).contains(&r.term.p_value));
        assert_eq!(r.fit.df_resid, 60 - 16);
    }

    #[test]
    fn test_aliased_fit_matches_full_rank_reference() {
        let p = staggered_panel(-0.03, 0.002);
        let r = did_twfe(&p.y, &p.state, &p.year, &p.treat, &p.post, RankPolicy::MinimumNorm)
            .unwrap();

        // Dropping the aliased columns leaves the column space unchanged.
        let mut b = DesignBuilder::new(p.y.len());
        b.intercept();
        b.categorical(ENTITY_VAR, &p.state).unwrap();
        b.categorical(TIME_VAR, &p.year).unwrap();
        b.numeric(TREAT_COL, p.treat.iter().map(|&v| f64::from(v)).collect()).unwrap();
        let reference = ols_hc1(&b.build().unwrap(), &p.y, RankPolicy::Error).unwrap();

        assert_relative_eq!(r.fit.rss, reference.rss, max_relative = 1e-9);
        assert_relative_eq!(r.fit.r_squared, reference.r_squared, epsilon = 1e-10);
        assert_eq!(r.fit.df_resid, reference.df_resid);
        let b_ref = reference.term(TREAT_COL).unwrap().coef;
        let b_sum = r.fit.term(TREAT_COL).unwrap().coef + r.term.coef;
        assert_relative_eq!(b_sum, b_ref, epsilon = 1e-10);
    }

    #[test]
    fn test_strict_rank_policy_rejects_fit() {
        let p = staggered_panel(-0.03, 0.0);
        let err =
            did_twfe(&p.y, &p.state, &p.year, &p.treat, &p.post, RankPolicy::Error).unwrap_err();
        assert!(err.to_string().contains("expansion:post"), "{err}");
    }

    #[test]
    fn test_input_validation() {
        let s = ["01", "02"];
        assert!(did_twfe(&[0.1, 0.2], &s, &[2013, 2014], &[0, 2], &[0, 1], RankPolicy::MinimumNorm)
            .is_err());
        assert!(did_twfe(&[0.1], &s, &[2013, 2014], &[0, 1], &[0, 1], RankPolicy::MinimumNorm)
            .is_err());
        let empty: [&str; 0] = [];
        assert!(did_twfe(&[], &empty, &[], &[], &[], RankPolicy::MinimumNorm).is_err());
    }
}
