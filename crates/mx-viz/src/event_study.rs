use mx_core::{Error, Result};
use mx_inference::EventStudyResult;
use serde::{Deserialize, Serialize};

use crate::ArtifactMeta;

/// Schema tag written into every event-study artifact.
pub const SCHEMA_VERSION: &str = "medexp_event_study_v0";

/// One coefficient on the event-study plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStudyPoint {
    /// Years relative to the base year.
    pub offset: i32,
    /// Regressor name (`D_m4`, `D_0`, ...).
    pub term: String,
    /// Point estimate.
    pub coef: f64,
    /// HC1 standard error.
    pub std_error: f64,
    /// 95 % CI lower bound.
    pub ci_lower: f64,
    /// 95 % CI upper bound.
    pub ci_upper: f64,
    /// Two-sided p-value; absent when the standard error is zero.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub p_value: Option<f64>,
    /// At least one panel row falls at this offset.
    pub observed: bool,
    /// Coefficient is not separately identified from the fixed effects.
    pub aliased: bool,
}

/// Dynamic-effects artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStudyArtifact {
    /// Schema tag.
    pub schema_version: String,
    /// Provenance.
    pub meta: ArtifactMeta,
    /// Calendar year of offset 0.
    pub base_year: i32,
    /// Points, ascending by offset.
    pub points: Vec<EventStudyPoint>,
    /// Offsets (same as `points[*].offset`).
    pub offsets: Vec<i32>,
    /// Coefficients aligned with `offsets`.
    pub coef: Vec<f64>,
    /// CI lower bounds aligned with `offsets`.
    pub ci_lower: Vec<f64>,
    /// CI upper bounds aligned with `offsets`.
    pub ci_upper: Vec<f64>,
    /// Observations in the fit.
    pub n_obs: usize,
    /// Panel rows left out of the fit for a missing outcome.
    #[serde(default)]
    pub rows_dropped: usize,
    /// Numerical rank of the design.
    pub rank: usize,
    /// All aliased columns of the fit, fixed effects included.
    pub aliased_terms: Vec<String>,
}

/// Build the artifact from a fitted event study. `rows_dropped` counts the
/// panel rows excluded before fitting.
pub fn event_study_artifact(
    result: &EventStudyResult,
    rows_dropped: usize,
) -> Result<EventStudyArtifact> {
    if result.estimates.is_empty() {
        return Err(Error::Validation("event study has no estimates".into()));
    }

    let mut points = Vec::with_capacity(result.estimates.len());
    for e in &result.estimates {
        let t = &e.estimate;
        if !(t.coef.is_finite() && t.ci_lower.is_finite() && t.ci_upper.is_finite()) {
            return Err(Error::Computation(format!("non-finite estimate for {}", t.name)));
        }
        points.push(EventStudyPoint {
            offset: e.offset,
            term: t.name.clone(),
            coef: t.coef,
            std_error: t.std_error,
            ci_lower: t.ci_lower,
            ci_upper: t.ci_upper,
            p_value: t.p_value.is_finite().then_some(t.p_value),
            observed: e.observed,
            aliased: e.aliased,
        });
    }

    Ok(EventStudyArtifact {
        schema_version: SCHEMA_VERSION.into(),
        meta: ArtifactMeta::default(),
        base_year: result.window.base_year,
        offsets: points.iter().map(|p| p.offset).collect(),
        coef: points.iter().map(|p| p.coef).collect(),
        ci_lower: points.iter().map(|p| p.ci_lower).collect(),
        ci_upper: points.iter().map(|p| p.ci_upper).collect(),
        points,
        n_obs: result.fit.n_obs,
        rows_dropped,
        rank: result.fit.rank,
        aliased_terms: result.fit.aliased.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mx_inference::{EventWindow, RankPolicy, event_study_twfe};

    fn fitted() -> EventStudyResult {
        let mut y = Vec::new();
        let mut state = Vec::new();
        let mut year = Vec::new();
        for (s, code) in ["01", "06", "48"].iter().enumerate() {
            for t in 2011..=2016 {
                let bump = if t >= 2014 && s == 1 { -0.02 } else { 0.0 };
                let wiggle = 0.001 * f64::from((t * 7 + s as i32 * 3) % 5);
                y.push(0.2 - 0.01 * s as f64 + bump + wiggle);
                state.push(*code);
                year.push(t);
            }
        }
        event_study_twfe(&y, &state, &year, EventWindow::default(), RankPolicy::MinimumNorm)
            .unwrap()
    }

    #[test]
    fn test_artifact_from_fit() {
        let r = fitted();
        let art = event_study_artifact(&r, 0).unwrap();
        assert_eq!(art.schema_version, SCHEMA_VERSION);
        assert_eq!(art.base_year, 2014);
        assert_eq!(art.points.len(), 14);
        assert_eq!(art.offsets.first(), Some(&-4));
        assert_eq!(art.offsets.last(), Some(&9));
        assert_eq!(art.points[4].term, "D_0");
        assert_eq!(art.n_obs, 18);
        assert_eq!(art.rows_dropped, 0);

        // 2011..=2016 covers offsets -3..=2.
        let observed: Vec<i32> =
            art.points.iter().filter(|p| p.observed).map(|p| p.offset).collect();
        assert_eq!(observed, vec![-3, -2, -1, 0, 1, 2]);
        assert!(art.points.iter().all(|p| p.aliased));
        for p in &art.points {
            assert!(p.ci_lower <= p.coef && p.coef <= p.ci_upper);
        }
    }

    #[test]
    fn test_json_round_trip_without_nan() {
        let art = event_study_artifact(&fitted(), 3).unwrap();
        let json = serde_json::to_string(&art).unwrap();
        assert!(!json.contains("NaN"));
        let back: EventStudyArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back.points.len(), art.points.len());
        assert_eq!(back.aliased_terms, art.aliased_terms);
        assert_eq!(back.rows_dropped, 3);
    }

    #[test]
    fn test_rows_dropped_defaults_when_absent() {
        let art = event_study_artifact(&fitted(), 2).unwrap();
        let mut value = serde_json::to_value(&art).unwrap();
        let removed = value.as_object_mut().unwrap().remove("rows_dropped");
        assert_eq!(removed, Some(serde_json::json!(2)));
        let back: EventStudyArtifact = serde_json::from_value(value).unwrap();
        assert_eq!(back.rows_dropped, 0);
    }
}
