//! Lead/lag event study with state and year fixed effects.
//!
//! Event time is `year − base_year`. One indicator column is built for every
//! offset in the window, `D_m4 … D_m1, D_0, D_p1 … D_p9` by default, and no
//! offset is omitted as a reference period. Rows outside the window get all
//! zeros.
//!
//! Because the indicators are functions of the year alone, each one lies in
//! the span of the year fixed effects. The fit therefore reports every
//! indicator as aliased; under [`RankPolicy::MinimumNorm`] the estimates are
//! the minimum-norm split between indicator and year effect.

use mx_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::design::DesignBuilder;
use super::did::{check_lengths, count_distinct};
use super::ols::{OlsFit, RankPolicy, TermEstimate, ols_hc1};
use super::{ENTITY_VAR, TIME_VAR};

/// Relative-year window around the policy year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventWindow {
    /// Calendar year of event time 0.
    pub base_year: i32,
    /// Earliest offset (a lead, typically negative).
    pub min_offset: i32,
    /// Latest offset (a lag).
    pub max_offset: i32,
}

impl Default for EventWindow {
    fn default() -> Self {
        Self { base_year: 2014, min_offset: -4, max_offset: 9 }
    }
}

impl EventWindow {
    /// Validated window.
    pub fn new(base_year: i32, min_offset: i32, max_offset: i32) -> Result<Self> {
        let w = Self { base_year, min_offset, max_offset };
        w.validate()?;
        Ok(w)
    }

    /// `min_offset <= max_offset`.
    pub fn validate(&self) -> Result<()> {
        if self.min_offset > self.max_offset {
            return Err(Error::Validation(format!(
                "event window min_offset ({}) > max_offset ({})",
                self.min_offset, self.max_offset
            )));
        }
        Ok(())
    }

    /// Offsets in ascending order.
    pub fn offsets(&self) -> Vec<i32> {
        (self.min_offset..=self.max_offset).collect()
    }

    /// `D_m{k}` for leads, `D_0`, `D_p{k}` for lags.
    pub fn column_name(k: i32) -> String {
        match k {
            k if k < 0 => format!("D_m{}", k.unsigned_abs()),
            0 => "D_0".to_string(),
            k => format!("D_p{k}"),
        }
    }

    /// Column names aligned with [`offsets`](Self::offsets).
    pub fn column_names(&self) -> Vec<String> {
        self.offsets().into_iter().map(Self::column_name).collect()
    }

    /// `year − base_year`.
    pub fn event_time(&self, year: i32) -> i32 {
        year - self.base_year
    }

    /// One-hot indicator row for `year`; all zeros outside the window.
    pub fn indicators(&self, year: i32) -> Vec<u8> {
        let et = self.event_time(year);
        self.offsets().into_iter().map(|k| u8::from(k == et)).collect()
    }
}

/// Per-offset estimate.
#[derive(Debug, Clone, Serialize)]
pub struct EventEstimate {
    /// Event time.
    pub offset: i32,
    /// Coefficient with HC1 inference.
    pub estimate: TermEstimate,
    /// At least one row falls at this offset.
    pub observed: bool,
    /// Column lies in the span of earlier columns.
    pub aliased: bool,
}

/// Result of [`event_study_twfe`].
#[derive(Debug, Clone, Serialize)]
pub struct EventStudyResult {
    /// Window used.
    pub window: EventWindow,
    /// Offsets in ascending order.
    pub offsets: Vec<i32>,
    /// One estimate per offset.
    pub estimates: Vec<EventEstimate>,
    /// Full fit.
    pub fit: OlsFit,
    /// Distinct entities (states).
    pub n_entities: usize,
    /// Distinct periods (years).
    pub n_periods: usize,
}

impl EventStudyResult {
    /// Estimate for one offset.
    pub fn at(&self, offset: i32) -> Option<&EventEstimate> {
        self.estimates.iter().find(|e| e.offset == offset)
    }
}

/// Event study: `y ~ D_m4 + … + D_p9 + C(statefip) + C(year)`, HC1.
pub fn event_study_twfe<E>(
    y: &[f64],
    entity: &[E],
    time: &[i32],
    window: EventWindow,
    policy: RankPolicy,
) -> Result<EventStudyResult>
where
    E: Ord + Display,
{
    window.validate()?;
    let n = y.len();
    check_lengths(n, &[("entity", entity.len()), ("time", time.len())])?;

    let offsets = window.offsets();
    let names = window.column_names();
    let rows: Vec<Vec<u8>> = time.iter().map(|&t| window.indicators(t)).collect();

    let mut b = DesignBuilder::new(n);
    b.intercept();
    b.categorical(ENTITY_VAR, entity)?;
    b.categorical(TIME_VAR, time)?;
    let mut observed = Vec::with_capacity(offsets.len());
    for (j, name) in names.iter().enumerate() {
        let column: Vec<f64> = rows.iter().map(|r| f64::from(r[j])).collect();
        observed.push(column.iter().any(|&v| v != 0.0));
        b.numeric(name.as_str(), column)?;
    }
    let design = b.build()?;

    let unobserved: Vec<&str> =
        names.iter().zip(&observed).filter(|(_, o)| !**o).map(|(n, _)| n.as_str()).collect();
    if !unobserved.is_empty() {
        tracing::warn!(
            columns = %unobserved.join(", "),
            "event-time indicators with no observations; coefficients are not estimable"
        );
    }

    let fit = ols_hc1(&design, y, policy)?;

    let mut estimates = Vec::with_capacity(offsets.len());
    for ((&offset, name), &obs) in offsets.iter().zip(&names).zip(&observed) {
        let estimate = fit
            .term(name)
            .ok_or_else(|| Error::Computation(format!("{name} missing from fit")))?;
        let aliased = fit.aliased.iter().any(|a| a == name);
        estimates.push(EventEstimate { offset, estimate, observed: obs, aliased });
    }

    let n_entities = count_distinct(entity);
    let n_periods = count_distinct(time);
    tracing::info!(
        n,
        n_entities,
        n_periods,
        offsets = offsets.len(),
        rank = fit.rank,
        "event-study fit"
    );

    Ok(EventStudyResult { window, offsets, estimates, fit, n_entities, n_periods })
}
