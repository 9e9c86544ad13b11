use std::collections::BTreeMap;

use mx_core::{Error, Result};
use mx_panel::PanelRow;
use serde::{Deserialize, Serialize};

use crate::ArtifactMeta;

/// Schema tag written into every pre-trends artifact.
pub const SCHEMA_VERSION: &str = "medexp_pretrends_v0";

/// One line on the pre-trends chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PretrendSeries {
    /// Expansion flag shared by the rows in this series.
    pub expansion: u8,
    /// Legend label.
    pub label: String,
    /// Years, ascending.
    pub years: Vec<i32>,
    /// Unweighted mean of state uninsured rates, aligned with `years`.
    pub mean_rate: Vec<f64>,
    /// States contributing to each mean, aligned with `years`.
    pub n_states: Vec<usize>,
}

/// Mean uninsured rate by year and expansion flag before the policy year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PretrendsArtifact {
    /// Schema tag.
    pub schema_version: String,
    /// Provenance.
    pub meta: ArtifactMeta,
    /// Rows with `year >= cutoff_year` are excluded.
    pub cutoff_year: i32,
    /// One series per observed expansion value, ascending.
    pub series: Vec<PretrendSeries>,
    /// Panel rows that entered a mean.
    pub rows_used: usize,
    /// Pre-period rows skipped for a missing rate or expansion flag.
    pub rows_skipped: usize,
}

/// Group pre-period panel rows by (expansion, year) and average the rates.
///
/// Rows with a missing rate or a missing expansion flag are skipped and
/// counted. Fails if no pre-period row is usable.
pub fn pretrends_artifact(rows: &[PanelRow], cutoff_year: i32) -> Result<PretrendsArtifact> {
    let mut groups: BTreeMap<u8, BTreeMap<i32, (f64, usize)>> = BTreeMap::new();
    let mut rows_used = 0usize;
    let mut rows_skipped = 0usize;

    for row in rows.iter().filter(|r| r.year < cutoff_year) {
        let (Some(rate), Some(expansion)) = (row.uninsured_rate, row.expansion) else {
            rows_skipped += 1;
            continue;
        };
        let slot = groups.entry(expansion).or_default().entry(row.year).or_insert((0.0, 0));
        slot.0 += rate;
        slot.1 += 1;
        rows_used += 1;
    }

    if rows_used == 0 {
        return Err(Error::Validation(format!(
            "no panel rows with a rate and expansion flag before {cutoff_year}"
        )));
    }

    let series = groups
        .into_iter()
        .map(|(expansion, by_year)| {
            let mut years = Vec::with_capacity(by_year.len());
            let mut mean_rate = Vec::with_capacity(by_year.len());
            let mut n_states = Vec::with_capacity(by_year.len());
            for (year, (sum, count)) in by_year {
                years.push(year);
                mean_rate.push(sum / count as f64);
                n_states.push(count);
            }
            PretrendSeries {
                expansion,
                label: format!("expansion = {expansion}"),
                years,
                mean_rate,
                n_states,
            }
        })
        .collect();

    Ok(PretrendsArtifact {
        schema_version: SCHEMA_VERSION.into(),
        meta: ArtifactMeta::default(),
        cutoff_year,
        series,
        rows_used,
        rows_skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mx_core::StateFips;

    fn row(state: u8, year: i32, rate: Option<f64>, expansion: Option<u8>) -> PanelRow {
        PanelRow {
            statefip: StateFips::new(state).unwrap(),
            year,
            uninsured_rate: rate,
            expansion,
            post: expansion.map(|_| u8::from(year >= 2014)),
        }
    }

    #[test]
    fn test_means_by_year_and_flag() {
        let rows = vec![
            row(1, 2012, Some(0.10), Some(0)),
            row(2, 2012, Some(0.20), Some(0)),
            row(1, 2013, Some(0.12), Some(0)),
            row(6, 2013, Some(0.30), Some(1)),
            row(6, 2014, Some(0.05), Some(1)),
        ];
        let art = pretrends_artifact(&rows, 2014).unwrap();
        assert_eq!(art.schema_version, SCHEMA_VERSION);
        assert_eq!(art.rows_used, 4);
        assert_eq!(art.rows_skipped, 0);
        assert_eq!(art.series.len(), 2);

        let s0 = &art.series[0];
        assert_eq!(s0.expansion, 0);
        assert_eq!(s0.label, "expansion = 0");
        assert_eq!(s0.years, vec![2012, 2013]);
        assert_relative_eq!(s0.mean_rate[0], 0.15, epsilon = 1e-12);
        assert_relative_eq!(s0.mean_rate[1], 0.12, epsilon = 1e-12);
        assert_eq!(s0.n_states, vec![2, 1]);

        let s1 = &art.series[1];
        assert_eq!(s1.years, vec![2013]);
        assert_relative_eq!(s1.mean_rate[0], 0.30, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let rows = vec![
            row(1, 2012, Some(0.10), Some(0)),
            row(2, 2012, None, Some(0)),
            row(72, 2012, Some(0.5), None),
        ];
        let art = pretrends_artifact(&rows, 2014).unwrap();
        assert_eq!(art.rows_used, 1);
        assert_eq!(art.rows_skipped, 2);
        assert_eq!(art.series.len(), 1);
        assert_relative_eq!(art.series[0].mean_rate[0], 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_no_pre_period_rows_is_an_error() {
        let rows = vec![row(1, 2015, Some(0.1), Some(1))];
        assert!(pretrends_artifact(&rows, 2014).is_err());
    }

    #[test]
    fn test_json_shape() {
        let rows = vec![row(1, 2012, Some(0.25), Some(0))];
        let art = pretrends_artifact(&rows, 2014).unwrap();
        let v = serde_json::to_value(&art).unwrap();
        assert_eq!(v["cutoff_year"], 2014);
        assert_eq!(v["series"][0]["years"][0], 2012);
        assert_eq!(v["meta"]["tool"], "medexp");
        let back: PretrendsArtifact = serde_json::from_value(v).unwrap();
        assert_eq!(back, art);
    }
}
