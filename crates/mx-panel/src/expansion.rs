//! Medicaid-expansion reference table.
//!
//! One row per (state, year): `expansion = 1` from the state's ACA adoption
//! year onward (never for non-adopters), `post = 1` for every state from the
//! policy year 2014 onward. `post` marks the overall post-2014 window and is
//! deliberately independent of each state's own adoption year.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::ops::RangeInclusive;
use std::path::Path;

use mx_core::{Error, Result, StateFips, StateYear};
use serde::{Deserialize, Serialize};

/// First year of the ACA policy window.
pub const POLICY_YEAR: i32 = 2014;

/// Years covered by the generated table.
pub const YEARS: RangeInclusive<i32> = 2010..=2023;

/// 50 states plus DC.
const STATE_FIPS: [u8; 51] = [
    1, 2, 4, 5, 6, 8, 9, 10, 11, 12, 13, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28,
    29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 44, 45, 46, 47, 48, 49, 50, 51, 53, 54,
    55, 56,
];

/// ACA Medicaid-expansion adoption year by state (KFF/CMS).
const ACA_ADOPTION: [(u8, i32); 28] = [
    // 2014
    (6, 2014),
    (21, 2014),
    (23, 2014),
    (24, 2014),
    (39, 2014),
    (42, 2014),
    (44, 2014),
    (51, 2014),
    (53, 2014),
    (54, 2014),
    // 2015
    (26, 2015),
    (38, 2015),
    (45, 2015),
    (49, 2015),
    // 2016
    (28, 2016),
    (37, 2016),
    (55, 2016),
    // 2017
    (12, 2017),
    (29, 2017),
    (30, 2017),
    (50, 2017),
    // 2018
    (17, 2018),
    (47, 2018),
    // 2019
    (41, 2019),
    (46, 2019),
    // 2020
    (31, 2020),
    (2, 2020),
    (20, 2020),
];

/// Adoption status of one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adoption {
    /// Expanded Medicaid effective this year.
    Adopted(i32),
    /// Never expanded.
    Never,
}

impl Adoption {
    /// `1` iff adopted and `year >= adoption year`.
    pub fn expansion_flag(self, year: i32) -> u8 {
        match self {
            Adoption::Adopted(y) if year >= y => 1,
            _ => 0,
        }
    }
}

/// One reference-table row. Field order is the CSV column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionRow {
    /// State code.
    pub statefip: StateFips,
    /// Year.
    pub year: i32,
    /// Treatment flag (0/1).
    pub expansion: u8,
    /// Post-2014 flag (0/1).
    pub post: u8,
}

impl ExpansionRow {
    /// Join key.
    pub fn key(&self) -> StateYear {
        StateYear::new(self.statefip, self.year)
    }
}

/// Static adoption mapping over a fixed state list and year range.
#[derive(Debug, Clone)]
pub struct ExpansionSchedule {
    states: Vec<(StateFips, Adoption)>,
    years: RangeInclusive<i32>,
    policy_year: i32,
}

impl ExpansionSchedule {
    /// Build a schedule. States keep the given order; duplicates are rejected.
    pub fn new(
        states: Vec<(StateFips, Adoption)>,
        years: RangeInclusive<i32>,
        policy_year: i32,
    ) -> Result<Self> {
        if states.is_empty() {
            return Err(Error::Validation("expansion schedule needs at least one state".into()));
        }
        if years.is_empty() {
            return Err(Error::Validation(format!(
                "empty year range {}..={}",
                years.start(),
                years.end()
            )));
        }
        let mut seen = HashSet::with_capacity(states.len());
        for (s, _) in &states {
            if !seen.insert(*s) {
                return Err(Error::Validation(format!("duplicate state {s} in schedule")));
            }
        }
        Ok(Self { states, years, policy_year })
    }

    /// The ACA schedule: 51 jurisdictions, 2010–2023, policy year 2014.
    pub fn aca() -> Result<Self> {
        let adopted: BTreeMap<u8, i32> = ACA_ADOPTION.iter().copied().collect();
        let states = STATE_FIPS
            .iter()
            .map(|&code| {
                let adoption = adopted.get(&code).map_or(Adoption::Never, |&y| Adoption::Adopted(y));
                Ok((StateFips::new(code)?, adoption))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(states, YEARS, POLICY_YEAR)
    }

    /// Adoption status for a state, if it is part of the schedule.
    pub fn adoption(&self, statefip: StateFips) -> Option<Adoption> {
        self.states.iter().find(|(s, _)| *s == statefip).map(|(_, a)| *a)
    }

    /// Number of states.
    pub fn n_states(&self) -> usize {
        self.states.len()
    }

    /// Year range.
    pub fn years(&self) -> RangeInclusive<i32> {
        self.years.clone()
    }

    /// All rows, state-major then by year.
    pub fn rows(&self) -> Vec<ExpansionRow> {
        let mut out = Vec::with_capacity(self.states.len() * self.years.clone().count());
        for &(statefip, adoption) in &self.states {
            for year in self.years.clone() {
                out.push(ExpansionRow {
                    statefip,
                    year,
                    expansion: adoption.expansion_flag(year),
                    post: u8::from(year >= self.policy_year),
                });
            }
        }
        out
    }
}

/// Write rows as CSV with header `statefip,year,expansion,post`.
pub fn write_expansion_csv<W: Write>(writer: W, rows: &[ExpansionRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// [`write_expansion_csv`] to a file path.
pub fn write_expansion_csv_path(path: &Path, rows: &[ExpansionRow]) -> Result<()> {
    write_expansion_csv(File::create(path)?, rows)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote expansion status table");
    Ok(())
}

/// Read and validate a reference table.
///
/// Requires the header row; state codes are canonicalized on the way in;
/// flags must be 0 or 1; duplicate (state, year) pairs are an error.
/// A non-monotone expansion flag is accepted but logged.
pub fn read_expansion_csv<R: Read>(reader: R) -> Result<Vec<ExpansionRow>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);
    require_columns(rdr.headers()?, &["statefip", "year", "expansion", "post"])?;
    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    for (i, result) in rdr.deserialize::<ExpansionRow>().enumerate() {
        let row = result?;
        let line = i + 2;
        if row.expansion > 1 || row.post > 1 {
            return Err(Error::Validation(format!(
                "expansion table line {line}: flags must be 0/1 (expansion={}, post={})",
                row.expansion, row.post
            )));
        }
        if !seen.insert(row.key()) {
            return Err(Error::Validation(format!(
                "expansion table line {line}: duplicate row for {}",
                row.key()
            )));
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(Error::Validation("expansion table has no data rows".into()));
    }
    warn_non_monotone(&rows);
    Ok(rows)
}

pub(crate) fn require_columns(headers: &csv::StringRecord, required: &[&str]) -> Result<()> {
    for name in required {
        if !headers.iter().any(|h| h == *name) {
            return Err(Error::Validation(format!(
                "missing column {name:?} (header: {})",
                headers.iter().collect::<Vec<_>>().join(",")
            )));
        }
    }
    Ok(())
}

/// [`read_expansion_csv`] from a file path.
pub fn read_expansion_csv_path(path: &Path) -> Result<Vec<ExpansionRow>> {
    let file = File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
    })?;
    let rows = read_expansion_csv(file)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "read expansion status table");
    Ok(rows)
}

fn warn_non_monotone(rows: &[ExpansionRow]) {
    let mut by_state: BTreeMap<StateFips, Vec<(i32, u8)>> = BTreeMap::new();
    for r in rows {
        by_state.entry(r.statefip).or_default().push((r.year, r.expansion));
    }
    for (statefip, mut flags) in by_state {
        flags.sort_unstable();
        if flags.windows(2).any(|w| w[1].1 < w[0].1) {
            tracing::warn!(%statefip, "expansion flag decreases over time");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fips(code: u8) -> StateFips {
        StateFips::new(code).unwrap()
    }

    #[test]
    fn test_aca_table_shape() {
        let schedule = ExpansionSchedule::aca().unwrap();
        assert_eq!(schedule.n_states(), 51);
        let rows = schedule.rows();
        assert_eq!(rows.len(), 51 * 14);
        assert_eq!(rows.len(), 714);

        let keys: HashSet<StateYear> = rows.iter().map(ExpansionRow::key).collect();
        assert_eq!(keys.len(), 714);

        assert_eq!(rows[0].statefip, fips(1));
        assert_eq!(rows[0].year, 2010);
        assert_eq!(rows[13].year, 2023);
        assert_eq!(rows[713].statefip, fips(56));
    }

    #[test]
    fn test_adoption_2017_state() {
        // Florida (12) in the 2017 group.
        let rows = ExpansionSchedule::aca().unwrap().rows();
        let fl: Vec<&ExpansionRow> = rows.iter().filter(|r| r.statefip == fips(12)).collect();
        assert_eq!(fl.len(), 14);
        for r in fl {
            let expected = u8::from(r.year >= 2017);
            assert_eq!(r.expansion, expected, "year {}", r.year);
        }
    }

    #[test]
    fn test_never_adopted_state() {
        // Texas (48).
        let schedule = ExpansionSchedule::aca().unwrap();
        assert_eq!(schedule.adoption(fips(48)), Some(Adoption::Never));
        let rows = schedule.rows();
        assert!(rows.iter().filter(|r| r.statefip == fips(48)).all(|r| r.expansion == 0));
    }

    #[test]
    fn test_post_flag_is_policy_window() {
        for r in ExpansionSchedule::aca().unwrap().rows() {
            assert_eq!(r.post, u8::from(r.year >= 2014), "{:?}", r);
        }
    }

    #[test]
    fn test_expansion_flag_monotone() {
        let rows = ExpansionSchedule::aca().unwrap().rows();
        for chunk in rows.chunks(14) {
            assert!(chunk.windows(2).all(|w| w[0].expansion <= w[1].expansion));
        }
    }

    #[test]
    fn test_custom_schedule_validation() {
        let dup = vec![(fips(1), Adoption::Never), (fips(1), Adoption::Adopted(2015))];
        assert!(ExpansionSchedule::new(dup, 2010..=2012, 2014).is_err());
        assert!(ExpansionSchedule::new(vec![], 2010..=2012, 2014).is_err());
        #[allow(clippy::reversed_empty_ranges)]
        let empty_years = 2012..=2010;
        assert!(ExpansionSchedule::new(vec![(fips(1), Adoption::Never)], empty_years, 2014).is_err());
    }

    #[test]
    fn test_csv_written_then_read() {
        let rows = ExpansionSchedule::aca().unwrap().rows();
        let mut buf = Vec::new();
        write_expansion_csv(&mut buf, &rows).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("statefip,year,expansion,post"));
        assert_eq!(lines.next(), Some("01,2010,0,0"));
        assert_eq!(text.lines().count(), 715);

        let back = read_expansion_csv(buf.as_slice()).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_read_canonicalizes_unpadded_codes() {
        let csv_text = "statefip,year,expansion,post\n6,2014,1,1\n 53 ,2013,0,0\n";
        let rows = read_expansion_csv(csv_text.as_bytes()).unwrap();
        assert_eq!(rows[0].statefip.to_string(), "06");
        assert_eq!(rows[1].statefip.to_string(), "53");
    }

    #[test]
    fn test_read_rejects_bad_tables() {
        let dup = "statefip,year,expansion,post\n06,2014,1,1\n6,2014,1,1\n";
        assert!(read_expansion_csv(dup.as_bytes()).is_err());

        let bad_flag = "statefip,year,expansion,post\n06,2014,2,1\n";
        assert!(read_expansion_csv(bad_flag.as_bytes()).is_err());

        let no_header = "06,2014,1,1\n";
        assert!(read_expansion_csv(no_header.as_bytes()).is_err());

        let missing_column = "statefip,year,expansion\n06,2014,1\n";
        assert!(read_expansion_csv(missing_column.as_bytes()).is_err());
    }
}
