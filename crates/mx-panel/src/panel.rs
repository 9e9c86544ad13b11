//! State-year panel: aggregated rates left-joined with the expansion table.
//!
//! Missing values stay `None` all the way to disk (empty CSV fields), so an
//! unmatched cell can never be mistaken for an explicit `expansion = 0`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use mx_core::{Error, Result, StateFips, StateYear};
use serde::{Deserialize, Serialize};

use crate::aggregate::StateYearCell;
use crate::expansion::{ExpansionRow, require_columns};

/// One panel row. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRow {
    /// State code.
    pub statefip: StateFips,
    /// Year.
    pub year: i32,
    /// Weighted uninsured rate; `None` if the cell had zero weight.
    pub uninsured_rate: Option<f64>,
    /// Treatment flag; `None` if the cell had no reference row.
    pub expansion: Option<u8>,
    /// Post-2014 flag; `None` if the cell had no reference row.
    pub post: Option<u8>,
}

impl PanelRow {
    /// Join key.
    pub fn key(&self) -> StateYear {
        StateYear::new(self.statefip, self.year)
    }

    /// Outcome and both treatment fields present.
    pub fn is_complete(&self) -> bool {
        self.uninsured_rate.is_some() && self.expansion.is_some() && self.post.is_some()
    }
}

/// Result of [`merge_expansion`].
#[derive(Debug, Clone)]
pub struct MergedPanel {
    /// One row per input cell, in input order.
    pub rows: Vec<PanelRow>,
    /// Cells that found no reference row.
    pub unmatched: Vec<StateYear>,
}

/// Left join on (state, year).
///
/// Every cell produces exactly one row. The reference table must not contain
/// duplicate keys, otherwise a cell could match more than once.
pub fn merge_expansion(cells: &[StateYearCell], reference: &[ExpansionRow]) -> Result<MergedPanel> {
    let mut index: HashMap<StateYear, &ExpansionRow> = HashMap::with_capacity(reference.len());
    for row in reference {
        if index.insert(row.key(), row).is_some() {
            return Err(Error::Validation(format!(
                "expansion table has more than one row for {}",
                row.key()
            )));
        }
    }

    let mut rows = Vec::with_capacity(cells.len());
    let mut unmatched = Vec::new();
    for cell in cells {
        let matched = index.get(&cell.key);
        if matched.is_none() {
            unmatched.push(cell.key);
        }
        rows.push(PanelRow {
            statefip: cell.key.statefip,
            year: cell.key.year,
            uninsured_rate: cell.uninsured_rate,
            expansion: matched.map(|r| r.expansion),
            post: matched.map(|r| r.post),
        });
    }

    if !unmatched.is_empty() {
        let preview: Vec<String> = unmatched.iter().take(5).map(ToString::to_string).collect();
        tracing::warn!(
            unmatched = unmatched.len(),
            first = %preview.join(" "),
            "state-year cells without an expansion row; treatment fields left missing"
        );
    }
    tracing::info!(rows = rows.len(), "merged panel with expansion status");

    Ok(MergedPanel { rows, unmatched })
}

/// Write the panel with header `statefip,year,uninsured_rate,expansion,post`.
pub fn write_panel_csv<W: Write>(writer: W, rows: &[PanelRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// [`write_panel_csv`] to a file path.
pub fn write_panel_csv_path(path: &Path, rows: &[PanelRow]) -> Result<()> {
    write_panel_csv(File::create(path)?, rows)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote state-year panel");
    Ok(())
}

/// Read a panel written by [`write_panel_csv`] (or any CSV with those columns).
pub fn read_panel_csv<R: Read>(reader: R) -> Result<Vec<PanelRow>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);
    require_columns(rdr.headers()?, &["statefip", "year", "uninsured_rate", "expansion", "post"])?;
    let mut rows = Vec::new();
    for (i, result) in rdr.deserialize::<PanelRow>().enumerate() {
        let row = result?;
        if let Some(rate) = row.uninsured_rate
            && !(0.0..=1.0).contains(&rate)
        {
            return Err(Error::Validation(format!(
                "panel line {}: uninsured_rate {rate} outside [0, 1]",
                i + 2
            )));
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(Error::Validation("panel has no data rows".into()));
    }
    Ok(rows)
}

/// [`read_panel_csv`] from a file path.
pub fn read_panel_csv_path(path: &Path) -> Result<Vec<PanelRow>> {
    let file = File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
    })?;
    let rows = read_panel_csv(file)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "read state-year panel");
    Ok(rows)
}
