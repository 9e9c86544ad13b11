//! Fixed-width person-record decoder.
//!
//! The survey extract is a headerless text file with one person per line and
//! every variable at a fixed byte span. Only four spans matter here: survey
//! year, state FIPS code, person weight and the any-coverage flag.
//!
//! Reading is chunked: [`MicrodataReader::next_chunk`] refills a caller-owned
//! buffer with at most `max` records, so memory stays bounded no matter how
//! large the extract is.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use mx_core::{Error, Result, StateFips, StateYear};
use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` of one field within a record line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpan {
    /// First byte (0-based).
    pub start: usize,
    /// One past the last byte.
    pub end: usize,
}

impl ColumnSpan {
    /// Span constructor.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Width in bytes.
    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// Byte layout of the extract plus the two coding conventions needed to
/// interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedWidthLayout {
    /// Survey year (4 chars).
    pub year: ColumnSpan,
    /// State FIPS code (2 chars).
    pub statefip: ColumnSpan,
    /// Person weight, integer with two implied decimals (10 chars).
    pub perwt: ColumnSpan,
    /// Any health insurance coverage flag (1 char).
    pub hcovany: ColumnSpan,
    /// Divisor applied to the raw integer weight.
    pub weight_divisor: f64,
    /// `hcovany` value meaning "no coverage".
    pub uninsured_code: u32,
}

impl Default for FixedWidthLayout {
    fn default() -> Self {
        Self {
            year: ColumnSpan::new(0, 4),
            statefip: ColumnSpan::new(54, 56),
            perwt: ColumnSpan::new(73, 83),
            hcovany: ColumnSpan::new(83, 84),
            weight_divisor: 100.0,
            uninsured_code: 1,
        }
    }
}

/// One decoded person. Lives only until its chunk is folded into the sums.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonRecord {
    /// Survey year.
    pub year: i32,
    /// Canonical state code.
    pub statefip: StateFips,
    /// Person weight after scaling.
    pub weight: f64,
    /// `hcovany == uninsured_code`.
    pub uninsured: bool,
}

impl PersonRecord {
    /// Aggregation key.
    pub fn key(&self) -> StateYear {
        StateYear::new(self.statefip, self.year)
    }
}

impl FixedWidthLayout {
    /// Reject empty spans and non-positive weight divisors.
    pub fn validate(&self) -> Result<()> {
        for (name, span) in self.fields() {
            if span.end <= span.start {
                return Err(Error::Validation(format!(
                    "column span for {name} is empty: [{}, {})",
                    span.start, span.end
                )));
            }
        }
        if !(self.weight_divisor.is_finite() && self.weight_divisor > 0.0) {
            return Err(Error::Validation(format!(
                "weight_divisor must be positive, got {}",
                self.weight_divisor
            )));
        }
        Ok(())
    }

    fn fields(&self) -> [(&'static str, ColumnSpan); 4] {
        [
            ("year", self.year),
            ("statefip", self.statefip),
            ("perwt", self.perwt),
            ("hcovany", self.hcovany),
        ]
    }

    /// Decode one record line. `line_no` is 1-based and only used for messages.
    pub fn decode(&self, line: &str, line_no: u64) -> Result<PersonRecord> {
        let year_raw = field(line, self.year, "year", line_no)?;
        let year: i32 = year_raw.parse().map_err(|_| {
            Error::Parse(format!("line {line_no}: invalid year {year_raw:?}"))
        })?;

        let state_raw = field(line, self.statefip, "statefip", line_no)?;
        let statefip = StateFips::parse(state_raw)
            .map_err(|e| Error::Parse(format!("line {line_no}: {e}")))?;

        let weight_raw = field(line, self.perwt, "perwt", line_no)?;
        let weight_int: i64 = weight_raw.parse().map_err(|_| {
            Error::Parse(format!("line {line_no}: invalid perwt {weight_raw:?}"))
        })?;
        if weight_int < 0 {
            return Err(Error::Parse(format!("line {line_no}: negative perwt {weight_int}")));
        }
        let weight = weight_int as f64 / self.weight_divisor;

        let cov_raw = field(line, self.hcovany, "hcovany", line_no)?;
        let coverage: u32 = cov_raw.parse().map_err(|_| {
            Error::Parse(format!("line {line_no}: invalid hcovany {cov_raw:?}"))
        })?;

        Ok(PersonRecord { year, statefip, weight, uninsured: coverage == self.uninsured_code })
    }
}

fn field<'a>(line: &'a str, span: ColumnSpan, name: &str, line_no: u64) -> Result<&'a str> {
    let raw = line.get(span.start..span.end).ok_or_else(|| {
        Error::Parse(format!(
            "line {line_no}: record too short for {name} (needs {} bytes, has {})",
            span.end,
            line.len()
        ))
    })?;
    let trimmed = raw.trim_matches(' ');
    if trimmed.is_empty() {
        return Err(Error::Parse(format!("line {line_no}: missing {name}")));
    }
    Ok(trimmed)
}

/// Chunked reader over a fixed-width extract.
pub struct MicrodataReader<R> {
    inner: R,
    layout: FixedWidthLayout,
    line: String,
    line_no: u64,
    records_read: u64,
}

impl MicrodataReader<BufReader<File>> {
    /// Open an extract on disk.
    pub fn open(path: &Path, layout: FixedWidthLayout) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
        })?;
        Self::new(BufReader::with_capacity(1 << 20, file), layout)
    }
}

impl<R: BufRead> MicrodataReader<R> {
    /// Wrap any buffered source.
    pub fn new(inner: R, layout: FixedWidthLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self { inner, layout, line: String::with_capacity(128), line_no: 0, records_read: 0 })
    }

    /// Records decoded so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Layout in use.
    pub fn layout(&self) -> &FixedWidthLayout {
        &self.layout
    }

    /// Clear `out` and refill it with up to `max` records.
    ///
    /// Returns the number of records placed in `out`; `0` means end of input.
    /// Blank lines are skipped. Any malformed record aborts the read.
    pub fn next_chunk(&mut self, out: &mut Vec<PersonRecord>, max: usize) -> Result<usize> {
        if max == 0 {
            return Err(Error::Validation("chunk size must be >= 1".into()));
        }
        out.clear();
        while out.len() < max {
            self.line.clear();
            if self.inner.read_line(&mut self.line)? == 0 {
                break;
            }
            self.line_no += 1;
            let rec = self.line.trim_end_matches(['\n', '\r']);
            if rec.trim().is_empty() {
                continue;
            }
            out.push(self.layout.decode(rec, self.line_no)?);
        }
        self.records_read += out.len() as u64;
        Ok(out.len())
    }
}
