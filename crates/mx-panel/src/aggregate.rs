//! Streaming weighted aggregation to state-year uninsured rates.
//!
//! Each (state, year) group keeps two running sums, `Σ w·u` and `Σ w`, where
//! `u` is the 0/1 uninsured indicator. Chunks are folded into a
//! [`PartialSums`], partial sums merge by addition, and the division happens
//! once in [`PartialSums::finalize`]. Because only sums are carried, the result
//! does not depend on how the input was chunked (up to floating-point
//! reassociation).

use std::collections::BTreeMap;
use std::io::BufRead;

use mx_core::{Error, Result, StateYear};

use crate::microdata::{MicrodataReader, PersonRecord};

/// Running sums for one (state, year) group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedSums {
    /// `Σ weight · uninsured`
    pub weighted_uninsured: f64,
    /// `Σ weight`
    pub weight_total: f64,
    /// Number of person records folded in.
    pub records: u64,
}

impl WeightedSums {
    #[inline]
    fn add(&mut self, weight: f64, uninsured: bool) {
        if uninsured {
            self.weighted_uninsured += weight;
        }
        self.weight_total += weight;
        self.records += 1;
    }

    /// Combine two partial sums for the same group.
    pub fn merge(&mut self, other: &WeightedSums) {
        self.weighted_uninsured += other.weighted_uninsured;
        self.weight_total += other.weight_total;
        self.records += other.records;
    }

    /// Weighted uninsured rate, or `None` when the group carries no weight.
    pub fn rate(&self) -> Option<f64> {
        (self.weight_total > 0.0).then(|| self.weighted_uninsured / self.weight_total)
    }
}

/// Per-group sums over some subset of the input.
#[derive(Debug, Clone, Default)]
pub struct PartialSums {
    groups: BTreeMap<StateYear, WeightedSums>,
}

impl PartialSums {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sums over a single batch.
    pub fn from_records(records: &[PersonRecord]) -> Self {
        let mut sums = Self::new();
        sums.fold(records);
        sums
    }

    /// Fold a chunk of records into the running sums.
    pub fn fold(&mut self, records: &[PersonRecord]) {
        for r in records {
            self.groups.entry(r.key()).or_default().add(r.weight, r.uninsured);
        }
    }

    /// Merge another accumulator (e.g. one chunk's sums) into this one.
    pub fn merge(&mut self, other: PartialSums) {
        for (key, sums) in other.groups {
            self.groups.entry(key).or_default().merge(&sums);
        }
    }

    /// Number of groups seen so far.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// `true` if no record has been folded in.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sums for one group.
    pub fn get(&self, key: &StateYear) -> Option<&WeightedSums> {
        self.groups.get(key)
    }

    /// Divide once per group. Zero-weight groups get an undefined rate and are
    /// listed in [`Aggregation::undefined`].
    pub fn finalize(self) -> Aggregation {
        let mut cells = Vec::with_capacity(self.groups.len());
        let mut undefined = Vec::new();
        let mut records_read = 0u64;
        for (key, sums) in self.groups {
            let uninsured_rate = sums.rate();
            if uninsured_rate.is_none() {
                tracing::warn!(
                    statefip = %key.statefip,
                    year = key.year,
                    records = sums.records,
                    "state-year group has zero total weight; uninsured rate undefined"
                );
                undefined.push(key);
            }
            records_read += sums.records;
            cells.push(StateYearCell {
                key,
                uninsured_rate,
                weight_total: sums.weight_total,
                records: sums.records,
            });
        }
        Aggregation { cells, undefined, records_read, chunks: 0 }
    }
}

/// Weighted uninsured rate for one (state, year).
#[derive(Debug, Clone, PartialEq)]
pub struct StateYearCell {
    /// Group key.
    pub key: StateYear,
    /// `Σ w·u / Σ w`; `None` when `Σ w == 0`.
    pub uninsured_rate: Option<f64>,
    /// `Σ w`
    pub weight_total: f64,
    /// Records in the group.
    pub records: u64,
}

/// Output of a full aggregation pass.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// One cell per observed group, sorted by (state, year).
    pub cells: Vec<StateYearCell>,
    /// Groups whose rate is undefined.
    pub undefined: Vec<StateYear>,
    /// Person records consumed.
    pub records_read: u64,
    /// Chunks processed (0 when built directly from [`PartialSums`]).
    pub chunks: usize,
}

/// Stream an extract chunk by chunk into state-year rates.
///
/// Holds at most `chunk_size` decoded records at a time; each chunk is folded
/// into its own [`PartialSums`] and merged into the running total before the
/// buffer is reused.
pub fn aggregate_microdata<R: BufRead>(
    reader: &mut MicrodataReader<R>,
    chunk_size: usize,
) -> Result<Aggregation> {
    if chunk_size == 0 {
        return Err(Error::Validation("chunk_size must be >= 1".into()));
    }

    let mut total = PartialSums::new();
    let mut buf: Vec<PersonRecord> = Vec::with_capacity(chunk_size.min(1 << 20));
    let mut chunks = 0usize;

    while reader.next_chunk(&mut buf, chunk_size)? > 0 {
        chunks += 1;
        total.merge(PartialSums::from_records(&buf));
        tracing::info!(
            chunk = chunks,
            rows = buf.len(),
            total_rows = reader.records_read(),
            groups = total.len(),
            "folded microdata chunk"
        );
    }
    drop(buf);

    if total.is_empty() {
        return Err(Error::Validation("microdata contained no person records".into()));
    }

    let mut agg = total.finalize();
    agg.chunks = chunks;
    tracing::info!(
        rows = agg.records_read,
        cells = agg.cells.len(),
        undefined = agg.undefined.len(),
        "aggregated to state-year uninsured rates"
    );
    Ok(agg)
}
