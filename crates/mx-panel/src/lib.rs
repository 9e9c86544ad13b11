//! # mx-panel
//!
//! Everything between the raw survey extract and the state-year panel:
//!
//! - [`microdata`]: fixed-width person-record decoder with chunked reads.
//! - [`aggregate`]: streaming weighted uninsured-rate accumulators.
//! - [`expansion`]: the Medicaid-expansion reference table (generate, read, write).
//! - [`panel`]: left join of state-year cells with the reference table, panel CSV I/O.

#![warn(clippy::all)]

pub mod aggregate;
pub mod expansion;
pub mod microdata;
pub mod panel;

pub use aggregate::{Aggregation, PartialSums, StateYearCell, WeightedSums, aggregate_microdata};
pub use expansion::{Adoption, ExpansionRow, ExpansionSchedule, POLICY_YEAR};
pub use microdata::{ColumnSpan, FixedWidthLayout, MicrodataReader, PersonRecord};
pub use panel::{MergedPanel, PanelRow, merge_expansion};
