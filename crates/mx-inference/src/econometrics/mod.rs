//! Econometrics for the expansion study.
//!
//! This module provides:
//! - **Design matrices** with an intercept, numeric regressors and
//!   treatment-coded categorical fixed effects (`C(var)[T.level]` columns).
//! - **OLS** via the SVD pseudo-inverse (minimum-norm solution) with HC1
//!   heteroskedasticity-robust covariance and aliased-column detection.
//! - **Difference-in-Differences** with state and year fixed effects and an
//!   `expansion × post` interaction.
//! - **Event study** with one indicator per year relative to 2014.

pub mod design;
pub mod did;
pub mod event_study;
pub mod ols;

pub use design::{Design, DesignBuilder};
pub use did::{DidResult, did_twfe};
pub use event_study::{EventEstimate, EventStudyResult, EventWindow, event_study_twfe};
pub use ols::{OlsFit, RankPolicy, TermEstimate, Z_975, normal_two_sided_p, ols_hc1};

/// Name of the entity fixed-effect variable in column labels.
pub const ENTITY_VAR: &str = "statefip";

/// Name of the time fixed-effect variable in column labels.
pub const TIME_VAR: &str = "year";
