//! # mx-inference
//!
//! Regression layer for the medexp pipeline: design matrices with categorical
//! fixed effects, OLS with HC1 standard errors, and the two estimators built
//! on it (two-way fixed-effects DiD and the lead/lag event study).

#![warn(clippy::all)]

pub mod econometrics;

pub use econometrics::{
    Design, DesignBuilder, DidResult, EventEstimate, EventStudyResult, EventWindow, OlsFit,
    RankPolicy, TermEstimate, did_twfe, event_study_twfe, ols_hc1,
};
