//! Canonical domain types shared by every stage.
//!
//! State codes are normalized exactly once, when they enter the program
//! (fixed-width decode, reference CSV, panel CSV). Everything downstream
//! compares [`StateFips`] values, never raw strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Two-digit, zero-padded state FIPS code (`"01"`..=`"99"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateFips(u8);

impl StateFips {
    /// Build from the numeric code. Zero and values above 99 are rejected.
    pub fn new(code: u8) -> Result<Self> {
        if code == 0 || code > 99 {
            return Err(Error::Validation(format!("state FIPS code out of range: {code}")));
        }
        Ok(Self(code))
    }

    /// Parse a code as it appears in input files: `"6"`, `" 6"` and `"06"`
    /// all canonicalize to `06`.
    pub fn parse(raw: &str) -> Result<Self> {
        let s = raw.trim();
        if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Parse(format!("invalid state FIPS code: {raw:?}")));
        }
        let code: u8 =
            s.parse().map_err(|_| Error::Parse(format!("invalid state FIPS code: {raw:?}")))?;
        Self::new(code)
    }

    /// Numeric value.
    pub fn code(self) -> u8 {
        self.0
    }
}

impl fmt::Display for StateFips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for StateFips {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for StateFips {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StateFips {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Join key shared by state-year cells, reference rows and panel rows.
///
/// Orders state-major, then by year, which is the order every output table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateYear {
    /// State code.
    pub statefip: StateFips,
    /// Survey / calendar year.
    pub year: i32,
}

impl StateYear {
    /// Convenience constructor.
    pub fn new(statefip: StateFips, year: i32) -> Self {
        Self { statefip, year }
    }
}

impl fmt::Display for StateYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.statefip, self.year)
    }
}
