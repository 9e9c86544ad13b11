//! Design-matrix construction with categorical fixed effects.
//!
//! Column naming follows the familiar formula conventions so that printed
//! summaries line up with other tools: `Intercept`, `C(statefip)[T.06]`,
//! `expansion:post`. Categorical variables use treatment coding with the
//! smallest level as the omitted baseline.

use std::collections::BTreeSet;
use std::fmt::Display;

use mx_core::{Error, Result};
use nalgebra::DMatrix;

/// Column-oriented builder for a dense design matrix.
#[derive(Debug, Clone)]
pub struct DesignBuilder {
    n: usize,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl DesignBuilder {
    /// Builder for `n` observations.
    pub fn new(n: usize) -> Self {
        Self { n, names: Vec::new(), columns: Vec::new() }
    }

    /// Number of columns added so far.
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Append a column of ones named `Intercept`.
    pub fn intercept(&mut self) -> &mut Self {
        self.names.push("Intercept".into());
        self.columns.push(vec![1.0; self.n]);
        self
    }

    /// Append a numeric regressor.
    pub fn numeric(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<&mut Self> {
        let name = name.into();
        if values.len() != self.n {
            return Err(Error::Validation(format!(
                "column {name} has length {}, expected {}",
                values.len(),
                self.n
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Validation(format!("column {name} contains non-finite values")));
        }
        if self.names.contains(&name) {
            return Err(Error::Validation(format!("duplicate column name {name}")));
        }
        self.names.push(name);
        self.columns.push(values);
        Ok(self)
    }

    /// Append `a * b` as `a:b`.
    pub fn interaction(&mut self, a: &str, b: &str) -> Result<&mut Self> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        let values: Vec<f64> =
            self.columns[ia].iter().zip(&self.columns[ib]).map(|(x, y)| x * y).collect();
        self.numeric(format!("{a}:{b}"), values)
    }

    /// Append treatment-coded dummies for a categorical variable.
    ///
    /// Levels are sorted; the first is the baseline and gets no column.
    /// Returns the number of dummy columns added.
    pub fn categorical<K>(&mut self, var: &str, labels: &[K]) -> Result<usize>
    where
        K: Ord + Display,
    {
        if labels.len() != self.n {
            return Err(Error::Validation(format!(
                "categorical {var} has length {}, expected {}",
                labels.len(),
                self.n
            )));
        }
        let levels: BTreeSet<&K> = labels.iter().collect();
        let mut added = 0usize;
        for level in levels.into_iter().skip(1) {
            let values = labels.iter().map(|l| if l == level { 1.0 } else { 0.0 }).collect();
            self.numeric(format!("C({var})[T.{level}]"), values)?;
            added += 1;
        }
        Ok(added)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::Validation(format!("unknown column {name}")))
    }

    /// Assemble the `n × p` matrix.
    pub fn build(&self) -> Result<Design> {
        if self.n == 0 {
            return Err(Error::Validation("design must have at least one observation".into()));
        }
        if self.columns.is_empty() {
            return Err(Error::Validation("design must have at least one column".into()));
        }
        let p = self.columns.len();
        let x = DMatrix::from_fn(self.n, p, |i, j| self.columns[j][i]);
        Ok(Design { names: self.names.clone(), x })
    }
}

/// Dense design matrix with column names.
#[derive(Debug, Clone)]
pub struct Design {
    /// Column names, aligned with `x` columns.
    pub names: Vec<String>,
    /// `n × p` matrix.
    pub x: DMatrix<f64>,
}

impl Design {
    /// Observations.
    pub fn n_obs(&self) -> usize {
        self.x.nrows()
    }

    /// Columns.
    pub fn n_cols(&self) -> usize {
        self.x.ncols()
    }

    /// Position of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}
