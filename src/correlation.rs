// src/correlation.rs

use tracing::debug;

use crate::{error::CorrelationError, profile::CountryProfile, region::RegionProfile};

pub const POPULATION: &str = "population";
pub const OUTPUT: &str = "output";
pub const UNEMPLOYMENT: &str = "unemployment";
pub const MOBILE: &str = "mobile";
pub const OUTPUT_PER_CAPITA: &str = "output_per_capita";

/// Numeric columns a profile exposes to correlation.
pub const PROFILE_COLUMNS: [&str; 5] = [OUTPUT, POPULATION, MOBILE, UNEMPLOYMENT, OUTPUT_PER_CAPITA];

/// A row with named numeric columns.
pub trait NumericRow {
    /// Every column name `value` answers for.
    fn columns() -> &'static [&'static str];

    fn value(&self, column: &str) -> Option<f64>;
}

impl NumericRow for CountryProfile {
    fn columns() -> &'static [&'static str] {
        &PROFILE_COLUMNS
    }

    fn value(&self, column: &str) -> Option<f64> {
        match column {
            POPULATION => Some(self.population),
            OUTPUT => Some(self.output),
            UNEMPLOYMENT => Some(self.unemployment),
            MOBILE => Some(self.mobile),
            OUTPUT_PER_CAPITA => Some(self.output_per_capita),
            _ => None,
        }
    }
}

impl NumericRow for RegionProfile {
    fn columns() -> &'static [&'static str] {
        &PROFILE_COLUMNS
    }

    fn value(&self, column: &str) -> Option<f64> {
        match column {
            POPULATION => Some(self.population),
            OUTPUT => Some(self.output),
            UNEMPLOYMENT => Some(self.unemployment),
            MOBILE => Some(self.mobile),
            OUTPUT_PER_CAPITA => Some(self.output_per_capita),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `values[i][j]` is the correlation of columns `i` and `j`.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Pearson correlation over the pairs where both values are finite.
/// NaN when fewer than two pairs remain or either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Symmetric Pearson matrix over `columns` of `rows`.
///
/// The diagonal is exactly 1.0 for a column with nonzero variance and NaN
/// otherwise; the lower triangle mirrors the upper one.
pub fn correlate<R: NumericRow>(
    rows: &[R],
    columns: &[&str],
) -> Result<CorrelationMatrix, CorrelationError> {
    let mut series = Vec::with_capacity(columns.len());
    for column in columns {
        if !R::columns().contains(column) {
            return Err(CorrelationError::UnknownColumn(column.to_string()));
        }
        let values = rows
            .iter()
            .map(|r| r.value(column))
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| CorrelationError::UnknownColumn(column.to_string()))?;
        series.push(values);
    }

    let n = columns.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        values[i][i] = if pearson(&series[i], &series[i]).is_nan() {
            f64::NAN
        } else {
            1.0
        };
        for j in (i + 1)..n {
            let r = pearson(&series[i], &series[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    debug!(columns = n, rows = rows.len(), "correlation matrix");
    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::per_capita;

    fn profile(pop: f64, out: f64, unemp: f64, mobile: f64) -> CountryProfile {
        CountryProfile {
            name: "X".into(),
            code: "XXX".into(),
            population: pop,
            output: out,
            unemployment: unemp,
            mobile,
            output_per_capita: per_capita(out, pop),
        }
    }

    #[test]
    fn perfect_linear_relations() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_variance_and_short_input_are_undefined() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
        assert!(pearson(&[1.0], &[1.0]).is_nan());
        // NaN pairs are dropped before counting
        assert!(pearson(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, f64::NAN]).is_nan());
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() -> anyhow::Result<()> {
        let rows = vec![
            profile(10.0, 100.0, 5.0, 90.0),
            profile(20.0, 150.0, 7.0, 110.0),
            profile(35.0, 400.0, 3.0, 105.0),
            profile(50.0, 420.0, 9.0, 130.0),
        ];
        let m = correlate(&rows, &PROFILE_COLUMNS)?;
        assert_eq!(m.len(), 5);
        for i in 0..m.len() {
            assert_eq!(m.values[i][i], 1.0);
            for j in 0..m.len() {
                assert_eq!(m.values[i][j].to_bits(), m.values[j][i].to_bits());
            }
        }
        let r = m.get(POPULATION, OUTPUT).expect("both columns present");
        assert!(r > 0.9 && r <= 1.0);
        Ok(())
    }

    #[test]
    fn constant_column_is_undefined_everywhere() -> anyhow::Result<()> {
        let rows = vec![
            profile(10.0, 100.0, 5.0, 1.0),
            profile(20.0, 150.0, 5.0, 2.0),
            profile(30.0, 170.0, 5.0, 3.0),
        ];
        let m = correlate(&rows, &[UNEMPLOYMENT, MOBILE])?;
        assert!(m.values[0][0].is_nan());
        assert!(m.values[0][1].is_nan());
        assert!(m.values[1][0].is_nan());
        assert_eq!(m.values[1][1], 1.0);
        Ok(())
    }

    #[test]
    fn unknown_column_is_rejected() {
        let rows = vec![profile(1.0, 1.0, 1.0, 1.0)];
        assert_eq!(
            correlate(&rows, &["gdp"]).unwrap_err(),
            CorrelationError::UnknownColumn("gdp".into())
        );
        let empty: Vec<CountryProfile> = vec![];
        assert!(correlate(&empty, &["gdp"]).is_err());
        assert!(correlate(&empty, &[OUTPUT]).is_ok());
    }

    /// A row type with its own column set, unrelated to the profiles.
    struct Reading {
        level: f64,
    }

    impl NumericRow for Reading {
        fn columns() -> &'static [&'static str] {
            &["level"]
        }

        fn value(&self, column: &str) -> Option<f64> {
            (column == "level").then_some(self.level)
        }
    }

    #[test]
    fn empty_rows_use_the_row_type_columns() -> anyhow::Result<()> {
        let empty: Vec<Reading> = vec![];
        let m = correlate(&empty, &["level"])?;
        assert_eq!(m.columns, vec!["level".to_string()]);
        assert!(m.values[0][0].is_nan());
        assert_eq!(
            correlate(&empty, &[OUTPUT]).unwrap_err(),
            CorrelationError::UnknownColumn(OUTPUT.into())
        );

        let rows = vec![Reading { level: 1.0 }, Reading { level: 3.0 }];
        assert_eq!(correlate(&rows, &["level"])?.values[0][0], 1.0);
        Ok(())
    }
}
