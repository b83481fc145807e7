// src/load/mod.rs
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::BTreeMap, fs::File, io::Read, path::Path};
use tracing::{debug, info};

use crate::indicator::Indicator;

pub mod cache;

pub use cache::{IndicatorTables, SourcePaths, TableCache};

pub const NAME_COLUMN: &str = "Country Name";
pub const CODE_COLUMN: &str = "Country Code";

static YEAR_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})").expect("year prefix regex should be valid"));

/// One entity row of an indicator table.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub entity_name: String,
    pub entity_code: String,
    /// Year → value, `None` where the source cell was blank or unparseable.
    pub values: BTreeMap<u16, Option<f64>>,
}

impl RawRow {
    pub fn value(&self, year: u16) -> Option<f64> {
        self.values.get(&year).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawIndicatorTable {
    pub indicator: Indicator,
    /// Normalized column labels, in file order.
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawIndicatorTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose name matches exactly.
    pub fn find<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RawRow> + 'a {
        self.rows.iter().filter(move |r| r.entity_name == name)
    }

    /// Copy of this table keeping only rows accepted by `keep`.
    pub fn retain_rows<F: Fn(&RawRow) -> bool>(&self, keep: F) -> RawIndicatorTable {
        RawIndicatorTable {
            indicator: self.indicator,
            headers: self.headers.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

/// Truncates labels starting with four digits to just the year.
/// `"2010 [YR2010]"` becomes `"2010"`; `"Country Name"` is returned as is.
pub fn normalize_header(label: &str) -> String {
    match YEAR_PREFIX.captures(label) {
        Some(caps) => caps[1].to_string(),
        None => label.to_string(),
    }
}

fn parse_cell(raw: &str) -> Option<f64> {
    let v = raw.trim().trim_matches('"');
    if v.is_empty() || v == ".." {
        return None;
    }
    // `nan` and `inf` parse as floats but are gaps in the source
    v.parse::<f64>().ok().filter(|x| x.is_finite())
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.trim().is_empty())
}

fn strip_bom(cell: &str) -> &str {
    cell.trim_start_matches('\u{feff}')
}

fn is_header_record(record: &StringRecord) -> bool {
    record.iter().any(|c| strip_bom(c) == NAME_COLUMN)
}

/// Parse one indicator table from CSV.
///
/// World Bank bulk exports carry a few metadata lines above the real header,
/// so the first record containing a `Country Name` cell is taken as the header.
/// Rows without a name or a code are dropped.
pub fn read_indicator_table<R: Read>(indicator: Indicator, reader: R) -> Result<RawIndicatorTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = rdr.records().enumerate();

    // 1) find the header record
    let headers: Vec<String> = loop {
        match records.next() {
            Some((idx, result)) => {
                let record =
                    result.with_context(|| format!("CSV parse error at record {}", idx))?;
                if is_header_record(&record) {
                    break record
                        .iter()
                        .map(|c| normalize_header(strip_bom(c)))
                        .collect();
                }
            }
            None => return Err(anyhow!("no `{}` header row found", NAME_COLUMN)),
        }
    };

    // 2) resolve the columns this indicator needs
    let position = |label: &str| headers.iter().position(|h| h == label);
    let name_idx = position(NAME_COLUMN).ok_or_else(|| anyhow!("missing `{}`", NAME_COLUMN))?;
    let code_idx = position(CODE_COLUMN).ok_or_else(|| anyhow!("missing `{}`", CODE_COLUMN))?;
    let mut year_idx = Vec::new();
    for year in indicator.years() {
        let idx = position(&year.to_string())
            .ok_or_else(|| anyhow!("{} has no column for year {}", indicator, year))?;
        year_idx.push((year, idx));
    }

    // 3) collect rows, dropping the ones without identity
    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for (idx, result) in records {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        let (name, code) = match (
            non_blank(record.get(name_idx)),
            non_blank(record.get(code_idx)),
        ) {
            (Some(n), Some(c)) => (n, c),
            _ => {
                dropped += 1;
                continue;
            }
        };
        let values = year_idx
            .iter()
            .map(|&(year, i)| (year, record.get(i).and_then(parse_cell)))
            .collect();
        rows.push(RawRow {
            entity_name: name.to_string(),
            entity_code: code.to_string(),
            values,
        });
    }

    debug!(%indicator, kept = rows.len(), dropped, "parsed indicator table");

    Ok(RawIndicatorTable {
        indicator,
        headers,
        rows,
    })
}

/// Load one indicator table from a CSV file.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_indicator_table<P: AsRef<Path>>(
    indicator: Indicator,
    path: P,
) -> Result<RawIndicatorTable> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open {} source: {:?}", indicator, path.as_ref()))?;
    let table = read_indicator_table(indicator, file)
        .with_context(|| format!("Failed to read {} from {:?}", indicator, path.as_ref()))?;
    info!(rows = table.len(), "loaded {}", indicator);
    Ok(table)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::average::{period_average, MissingPolicy};
    use std::io::Cursor;

    /// CSV text for `indicator` with one row per `(name, code, values)`;
    /// `None` values become blank cells.
    pub(crate) fn csv_fixture(
        indicator: Indicator,
        rows: &[(&str, &str, Vec<Option<f64>>)],
    ) -> String {
        let mut out = String::from("Country Name,Country Code");
        for y in indicator.years() {
            out.push_str(&format!(",{} [YR{}]", y, y));
        }
        out.push('\n');
        for (name, code, values) in rows {
            out.push_str(&format!("\"{}\",{}", name, code));
            for i in 0..indicator.years().count() {
                match values.get(i).copied().flatten() {
                    Some(v) => out.push_str(&format!(",{}", v)),
                    None => out.push(','),
                }
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn year_headers_lose_their_footnotes() {
        assert_eq!(normalize_header("2010 [YR2010]"), "2010");
        assert_eq!(normalize_header("2015"), "2015");
        assert_eq!(normalize_header("20101 extra"), "2010");
        assert_eq!(normalize_header("Country Name"), "Country Name");
        assert_eq!(normalize_header("Series 2010"), "Series 2010");
        assert_eq!(normalize_header("201 short"), "201 short");
    }

    #[test]
    fn skips_preamble_and_drops_rows_without_identity() -> Result<()> {
        let body = csv_fixture(
            Indicator::Mobile,
            &[
                ("France", "FRA", vec![Some(90.0), None, Some(100.0)]),
                ("", "XXX", vec![Some(1.0)]),
                ("Nowhere", "", vec![Some(1.0)]),
            ],
        );
        let text = format!(
            "\"Data Source\",\"World Development Indicators\"\n\n\"Last Updated Date\",\"2024-01-01\"\n{}",
            body
        );

        let table = read_indicator_table(Indicator::Mobile, Cursor::new(text))?;
        assert_eq!(table.len(), 1);
        let france = &table.rows[0];
        assert_eq!(france.entity_name, "France");
        assert_eq!(france.value(2010), Some(90.0));
        assert_eq!(france.value(2011), None);
        assert_eq!(france.value(2012), Some(100.0));
        assert_eq!(france.values.len(), 6);
        assert!(table.headers.contains(&"2015".to_string()));
        Ok(())
    }

    #[test]
    fn double_dots_are_missing_values() -> Result<()> {
        let mut text = String::from("Country Name,Country Code");
        for y in Indicator::Mobile.years() {
            text.push_str(&format!(",{}", y));
        }
        text.push_str("\nChile,CHL,..,1,2,3,4,abc\n");
        text.push_str("Peru,PER,5,nan,15,NaN,inf,#N/A\n");
        let table = read_indicator_table(Indicator::Mobile, Cursor::new(text))?;
        assert_eq!(table.rows[0].value(2010), None);
        assert_eq!(table.rows[0].value(2011), Some(1.0));
        assert_eq!(table.rows[0].value(2015), None);

        let peru = &table.rows[1];
        assert_eq!(peru.value(2011), None);
        assert_eq!(peru.value(2013), None);
        assert_eq!(peru.value(2014), None);
        assert_eq!(peru.value(2015), None);
        let years = Indicator::Mobile.years();
        assert_eq!(period_average(peru, years.clone(), MissingPolicy::Exclude), 10.0);
        assert!((period_average(peru, years, MissingPolicy::ZeroFill) - 20.0 / 6.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn non_year_labels_pass_through_untouched() -> Result<()> {
        let mut text = String::from("\u{feff}Country Name,Country Code, Series Name ");
        for y in Indicator::Mobile.years() {
            text.push_str(&format!(",{} [YR{}]", y, y));
        }
        text.push_str("\nChile,CHL,x,1,2,3,4,5,6\n");
        let table = read_indicator_table(Indicator::Mobile, Cursor::new(text))?;
        assert_eq!(table.headers[0], NAME_COLUMN);
        assert_eq!(table.headers[2], " Series Name ");
        assert_eq!(table.headers[3], "2010");
        assert_eq!(table.len(), 1);
        Ok(())
    }

    #[test]
    fn missing_year_column_is_an_error() {
        let text = "Country Name,Country Code,2010\nChile,CHL,1\n";
        let err = read_indicator_table(Indicator::Population, Cursor::new(text)).unwrap_err();
        assert!(err.to_string().contains("2011"), "{}", err);
    }

    #[test]
    fn missing_header_is_an_error() {
        let err = read_indicator_table(Indicator::Mobile, Cursor::new("a,b\n1,2\n")).unwrap_err();
        assert!(err.to_string().contains(NAME_COLUMN));
    }
}
