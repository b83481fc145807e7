// src/insights.rs
//
// Small queries the dashboard asks of the pipeline output.

use std::cmp::Ordering;

use crate::{
    average::MissingPolicy,
    correlation::{pearson, NumericRow, MOBILE, OUTPUT_PER_CAPITA},
    load::RawIndicatorTable,
    profile::CountryProfile,
    region::RegionProfile,
};

/// Descending by `key`, NaN sorted last; stable for ties.
pub fn top_by<'a, T, F>(rows: &'a [T], key: F, n: usize) -> Vec<&'a T>
where
    F: Fn(&T) -> f64,
{
    let mut sorted: Vec<&T> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        let (ka, kb) = (key(a), key(b));
        match (ka.is_nan(), kb.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => kb.partial_cmp(&ka).unwrap_or(Ordering::Equal),
        }
    });
    sorted.truncate(n);
    sorted
}

/// Countries above `mobile_min` subscriptions per 100 people and below
/// `unemployment_max` percent unemployment.
pub fn connected_low_unemployment(
    profiles: &[CountryProfile],
    mobile_min: f64,
    unemployment_max: f64,
) -> Vec<&CountryProfile> {
    profiles
        .iter()
        .filter(|p| p.mobile > mobile_min && p.unemployment < unemployment_max)
        .collect()
}

/// Correlation between mobile penetration and output per capita.
pub fn mobile_vs_output_per_capita<R: NumericRow>(rows: &[R]) -> f64 {
    let column = |name: &str| -> Vec<f64> {
        rows.iter()
            .map(|r| r.value(name).unwrap_or(f64::NAN))
            .collect()
    };
    pearson(&column(MOBILE), &column(OUTPUT_PER_CAPITA))
}

/// Year-by-year values of the first row named `name`, over the indicator's range.
/// Under `ZeroFill` gaps are reported as 0, as the averages see them.
pub fn year_series(
    table: &RawIndicatorTable,
    name: &str,
    policy: MissingPolicy,
) -> Option<Vec<(u16, Option<f64>)>> {
    let row = table.find(name).next()?;
    Some(
        table
            .indicator
            .years()
            .map(|y| match (row.value(y), policy) {
                (None, MissingPolicy::ZeroFill) => (y, Some(0.0)),
                (v, _) => (y, v),
            })
            .collect(),
    )
}

/// The rows for two selected regions, in the order asked for.
pub fn compare_regions<'a>(
    regions: &'a [RegionProfile],
    a: &str,
    b: &str,
) -> Vec<&'a RegionProfile> {
    [a, b]
        .iter()
        .filter_map(|name| regions.iter().find(|r| r.region == *name))
        .collect()
}
