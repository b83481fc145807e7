// src/filter.rs

use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

use crate::load::{RawIndicatorTable, RawRow};

/// World Bank labels for rows that describe groups of countries.
pub static DEFAULT_AGGREGATE_NAMES: &[&str] = &[
    // world and lending groups
    "World",
    "IDA total",
    "IBRD only",
    "IDA & IBRD total",
    "IDA only",
    "IDA blend",
    "OECD members",
    "High income",
    "Low income",
    "Middle income",
    "Low & middle income",
    "Upper middle income",
    "Lower middle income",
    // development groups
    "Early-demographic dividend",
    "Late-demographic dividend",
    "Post-demographic dividend",
    "Pre-demographic dividend",
    "Heavily indebted poor countries (HIPC)",
    "Least developed countries: UN classification",
    "Fragile and conflict affected situations",
    // regions and sub-regions
    "East Asia & Pacific",
    "East Asia & Pacific (excluding high income)",
    "East Asia & Pacific (IDA & IBRD countries)",
    "South Asia",
    "South Asia (IDA & IBRD)",
    "Sub-Saharan Africa",
    "Sub-Saharan Africa (IDA & IBRD countries)",
    "Sub-Saharan Africa (excluding high income)",
    "Africa Eastern and Southern",
    "Africa Western and Central",
    "Latin America & Caribbean",
    "Latin America & the Caribbean (IDA & IBRD countries)",
    "Latin America & Caribbean (excluding high income)",
    "Middle East & North Africa",
    "Middle East & North Africa (excluding high income)",
    "Middle East & North Africa (IDA & IBRD countries)",
    "Europe & Central Asia",
    "Europe & Central Asia (IDA & IBRD countries)",
    "Europe & Central Asia (excluding high income)",
    "European Union",
    "Central Europe and the Baltics",
    "North America",
    "Arab World",
    "Euro area",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Country,
    Aggregate,
}

/// Names that never count as a country, whatever their code looks like.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AggregateNames(HashSet<String>);

impl Default for AggregateNames {
    fn default() -> Self {
        DEFAULT_AGGREGATE_NAMES.iter().copied().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for AggregateNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl AggregateNames {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A row is a country only when its code is exactly three characters
/// *and* its name is not a known aggregate.
pub fn classify(row: &RawRow, aggregates: &AggregateNames) -> EntityKind {
    if row.entity_code.chars().count() == 3 && !aggregates.contains(&row.entity_name) {
        EntityKind::Country
    } else {
        EntityKind::Aggregate
    }
}

/// Country rows of `table`, in their original order.
pub fn countries(table: &RawIndicatorTable, aggregates: &AggregateNames) -> RawIndicatorTable {
    let out = table.retain_rows(|r| classify(r, aggregates) == EntityKind::Country);
    debug!(
        indicator = %table.indicator,
        countries = out.len(),
        aggregates = table.len() - out.len(),
        "filtered entities"
    );
    out
}

/// Everything `countries` leaves out.
pub fn aggregates(table: &RawIndicatorTable, aggregates: &AggregateNames) -> RawIndicatorTable {
    table.retain_rows(|r| classify(r, aggregates) == EntityKind::Aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::Indicator;
    use std::collections::BTreeMap;

    fn row(name: &str, code: &str) -> RawRow {
        RawRow {
            entity_name: name.into(),
            entity_code: code.into(),
            values: BTreeMap::new(),
        }
    }

    fn table(rows: Vec<RawRow>) -> RawIndicatorTable {
        RawIndicatorTable {
            indicator: Indicator::Population,
            headers: vec![],
            rows,
        }
    }

    #[test]
    fn both_conditions_are_required() {
        let names = AggregateNames::default();
        assert_eq!(classify(&row("France", "FRA"), &names), EntityKind::Country);
        // three-letter code but a listed aggregate
        assert_eq!(classify(&row("World", "WLD"), &names), EntityKind::Aggregate);
        assert_eq!(classify(&row("South Asia", "SAS"), &names), EntityKind::Aggregate);
        // unlisted name with a non-ISO code
        assert_eq!(classify(&row("Kosovo", "XKX1"), &names), EntityKind::Aggregate);
        assert_eq!(classify(&row("Channel", "CH"), &names), EntityKind::Aggregate);
    }

    #[test]
    fn countries_and_aggregates_partition_the_table() {
        let names = AggregateNames::default();
        let t = table(vec![
            row("France", "FRA"),
            row("World", "WLD"),
            row("Chile", "CHL"),
            row("Euro area", "EMU"),
            row("Odd", "ODDX"),
        ]);
        let c = countries(&t, &names);
        let a = aggregates(&t, &names);

        let c_names: Vec<_> = c.rows.iter().map(|r| r.entity_name.as_str()).collect();
        assert_eq!(c_names, vec!["France", "Chile"]);
        assert_eq!(c.len() + a.len(), t.len());
        for r in &c.rows {
            assert_eq!(r.entity_code.len(), 3);
            assert!(!names.contains(&r.entity_name));
        }
        // input untouched
        assert_eq!(t.len(), 5);
    }

    #[test]
    fn default_set_covers_world_bank_groups() {
        let names = AggregateNames::default();
        assert_eq!(names.len(), DEFAULT_AGGREGATE_NAMES.len());
        assert!(names.contains("Arab World"));
        assert!(!names.contains("China"));
    }
}
