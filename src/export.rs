// src/export.rs

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, StringArray},
    csv::WriterBuilder,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::{io::Write, sync::Arc};

use crate::{
    correlation::{CorrelationMatrix, MOBILE, OUTPUT, OUTPUT_PER_CAPITA, POPULATION, UNEMPLOYMENT},
    profile::CountryProfile,
    region::RegionProfile,
};

/// Undefined values become nulls so consumers never see NaN.
fn float_column<I: IntoIterator<Item = f64>>(values: I) -> ArrayRef {
    let arr: Float64Array = values
        .into_iter()
        .map(|v| if v.is_nan() { None } else { Some(v) })
        .collect();
    Arc::new(arr)
}

fn string_column<'a, I: IntoIterator<Item = &'a str>>(values: I) -> ArrayRef {
    Arc::new(values.into_iter().map(Some).collect::<StringArray>())
}

fn metric_fields() -> Vec<Field> {
    [POPULATION, OUTPUT, UNEMPLOYMENT, MOBILE, OUTPUT_PER_CAPITA]
        .iter()
        .map(|name| Field::new(*name, DataType::Float64, true))
        .collect()
}

pub fn country_schema() -> Arc<Schema> {
    let mut fields = vec![
        Field::new("country", DataType::Utf8, false),
        Field::new("code", DataType::Utf8, false),
    ];
    fields.extend(metric_fields());
    Arc::new(Schema::new(fields))
}

pub fn region_schema() -> Arc<Schema> {
    let mut fields = vec![Field::new("region", DataType::Utf8, false)];
    fields.extend(metric_fields());
    Arc::new(Schema::new(fields))
}

pub fn country_batch(profiles: &[CountryProfile]) -> Result<RecordBatch> {
    let columns = vec![
        string_column(profiles.iter().map(|p| p.name.as_str())),
        string_column(profiles.iter().map(|p| p.code.as_str())),
        float_column(profiles.iter().map(|p| p.population)),
        float_column(profiles.iter().map(|p| p.output)),
        float_column(profiles.iter().map(|p| p.unemployment)),
        float_column(profiles.iter().map(|p| p.mobile)),
        float_column(profiles.iter().map(|p| p.output_per_capita)),
    ];
    RecordBatch::try_new(country_schema(), columns).context("building country batch")
}

pub fn region_batch(regions: &[RegionProfile]) -> Result<RecordBatch> {
    let columns = vec![
        string_column(regions.iter().map(|r| r.region.as_str())),
        float_column(regions.iter().map(|r| r.population)),
        float_column(regions.iter().map(|r| r.output)),
        float_column(regions.iter().map(|r| r.unemployment)),
        float_column(regions.iter().map(|r| r.mobile)),
        float_column(regions.iter().map(|r| r.output_per_capita)),
    ];
    RecordBatch::try_new(region_schema(), columns).context("building region batch")
}

/// One row per matrix row; a leading `column` field names it.
pub fn correlation_batch(matrix: &CorrelationMatrix) -> Result<RecordBatch> {
    let mut fields = vec![Field::new("column", DataType::Utf8, false)];
    fields.extend(
        matrix
            .columns
            .iter()
            .map(|c| Field::new(c, DataType::Float64, true)),
    );

    let mut columns = vec![string_column(matrix.columns.iter().map(String::as_str))];
    for j in 0..matrix.len() {
        columns.push(float_column(matrix.values.iter().map(|row| row[j])));
    }
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("building correlation batch")
}

/// Write `batch` as CSV with a header line; nulls are blank cells.
pub fn write_csv<W: Write>(batch: &RecordBatch, out: W) -> Result<()> {
    let mut writer = WriterBuilder::new().with_header(true).build(out);
    writer
        .write(batch)
        .with_context(|| format!("writing {} rows as CSV", batch.num_rows()))
}
