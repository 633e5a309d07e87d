//! Reader for a directory of Parquet metadata tables.
//!
//! Each table lives in its own file, named `<table>.parquet` or with a run
//! prefix such as `REF_L_218386_metadata.parquet`. The first row of a table
//! becomes its field map. The `daslogs` table holds one row per log channel
//! with `name`, `average_value`, `min_value` and `max_value` columns.
//! Missing tables are simply absent from the result.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use arrow_array::cast::AsArray;
use arrow_array::types::{
    Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, UInt32Type, UInt64Type,
};
use arrow_array::{Array, ArrayRef, RecordBatch};
use arrow_cast::display::{ArrayFormatter, FormatOptions};
use arrow_schema::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use refl_core::sources::{LogChannel, MetadataSource, MetadataValue};

use crate::error::SourceError;

/// Tables read from a metadata directory. `daslogs` is read separately.
pub const FIELD_TABLES: [&str; 4] = ["metadata", "sample", "instrument", "users"];

/// Log channel table.
pub const DASLOGS_TABLE: &str = "daslogs";

/// Read every recognised table in `dir`.
///
/// When `run_number` is given, prefixed files for other runs are skipped.
/// Plain `<table>.parquet` files are always read.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the directory cannot be listed and
/// [`SourceError::Parquet`] if a table file cannot be decoded.
pub fn read_metadata_dir(
    dir: &Path,
    run_number: Option<u64>,
) -> Result<MetadataSource, SourceError> {
    let mut source = MetadataSource {
        directory: Some(dir.display().to_string()),
        ..MetadataSource::default()
    };

    for (table, path) in discover_tables(dir, run_number)? {
        let batches = read_batches(&path)?;
        if table == DASLOGS_TABLE {
            source.logs = log_channels(&batches);
            tracing::debug!(path = %path.display(), channels = source.logs.len(), "read daslogs");
        } else {
            let fields = first_row(&batches);
            tracing::debug!(
                path = %path.display(),
                table,
                fields = fields.len(),
                "read metadata table"
            );
            source.tables.insert(table.to_string(), fields);
        }
    }

    if source.is_empty() {
        tracing::warn!(dir = %dir.display(), "metadata directory holds no recognised tables");
    }
    Ok(source)
}

/// Map each table name to a file, in sorted file order.
///
/// A plain `<table>.parquet` is always a candidate. A prefixed file is only a
/// candidate when its prefix carries `run_number` as a whole digit run, and it
/// then wins over the plain file.
fn discover_tables(
    dir: &Path,
    run_number: Option<u64>,
) -> Result<BTreeMap<&'static str, PathBuf>, SourceError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SourceError::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"))
        })
        .collect();
    files.sort();

    let run = run_number.map(|r| r.to_string());
    let mut tables: BTreeMap<&'static str, (u8, PathBuf)> = BTreeMap::new();
    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(table) = table_for_stem(stem) else {
            continue;
        };
        let plain = stem.eq_ignore_ascii_case(table);
        let rank = match run.as_deref() {
            Some(_) if plain => 1,
            Some(run) if has_digit_run(stem, run) => 0,
            Some(_) => continue,
            None => 0,
        };
        if tables.get(table).is_none_or(|(best, _)| rank < *best) {
            tables.insert(table, (rank, path));
        }
    }
    Ok(tables
        .into_iter()
        .map(|(table, (_, path))| (table, path))
        .collect())
}

/// Whether `run` appears in `stem` as a maximal run of digits.
fn has_digit_run(stem: &str, run: &str) -> bool {
    stem.split(|c: char| !c.is_ascii_digit()).any(|digits| digits == run)
}

fn read_batches(path: &Path) -> Result<Vec<RecordBatch>, SourceError> {
    let file = File::open(path).map_err(|e| SourceError::io(path, e))?;
    let parquet_err = |source| SourceError::Parquet {
        path: path.to_path_buf(),
        source,
    };
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(parquet_err)?
        .build()
        .map_err(parquet_err)?;
    reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(SourceError::from)
}

fn first_row(batches: &[RecordBatch]) -> BTreeMap<String, MetadataValue> {
    let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
        return BTreeMap::new();
    };
    batch
        .schema()
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, column)| (field.name().clone(), cell_value(column, 0)))
        .collect()
}

fn log_channels(batches: &[RecordBatch]) -> BTreeMap<String, LogChannel> {
    let mut channels = BTreeMap::new();
    for batch in batches {
        let Some(names) = batch.column_by_name("name") else {
            tracing::warn!("daslogs table has no 'name' column");
            return channels;
        };
        let stat = |column: &str, row: usize| {
            batch
                .column_by_name(column)
                .and_then(|c| cell_value(c, row).as_f64())
        };
        for row in 0..batch.num_rows() {
            let Some(name) = cell_value(names, row).as_text() else {
                continue;
            };
            channels.insert(
                name,
                LogChannel::new(
                    stat("average_value", row),
                    stat("min_value", row),
                    stat("max_value", row),
                ),
            );
        }
    }
    channels
}

/// Decode one cell into a typed metadata value.
#[allow(clippy::cast_precision_loss)]
fn cell_value(column: &ArrayRef, row: usize) -> MetadataValue {
    if column.is_null(row) {
        return MetadataValue::Null;
    }
    match column.data_type() {
        DataType::Utf8 => MetadataValue::String(column.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => {
            MetadataValue::String(column.as_string::<i64>().value(row).to_string())
        }
        DataType::Boolean => MetadataValue::Bool(column.as_boolean().value(row)),
        DataType::Int16 => {
            MetadataValue::Integer(i64::from(column.as_primitive::<Int16Type>().value(row)))
        }
        DataType::Int32 => {
            MetadataValue::Integer(i64::from(column.as_primitive::<Int32Type>().value(row)))
        }
        DataType::Int64 => MetadataValue::Integer(column.as_primitive::<Int64Type>().value(row)),
        DataType::UInt32 => {
            MetadataValue::Integer(i64::from(column.as_primitive::<UInt32Type>().value(row)))
        }
        DataType::UInt64 => {
            let value = column.as_primitive::<UInt64Type>().value(row);
            i64::try_from(value)
                .map_or_else(|_| MetadataValue::Float(value as f64), MetadataValue::Integer)
        }
        DataType::Float32 => {
            MetadataValue::Float(f64::from(column.as_primitive::<Float32Type>().value(row)))
        }
        DataType::Float64 => MetadataValue::Float(column.as_primitive::<Float64Type>().value(row)),
        _ => formatted(column, row),
    }
}

/// Fallback for timestamps, dates and anything else: the Arrow display form.
fn formatted(column: &ArrayRef, row: usize) -> MetadataValue {
    match ArrayFormatter::try_new(column.as_ref(), &FormatOptions::default()) {
        Ok(formatter) => MetadataValue::String(formatter.value(row).to_string()),
        Err(err) => {
            tracing::debug!(%err, data_type = %column.data_type(), "unreadable metadata cell");
            MetadataValue::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("metadata", Some("metadata"))]
    #[case("REF_L_218386_metadata", Some("metadata"))]
    #[case("REF_L_218386_DASLOGS", Some("daslogs"))]
    #[case("run_users", Some("users"))]
    #[case("samples_extra", None)]
    #[case("nexus", None)]
    fn stems_map_to_tables(#[case] stem: &str, #[case] table: Option<&str>) {
        assert_eq!(table_for_stem(stem), table);
    }

    #[rstest]
    #[case("REF_L_218386_metadata", "218386", true)]
    #[case("REF_L_218386_metadata", "21838", false)]
    #[case("REF_L_218386_metadata", "18386", false)]
    #[case("run218386_daslogs", "218386", true)]
    #[case("metadata", "218386", false)]
    fn run_filter_matches_whole_digit_runs(
        #[case] stem: &str,
        #[case] run: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(has_digit_run(stem, run), expected);
    }
}
