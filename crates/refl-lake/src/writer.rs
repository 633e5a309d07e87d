//! Table writers.
//!
//! Rows are converted with `serde_arrow` against a schema traced from the
//! row type, then written with the `parquet` Arrow writer (ZSTD). Integer
//! microsecond columns listed in [`TIMESTAMP_COLUMNS`] are declared as
//! `Timestamp(Microsecond, "UTC")` so readers see real timestamps.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_schema::{DataType, FieldRef, Fields, TimeUnit};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use refl_config::OutputConfig;
use refl_core::records::{EnvironmentRecord, ModelRecord, ReflectivityRecord, SampleRecord};
use refl_core::report::AssemblyReport;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::error::{LakeError, io};
use crate::rows::{EnvironmentRow, ModelRow, ReflectivityRow, SampleRow};

/// Columns holding UTC microseconds.
pub const TIMESTAMP_COLUMNS: [&str; 3] = ["run_start", "reduction_time", "assembled_at"];

pub const REPORT_FILE: &str = "assembly_report.json";

/// The records of one assembly call. Absent records produce no file.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordSet<'a> {
    pub reflectivity: Option<&'a ReflectivityRecord>,
    pub sample: Option<&'a SampleRecord>,
    pub environment: Option<&'a EnvironmentRecord>,
    pub model: Option<&'a ModelRecord>,
}

/// Files written by [`LakeWriter::write`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WrittenFiles {
    pub parquet: Vec<PathBuf>,
    pub json: Vec<PathBuf>,
    pub report: Option<PathBuf>,
}

impl WrittenFiles {
    pub fn all(&self) -> impl Iterator<Item = &PathBuf> {
        self.parquet.iter().chain(&self.json).chain(&self.report)
    }
}

/// Writes records into an output directory.
#[derive(Debug, Clone)]
pub struct LakeWriter {
    root: PathBuf,
    parquet: bool,
    json: bool,
}

impl LakeWriter {
    /// Writer producing Parquet tables only.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            parquet: true,
            json: false,
        }
    }

    #[must_use]
    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.directory)
            .with_parquet(config.parquet)
            .with_json(config.json)
    }

    #[must_use]
    pub const fn with_parquet(mut self, enabled: bool) -> Self {
        self.parquet = enabled;
        self
    }

    #[must_use]
    pub const fn with_json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the tables and the assembly report.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError`] if a directory or file cannot be created, or a
    /// row cannot be converted to Arrow.
    pub fn write(
        &self,
        records: &RecordSet<'_>,
        report: &AssemblyReport,
    ) -> Result<WrittenFiles, LakeError> {
        fs::create_dir_all(&self.root).map_err(|e| io(&self.root, e))?;
        let mut written = WrittenFiles::default();
        let provenance = &report.provenance;
        let at = report.assembled_at;

        if let Some(record) = records.reflectivity {
            let row = ReflectivityRow::new(record, provenance.reflectivity.as_ref(), at)?;
            self.write_table("reflectivity", &[row], record, &mut written)?;
        }
        if let Some(record) = records.sample {
            let row = SampleRow::new(record, provenance.sample.as_ref(), at)?;
            self.write_table("sample", &[row], record, &mut written)?;
        }
        if let Some(record) = records.environment {
            let row = EnvironmentRow::new(record, provenance.environment.as_ref(), at)?;
            self.write_table("environment", &[row], record, &mut written)?;
        }
        if let Some(record) = records.model {
            let row = ModelRow::new(record, provenance.model.as_ref(), at)?;
            self.write_table("model", &[row], record, &mut written)?;
        }

        let report_path = self.root.join(REPORT_FILE);
        write_json(&report_path, report)?;
        written.report = Some(report_path);

        tracing::debug!(
            root = %self.root.display(),
            parquet = written.parquet.len(),
            json = written.json.len(),
            "wrote lake tables"
        );
        Ok(written)
    }

    fn write_table<R, T>(
        &self,
        table: &str,
        rows: &[R],
        record: &T,
        written: &mut WrittenFiles,
    ) -> Result<(), LakeError>
    where
        R: Serialize + for<'de> Deserialize<'de>,
        T: Serialize,
    {
        if self.parquet {
            let path = self.root.join(format!("{table}.parquet"));
            write_parquet(&path, rows)?;
            written.parquet.push(path);
        }
        if self.json {
            let dir = self.root.join("json");
            fs::create_dir_all(&dir).map_err(|e| io(&dir, e))?;
            let path = dir.join(format!("{table}.json"));
            write_json(&path, record)?;
            written.json.push(path);
        }
        Ok(())
    }
}

/// Arrow fields for a row type, with timestamp columns rewritten.
///
/// # Errors
///
/// Returns [`LakeError::SerdeArrow`] if the row type cannot be traced.
pub fn table_fields<R>() -> Result<Vec<FieldRef>, LakeError>
where
    R: for<'de> Deserialize<'de>,
{
    let fields = Vec::<FieldRef>::from_type::<R>(TracingOptions::default())?;
    Ok(fields.iter().map(with_utc_timestamps).collect())
}

fn with_utc_timestamps(field: &FieldRef) -> FieldRef {
    match field.data_type() {
        DataType::Struct(children) => {
            let children: Fields = children.iter().map(with_utc_timestamps).collect();
            Arc::new(field.as_ref().clone().with_data_type(DataType::Struct(children)))
        }
        DataType::Int64 if TIMESTAMP_COLUMNS.contains(&field.name().as_str()) => Arc::new(
            field
                .as_ref()
                .clone()
                .with_data_type(DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))),
        ),
        _ => Arc::clone(field),
    }
}

/// Write rows to a single Parquet file, replacing any previous file.
///
/// # Errors
///
/// Returns [`LakeError`] on conversion or I/O failure.
pub fn write_parquet<R>(path: &Path, rows: &[R]) -> Result<(), LakeError>
where
    R: Serialize + for<'de> Deserialize<'de>,
{
    let fields = table_fields::<R>()?;
    let batch = serde_arrow::to_record_batch(&fields, &rows)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build();
    let file = File::create(path).map_err(|e| io(path, e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), LakeError> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(|e| io(path, e))
}
