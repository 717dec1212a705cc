//! Persistence of derived datasets.
//!
//! Each dataset is written in declared column order as CSV text and, when
//! requested, as a SAS V5 transport file. Date and datetime variables are held
//! as ISO 8601 text in memory and become SAS numerics only in transport files.

mod csv_file;
mod sas_date;
mod xpt_file;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use tracing::{debug, info, info_span};

use adam_model::{DatasetSpec, OutputConfig, OutputFormat, OutputPaths};

pub use crate::csv_file::{table_csv_bytes, write_csv_to};
pub use crate::sas_date::{SasTemporal, iso_to_sas_date, iso_to_sas_datetime};
pub use crate::xpt_file::{build_xpt_dataset, variable_length, writer_options, xpt_bytes};

/// One encoded output file.
#[derive(Debug, Clone)]
struct RenderedFile {
    format: OutputFormat,
    file_name: String,
    bytes: Vec<u8>,
}

/// A dataset encoded in every configured format, not yet on disk.
///
/// Rendering runs every check a writer would make, so a dataset that renders
/// can only fail to persist on I/O.
#[derive(Debug, Clone)]
pub struct RenderedDataset {
    name: String,
    files: Vec<RenderedFile>,
}

impl RenderedDataset {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes every rendered file into `output_dir`, creating it if needed.
    pub fn persist(&self, output_dir: &Path) -> Result<OutputPaths> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("create {}", output_dir.display()))?;
        let mut paths = OutputPaths::default();
        for file in &self.files {
            let path = output_dir.join(&file.file_name);
            std::fs::write(&path, &file.bytes)
                .with_context(|| format!("write {}", path.display()))?;
            debug!(format = %file.format, bytes = file.bytes.len(), "dataset written");
            match file.format {
                OutputFormat::Csv => paths.csv = Some(path),
                OutputFormat::Xpt => paths.xpt = Some(path),
            }
        }
        Ok(paths)
    }
}

/// Encodes `df` in every format listed in `config` without touching the
/// filesystem.
///
/// Files are named after the lower-cased dataset name. Rendering unchanged
/// data with the same configuration reproduces every file byte for byte.
pub fn render_dataset_outputs(
    spec: &DatasetSpec,
    df: &DataFrame,
    config: &OutputConfig,
) -> Result<RenderedDataset> {
    let stem = spec.file_stem();
    let mut files = Vec::with_capacity(config.formats.len());
    for format in &config.formats {
        let bytes = match format {
            OutputFormat::Csv => {
                let mut bytes = Vec::new();
                write_csv_to(&mut bytes, spec, df)?;
                bytes
            }
            OutputFormat::Xpt => {
                let options = writer_options(&config.xpt_timestamp)?;
                xpt_bytes(spec, df, &options)?
            }
        };
        files.push(RenderedFile {
            format: *format,
            file_name: format!("{stem}.{format}"),
            bytes,
        });
    }
    Ok(RenderedDataset {
        name: spec.name.clone(),
        files,
    })
}

/// Writes `df` in every format listed in `config`.
///
/// Every format is rendered before the first file is created, so an invalid
/// dataset leaves `output_dir` untouched.
pub fn write_dataset_outputs(
    output_dir: &Path,
    spec: &DatasetSpec,
    df: &DataFrame,
    config: &OutputConfig,
) -> Result<OutputPaths> {
    let span = info_span!("write_outputs", dataset = %spec.name, rows = df.height());
    let _guard = span.enter();
    let start = Instant::now();

    let paths = render_dataset_outputs(spec, df, config)?.persist(output_dir)?;

    info!(
        dataset = %spec.name,
        csv = paths.csv.is_some(),
        xpt = paths.xpt.is_some(),
        duration_ms = start.elapsed().as_millis(),
        "outputs written"
    );
    Ok(paths)
}

/// Writes already-encoded bytes to `output_dir/file_name`.
pub fn persist_file(output_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;
    let path = output_dir.join(file_name);
    std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
