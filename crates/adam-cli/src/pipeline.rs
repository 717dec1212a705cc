//! Study pipeline: discover, read, derive, then write.
//!
//! Every derivation finishes and every output is encoded before the first
//! file is written, so a fatal error leaves the output directory untouched.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use polars::prelude::DataFrame;
use tracing::{debug, info, info_span, warn};

use adam_common::cell_text;
use adam_core::{
    AdslInputs, QueryPlan, QueryResult, TracingObserver, adsl_spec, derive_adsl, derive_ds,
    ds_spec, execute, parse_question, summarize_ae,
};
use adam_ingest::{StudyFiles, discover_study_files, read_csv_frame};
use adam_model::{DatasetSpec, DerivationConfig, DerivationReport, OutputPaths};
use adam_output::{persist_file, render_dataset_outputs, table_csv_bytes};

use crate::types::{DatasetSummary, StudyResult};

/// File name of the persisted AE summary table.
pub const AE_SUMMARY_FILE: &str = "ae_summary.csv";

#[derive(Debug, Clone)]
pub struct StudyOptions {
    pub study_folder: PathBuf,
    pub output_dir: PathBuf,
    pub config: DerivationConfig,
    pub dry_run: bool,
    /// Include subject identifiers in row-level log events.
    pub log_data: bool,
}

impl StudyOptions {
    /// Options with default configuration, writing to `<study_folder>/output`.
    pub fn new(study_folder: &Path) -> Self {
        Self {
            study_folder: study_folder.to_path_buf(),
            output_dir: study_folder.join("output"),
            config: DerivationConfig::default(),
            dry_run: false,
            log_data: false,
        }
    }
}

/// Input tables of a study folder; only demographics is mandatory.
#[derive(Debug, Clone)]
pub struct StudyInputs {
    pub dm: DataFrame,
    pub ex: Option<DataFrame>,
    pub vs: Option<DataFrame>,
    pub ae: Option<DataFrame>,
    /// Raw disposition records; DS is derived from these when present.
    pub ds_raw: Option<DataFrame>,
    /// Ready-made SDTM DS, used as evidence when no raw records exist.
    pub ds: Option<DataFrame>,
    pub adae: Option<DataFrame>,
}

/// Loads the derivation config, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<DerivationConfig> {
    match path {
        Some(path) => {
            DerivationConfig::load(path).with_context(|| format!("load config {}", path.display()))
        }
        None => Ok(DerivationConfig::default()),
    }
}

pub fn load_inputs(files: &StudyFiles) -> Result<StudyInputs> {
    let dm_path = files
        .get("dm")
        .ok_or_else(|| anyhow!("study folder has no dm.csv"))?;
    Ok(StudyInputs {
        dm: read_csv_frame(dm_path).context("read dm")?,
        ex: read_optional(files, "ex")?,
        vs: read_optional(files, "vs")?,
        ae: read_optional(files, "ae")?,
        ds_raw: read_optional(files, "ds_raw")?,
        ds: read_optional(files, "ds")?,
        adae: read_optional(files, "adae")?,
    })
}

fn read_optional(files: &StudyFiles, name: &str) -> Result<Option<DataFrame>> {
    let Some(path) = files.get(name) else {
        debug!(input = name, "input not present");
        return Ok(None);
    };
    let df = read_csv_frame(path).with_context(|| format!("read {name}"))?;
    debug!(input = name, rows = df.height(), "input loaded");
    Ok(Some(df))
}

struct Derived {
    spec: DatasetSpec,
    data: DataFrame,
    report: DerivationReport,
}

pub fn run_study(options: &StudyOptions) -> Result<StudyResult> {
    let study_folder = &options.study_folder;
    let study_span = info_span!(
        "study",
        study_folder = %study_folder.display(),
        study_id = tracing::field::Empty
    );
    let _study_guard = study_span.enter();
    let config = &options.config;
    let mut observer = TracingObserver::new().with_log_data(options.log_data);

    // ===== Stage 1: Discover and read =====
    let read_start = Instant::now();
    let files = discover_study_files(study_folder)
        .with_context(|| format!("scan {}", study_folder.display()))?;
    let inputs = load_inputs(&files)?;
    info!(
        files = files.len(),
        subjects = inputs.dm.height(),
        duration_ms = read_start.elapsed().as_millis(),
        "inputs read"
    );

    // ===== Stage 2: Disposition =====
    let mut derived = Vec::new();
    let ds_evidence = match &inputs.ds_raw {
        Some(raw) => {
            let output =
                derive_ds(raw, Some(&inputs.dm), config, &mut observer).context("derive DS")?;
            derived.push(Derived {
                spec: ds_spec(),
                data: output.data,
                report: output.report,
            });
            derived.last().map(|ds| &ds.data)
        }
        None => {
            if inputs.ds.is_none() {
                warn!("no disposition input; DS evidence unavailable");
            }
            inputs.ds.as_ref()
        }
    };

    // ===== Stage 3: Subject level =====
    let mut adsl_inputs = AdslInputs::new(&inputs.dm);
    if let Some(ex) = &inputs.ex {
        adsl_inputs = adsl_inputs.with_ex(ex);
    }
    if let Some(vs) = &inputs.vs {
        adsl_inputs = adsl_inputs.with_vs(vs);
    }
    if let Some(ae) = &inputs.ae {
        adsl_inputs = adsl_inputs.with_ae(ae);
    }
    if let Some(ds) = ds_evidence {
        adsl_inputs = adsl_inputs.with_ds(ds);
    }
    let adsl = derive_adsl(&adsl_inputs, config, &mut observer).context("derive ADSL")?;

    // ===== Stage 4: AE summary =====
    let ae_summary = match &inputs.adae {
        Some(adae) => Some(summarize_ae(adae, &adsl.data).context("summarize AE")?),
        None => None,
    };
    derived.push(Derived {
        spec: adsl_spec(),
        data: adsl.data,
        report: adsl.report,
    });

    let study_id = config
        .study_id
        .clone()
        .or_else(|| first_study_id(&derived))
        .unwrap_or_else(|| folder_name(study_folder));
    study_span.record("study_id", study_id.as_str());

    // ===== Stage 5: Encode =====
    let rendered = derived
        .iter()
        .map(|dataset| {
            render_dataset_outputs(&dataset.spec, &dataset.data, &config.output)
                .with_context(|| format!("encode {}", dataset.spec.name))
        })
        .collect::<Result<Vec<_>>>()?;
    let ae_summary_bytes = match &ae_summary {
        Some(summary) => {
            let df = summary.to_dataframe().context("build AE summary table")?;
            Some(table_csv_bytes(&df).context("encode AE summary")?)
        }
        None => None,
    };

    // ===== Stage 6: Write =====
    let mut datasets = Vec::with_capacity(derived.len());
    let mut ae_summary_csv = None;
    if options.dry_run {
        info!("dry run; no files written");
    }
    for (Derived { spec, data, report }, rendered) in derived.into_iter().zip(rendered) {
        let outputs = if options.dry_run {
            OutputPaths::default()
        } else {
            let outputs = rendered
                .persist(&options.output_dir)
                .with_context(|| format!("write {}", spec.name))?;
            debug!(dataset = %spec.name, "outputs written");
            outputs
        };
        datasets.push(DatasetSummary {
            name: spec.name,
            label: spec.label,
            records: data.height(),
            outputs,
            report,
        });
    }
    if let Some(bytes) = &ae_summary_bytes
        && !options.dry_run
    {
        ae_summary_csv = Some(persist_file(&options.output_dir, AE_SUMMARY_FILE, bytes)?);
    }

    Ok(StudyResult {
        study_id,
        output_dir: options.output_dir.clone(),
        datasets,
        ae_summary,
        ae_summary_csv,
        dry_run: options.dry_run,
    })
}

fn first_study_id(derived: &[Derived]) -> Option<String> {
    derived.iter().find_map(|dataset| {
        (0..dataset.data.height())
            .map(|idx| cell_text(&dataset.data, "STUDYID", idx))
            .find(|value| !value.is_empty())
    })
}

fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("STUDY")
        .to_string()
}

/// ADAE location: the file itself, or `adae.csv` inside a study folder.
pub fn resolve_adae_path(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        let files = discover_study_files(path)
            .with_context(|| format!("scan {}", path.display()))?;
        return files
            .get("adae")
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("{} has no adae.csv", path.display()));
    }
    Ok(path.to_path_buf())
}

pub fn run_query(path: &Path, question: &str) -> Result<(QueryPlan, QueryResult)> {
    let path = resolve_adae_path(path)?;
    let adae = read_csv_frame(&path).with_context(|| format!("read {}", path.display()))?;
    let plan = parse_question(question, &adae).context("map question")?;
    let result = execute(&adae, &plan).context("run query")?;
    Ok((plan, result))
}
