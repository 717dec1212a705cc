use std::path::PathBuf;

use adam_core::AeSummary;
use adam_model::{DerivationReport, OutputPaths};

#[derive(Debug)]
pub struct StudyResult {
    pub study_id: String,
    pub output_dir: PathBuf,
    pub datasets: Vec<DatasetSummary>,
    pub ae_summary: Option<AeSummary>,
    pub ae_summary_csv: Option<PathBuf>,
    pub dry_run: bool,
}

impl StudyResult {
    pub fn defect_count(&self) -> usize {
        self.datasets
            .iter()
            .map(|dataset| dataset.report.defect_count())
            .sum()
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetSummary> {
        self.datasets
            .iter()
            .find(|dataset| dataset.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug)]
pub struct DatasetSummary {
    pub name: String,
    pub label: String,
    pub records: usize,
    pub outputs: OutputPaths,
    pub report: DerivationReport,
}
