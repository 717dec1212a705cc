//! Subject-level analysis dataset (ADSL) derivation.

use std::collections::BTreeMap;
use std::time::Instant;

use adam_model::{DatasetSpec, DerivationConfig, DerivationReport, Variable};
use polars::prelude::*;
use tracing::{debug, info, info_span};

use crate::datetime::format_datetime;
use crate::error::Result;
use crate::evidence::{
    Candidate, EXPOSURE_EVIDENCE_TAG, ResolvedDate, SourceRanking, check_min_precision, extract,
    last_alive_sources, reduce,
};
use crate::exposure::{ExposureWindow, derive_windows};
use crate::frame::{TableView, optional_text_column, text_column};
use crate::observer::DerivationObserver;
use crate::subject::{DM_TABLE, REQUIRED_DM_COLUMNS, SubjectDerivations, aggregate};

pub const ADSL: &str = "ADSL";

pub fn adsl_spec() -> DatasetSpec {
    DatasetSpec::new(
        ADSL,
        "Subject-Level Analysis Dataset",
        vec![
            Variable::char("STUDYID", "Study Identifier"),
            Variable::char("USUBJID", "Unique Subject Identifier"),
            Variable::char("SUBJID", "Subject Identifier for the Study"),
            Variable::char("SITEID", "Study Site Identifier"),
            Variable::num("AGE", "Age"),
            Variable::char("AGEU", "Age Units"),
            Variable::char("SEX", "Sex"),
            Variable::char("RACE", "Race"),
            Variable::char("ARM", "Description of Planned Arm"),
            Variable::char("ACTARM", "Description of Actual Arm"),
            Variable::char("RFSTDTC", "Subject Reference Start Date/Time"),
            Variable::char("RFENDTC", "Subject Reference End Date/Time"),
            Variable::char("AGEGR9", "Age Group 9"),
            Variable::num("AGEGR9N", "Age Group 9 (N)"),
            Variable::char("ITTFL", "Intent-To-Treat Population Flag").with_length(1),
            Variable::num("TRTSDTM", "Datetime of First Exposure to Treatment")
                .with_format("DATETIME20."),
            Variable::char("TRTSTMF", "Time of First Exposure Imput. Flag").with_length(1),
            Variable::num("TRTEDTM", "Datetime of Last Exposure to Treatment")
                .with_format("DATETIME20."),
            Variable::char("TRTETMF", "Time of Last Exposure Imput. Flag").with_length(1),
            Variable::num("TRTSDT", "Date of First Exposure to Treatment").with_format("DATE9."),
            Variable::num("TRTEDT", "Date of Last Exposure to Treatment").with_format("DATE9."),
            Variable::num("TRTDURD", "Total Treatment Duration (Days)"),
            Variable::num("LSTALVDT", "Date Last Known Alive").with_format("DATE9."),
            Variable::char("LALVDOM", "Last Known Alive Source Domain").with_length(8),
            Variable::num("LALVSEQ", "Last Known Alive Source Sequence"),
            Variable::char("LALVVAR", "Last Known Alive Source Variable").with_length(8),
        ],
    )
}

/// Source tables for ADSL. Only demographics are mandatory; an absent event
/// log simply contributes no evidence.
#[derive(Debug, Clone, Copy)]
pub struct AdslInputs<'a> {
    pub dm: &'a DataFrame,
    pub ex: Option<&'a DataFrame>,
    pub vs: Option<&'a DataFrame>,
    pub ae: Option<&'a DataFrame>,
    pub ds: Option<&'a DataFrame>,
}

impl<'a> AdslInputs<'a> {
    pub fn new(dm: &'a DataFrame) -> Self {
        Self {
            dm,
            ex: None,
            vs: None,
            ae: None,
            ds: None,
        }
    }

    pub fn with_ex(mut self, ex: &'a DataFrame) -> Self {
        self.ex = Some(ex);
        self
    }

    pub fn with_vs(mut self, vs: &'a DataFrame) -> Self {
        self.vs = Some(vs);
        self
    }

    pub fn with_ae(mut self, ae: &'a DataFrame) -> Self {
        self.ae = Some(ae);
        self
    }

    pub fn with_ds(mut self, ds: &'a DataFrame) -> Self {
        self.ds = Some(ds);
        self
    }

    fn event_table(&self, tag: &str) -> Option<&'a DataFrame> {
        match tag {
            "VS" => self.vs,
            "AE" => self.ae,
            "DS" => self.ds,
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdslOutput {
    pub data: DataFrame,
    pub report: DerivationReport,
    pub windows: BTreeMap<String, ExposureWindow>,
    pub last_alive: BTreeMap<String, ResolvedDate>,
}

/// Derives ADSL. Nothing is produced when any input violates its schema or
/// the demographics table repeats a subject.
pub fn derive_adsl(
    inputs: &AdslInputs<'_>,
    config: &DerivationConfig,
    observer: &mut dyn DerivationObserver,
) -> Result<AdslOutput> {
    let _span = info_span!("derive_adsl").entered();
    let start = Instant::now();
    let mut report = DerivationReport::new(ADSL);

    TableView::new(DM_TABLE, inputs.dm).require(REQUIRED_DM_COLUMNS)?;

    let sources = last_alive_sources(&config.evidence);
    check_min_precision(&config.evidence, &sources)?;
    let ranking = SourceRanking::new(&config.evidence.priority, &sources)?;

    // ===== Stage 1: Exposure window =====
    let windows = match inputs.ex {
        Some(ex) => {
            let exposure = derive_windows(ex, &config.exposure, observer)?;
            report.sources.push(exposure.summary);
            report.defects.extend(exposure.defects);
            exposure.windows
        }
        None => {
            info!("no exposure log; treatment dates left missing");
            BTreeMap::new()
        }
    };

    // ===== Stage 2: Evidence extraction =====
    let exposure_evidence = exposure_evidence_table(&windows)?;
    let mut candidates: Vec<Candidate> = Vec::new();
    for source in &sources {
        let table = if source.tag == EXPOSURE_EVIDENCE_TAG {
            Some(&exposure_evidence)
        } else {
            inputs.event_table(&source.tag)
        };
        let Some(table) = table else {
            debug!(source = %source.tag, "evidence source not provided");
            continue;
        };
        let extraction = extract(table, source, observer)?;
        candidates.extend(extraction.candidates);
        report.sources.push(extraction.summary);
        report.defects.extend(extraction.defects);
    }

    // ===== Stage 3: Reduction and join =====
    let last_alive = reduce(&candidates, &ranking);
    let data = aggregate(
        inputs.dm,
        SubjectDerivations {
            windows: &windows,
            last_alive: &last_alive,
        },
        config.study_id.as_deref(),
    )?;

    for subject in TableView::new(DM_TABLE, inputs.dm).texts("USUBJID")? {
        if !last_alive.contains_key(&subject) {
            report.unresolved_subjects += 1;
            observer.subject_unresolved(&subject);
        }
    }
    report.records = data.height();

    info!(
        records = report.records,
        candidates = candidates.len(),
        unresolved = report.unresolved_subjects,
        defects = report.defect_count(),
        duration_ms = start.elapsed().as_millis(),
        "derived ADSL"
    );
    Ok(AdslOutput {
        data,
        report,
        windows,
        last_alive,
    })
}

/// Each subject's last exposure as an evidence table.
fn exposure_evidence_table(windows: &BTreeMap<String, ExposureWindow>) -> Result<DataFrame> {
    let subjects: Vec<String> = windows.keys().cloned().collect();
    let ends: Vec<Option<String>> = windows
        .values()
        .map(|window| window.end.map(|end| format_datetime(end.value)))
        .collect();
    Ok(DataFrame::new(vec![
        text_column("USUBJID", subjects),
        optional_text_column("TRTEDTM", ends),
    ])?)
}
