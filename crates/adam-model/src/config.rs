//! Derivation options, optionally loaded from a TOML file.
//!
//! Every section and field has a default, so an empty file (or no file at all)
//! reproduces the standard derivation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::date::DatePrecision;
use crate::error::{ModelError, Result};
use crate::processing::OutputFormat;

/// Header timestamp written into transport files unless overridden.
pub const DEFAULT_XPT_TIMESTAMP: &str = "01JAN70:00:00:00";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivationConfig {
    /// Overrides STUDYID when the inputs do not carry one.
    pub study_id: Option<String>,
    pub evidence: EvidenceConfig,
    pub exposure: ExposureConfig,
    pub ds: DsConfig,
    pub output: OutputConfig,
}

impl DerivationConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::io(path, source))?;
        Self::from_toml_str(&text).map_err(|source| ModelError::Config {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Last-known-alive evidence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvidenceConfig {
    /// Source tags in tie-break order; earlier wins when dates tie.
    /// Tags not listed rank after all listed ones, in declaration order.
    pub priority: Vec<String>,
    /// Per-source minimum date completeness, keyed by source tag.
    pub min_precision: BTreeMap<String, DatePrecision>,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            priority: ["VS", "AE", "DS", "ADSL"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_precision: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExposureConfig {
    /// Treatment-label fragments that make a zero dose valid.
    pub placebo_markers: Vec<String>,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            placebo_markers: vec!["PLACEBO".to_string()],
        }
    }
}

/// Raw disposition column names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DsRawColumns {
    pub study: String,
    pub patient: String,
    pub instance: String,
    pub term: String,
    pub decode: String,
    pub other_specify: String,
    pub collection_date: String,
    pub collection_time: String,
    pub start_date: String,
}

impl Default for DsRawColumns {
    fn default() -> Self {
        Self {
            study: "STUDY".to_string(),
            patient: "PATNUM".to_string(),
            instance: "INSTANCE".to_string(),
            term: "IT.DSTERM".to_string(),
            decode: "IT.DSDECOD".to_string(),
            other_specify: "OTHERSP".to_string(),
            collection_date: "DSDTCOL".to_string(),
            collection_time: "DSTMCOL".to_string(),
            start_date: "IT.DSSTDAT".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VisitMapping {
    pub raw: String,
    pub visit: String,
    pub visitnum: Option<f64>,
}

impl VisitMapping {
    fn new(raw: &str, visit: &str, visitnum: f64) -> Self {
        Self {
            raw: raw.to_string(),
            visit: visit.to_string(),
            visitnum: Some(visitnum),
        }
    }
}

/// Disposition domain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DsConfig {
    /// Prepended to the patient number to form USUBJID. Without it USUBJID is
    /// `STUDYID-PATNUM`.
    pub subject_prefix: Option<String>,
    /// chrono formats tried in order for raw dates.
    pub date_formats: Vec<String>,
    /// chrono formats tried in order for raw collection times.
    pub time_formats: Vec<String>,
    pub visits: Vec<VisitMapping>,
    /// Collected decode (upper-cased) to standard decode.
    pub decodes: BTreeMap<String, String>,
    pub columns: DsRawColumns,
}

impl Default for DsConfig {
    fn default() -> Self {
        Self {
            subject_prefix: None,
            date_formats: ["%m-%d-%Y", "%Y-%m-%d", "%d-%b-%Y"]
                .into_iter()
                .map(String::from)
                .collect(),
            time_formats: ["%H:%M", "%H:%M:%S"]
                .into_iter()
                .map(String::from)
                .collect(),
            visits: vec![
                VisitMapping::new("Screening 1", "SCREENING 1", 1.0),
                VisitMapping::new("Screening 2", "SCREENING 2", 2.0),
                VisitMapping::new("Baseline", "BASELINE", 3.0),
                VisitMapping::new("Week 2", "WEEK 2", 4.0),
                VisitMapping::new("Week 4", "WEEK 4", 5.0),
                VisitMapping::new("Week 6", "WEEK 6", 7.0),
                VisitMapping::new("Week 8", "WEEK 8", 8.0),
                VisitMapping::new("Week 12", "WEEK 12", 9.0),
                VisitMapping::new("Week 16", "WEEK 16", 10.0),
                VisitMapping::new("Week 20", "WEEK 20", 11.0),
                VisitMapping::new("Week 24", "WEEK 24", 12.0),
                VisitMapping::new("Week 26", "WEEK 26", 13.0),
                VisitMapping::new("Retrieval", "RETRIEVAL", 201.0),
            ],
            decodes: [
                ("WITHDREW CONSENT", "WITHDRAWAL BY SUBJECT"),
                ("LOST TO FOLLOW UP", "LOST TO FOLLOW-UP"),
                ("SPONSOR DECISION", "STUDY TERMINATED BY SPONSOR"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            columns: DsRawColumns::default(),
        }
    }
}

impl DsConfig {
    /// Case-insensitive visit lookup.
    pub fn visit(&self, raw: &str) -> Option<&VisitMapping> {
        let raw = raw.trim();
        self.visits
            .iter()
            .find(|mapping| mapping.raw.trim().eq_ignore_ascii_case(raw))
    }

    /// Standard decode for a collected value, upper-cased when unmapped.
    pub fn decode(&self, raw: &str) -> String {
        let key = raw.trim().to_uppercase();
        self.decodes
            .iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(&key))
            .map_or(key, |(_, v)| v.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub formats: Vec<OutputFormat>,
    /// `ddMMMyy:hh:mm:ss` stamp for transport headers.
    pub xpt_timestamp: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            formats: vec![OutputFormat::Csv, OutputFormat::Xpt],
            xpt_timestamp: DEFAULT_XPT_TIMESTAMP.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = DerivationConfig::from_toml_str("").unwrap();
        assert_eq!(config.evidence.priority, vec!["VS", "AE", "DS", "ADSL"]);
        assert_eq!(config.exposure.placebo_markers, vec!["PLACEBO"]);
        assert_eq!(config.output.xpt_timestamp, DEFAULT_XPT_TIMESTAMP);
        assert_eq!(config.ds.columns.patient, "PATNUM");
    }

    #[test]
    fn sections_override_individually() {
        let config = DerivationConfig::from_toml_str(
            r#"
            study_id = "CDISCPILOT01"

            [evidence]
            priority = ["DS", "VS"]
            min_precision = { AE = "month" }

            [output]
            formats = ["csv"]
            "#,
        )
        .unwrap();
        assert_eq!(config.study_id.as_deref(), Some("CDISCPILOT01"));
        assert_eq!(config.evidence.priority, vec!["DS", "VS"]);
        assert_eq!(
            config.evidence.min_precision.get("AE"),
            Some(&DatePrecision::Month)
        );
        assert_eq!(config.output.formats, vec![OutputFormat::Csv]);
        assert_eq!(config.ds.date_formats.len(), 3);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(DerivationConfig::from_toml_str("[evidence]\npriorty = []\n").is_err());
    }

    #[test]
    fn visit_and_decode_lookups() {
        let ds = DsConfig::default();
        let visit = ds.visit(" baseline ").unwrap();
        assert_eq!(visit.visit, "BASELINE");
        assert_eq!(visit.visitnum, Some(3.0));
        assert!(ds.visit("Week 99").is_none());
        assert_eq!(ds.decode("Withdrew Consent"), "WITHDRAWAL BY SUBJECT");
        assert_eq!(ds.decode("Completed"), "COMPLETED");
    }

    #[test]
    fn load_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("derive.toml");
        std::fs::write(&path, "study_id = 3\n").unwrap();
        let err = DerivationConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("derive.toml"));
    }
}
