pub mod config;
pub mod dataset;
pub mod date;
pub mod error;
pub mod processing;
pub mod report;

pub use config::{
    DEFAULT_XPT_TIMESTAMP, DerivationConfig, DsConfig, DsRawColumns, EvidenceConfig,
    ExposureConfig, OutputConfig, VisitMapping,
};
pub use dataset::{DatasetSpec, Variable, VariableType};
pub use date::{DatePrecision, TimeImputationFlag};
pub use error::{ModelError, Result};
pub use processing::{OutputFormat, OutputPaths};
pub use report::{DefectKind, DerivationReport, RowDefect, SourceSummary};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_precision_orders_by_completeness() {
        assert!(DatePrecision::Day > DatePrecision::Month);
        assert!(DatePrecision::Month > DatePrecision::Year);
        assert_eq!(DatePrecision::Month.to_string(), "month");
    }

    #[test]
    fn report_serializes_defects() {
        let mut report = DerivationReport::new("ADSL");
        report.defects.push(RowDefect {
            source: "VS".to_string(),
            row: 4,
            subject: Some("01-701-1015".to_string()),
            kind: DefectKind::UnparsableDate {
                column: "VSDTC".to_string(),
                value: "2014-02-30".to_string(),
            },
        });
        assert!(report.has_defects());
        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["defects"][0]["kind"]["kind"], "unparsable_date");
        assert_eq!(
            report.defects[0].kind.to_string(),
            "VSDTC value '2014-02-30' is not a valid date"
        );
    }

    #[test]
    fn dataset_spec_lookup_is_case_insensitive() {
        let spec = DatasetSpec::new(
            "ADSL",
            "Subject-Level Analysis Dataset",
            vec![Variable::char("USUBJID", "Unique Subject Identifier")],
        );
        assert!(spec.variable("usubjid").is_some());
        assert_eq!(spec.file_stem(), "adsl");
        assert_eq!(TimeImputationFlag::Hour.code(), "H");
    }
}
