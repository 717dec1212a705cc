//! Natural-language subject lookup over adverse events.
//!
//! A question such as "which subjects had a severe headache?" is mapped to a
//! single filter (column and value) over ADAE, then executed to list the
//! matching subjects. Mapping is keyword based and deterministic.

use std::collections::HashSet;
use std::sync::LazyLock;

use polars::prelude::DataFrame;
use regex::Regex;
use tracing::debug;

use crate::error::Result;
use crate::frame::TableView;

pub const QUERY_TABLE: &str = "ADAE";
pub const SUBJECT_COLUMN: &str = "USUBJID";
const DEFAULT_COLUMN: &str = "AETERM";
const MAX_VALUES: usize = 5000;

/// Filterable columns with the descriptions used for keyword matching, in
/// tie-break order.
pub const QUERY_COLUMNS: &[(&str, &str)] = &[
    ("AETERM", "Adverse event term (e.g., Headache, Fatigue)"),
    (
        "AESOC",
        "Body system / System Organ Class (e.g., Skin, Cardiac, Eye disorders)",
    ),
    ("AESEV", "Severity / intensity (e.g., MILD, MODERATE, SEVERE)"),
    ("AEDECOD", "Dictionary-derived term (coded)"),
];

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("Invalid token regex"));
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9]+").expect("Invalid word regex"));
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("Invalid quote regex"));
static SUBJECT_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(usubjid|subject id)\b").expect("Invalid subject mention regex")
});

/// One column filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub target_column: String,
    pub filter_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub count: usize,
    /// Unique subjects in first-seen order.
    pub subjects: Vec<String>,
}

fn tokens(text: &str) -> HashSet<&str> {
    TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Column whose name and description best overlap the question.
pub fn choose_column(question: &str) -> &'static str {
    let question = question.to_lowercase();
    let question_tokens = tokens(&question);
    let mut best = DEFAULT_COLUMN;
    let mut best_score = -1i64;
    for &(column, description) in QUERY_COLUMNS {
        let haystack = format!("{column} {description}").to_lowercase();
        let overlap = tokens(&haystack).intersection(&question_tokens).count() as i64;
        let bonus = if question.contains(&column.to_lowercase()) { 2 } else { 0 };
        let score = overlap + bonus;
        if score > best_score {
            best = column;
            best_score = score;
        }
    }
    best
}

/// Distinct non-empty values in first-seen order.
fn distinct_values(values: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(String::as_str)
        .filter(|value| !value.is_empty() && seen.insert(*value))
        .collect()
}

/// Filter value for `question` given the candidate values of the chosen
/// column: the longest value named in the question, else a quoted phrase,
/// else the last three words.
pub fn choose_value(question: &str, values: &[String]) -> String {
    let lowered = question.to_lowercase();
    let mut candidates = distinct_values(values);
    candidates.sort_by_key(|value| std::cmp::Reverse(value.len()));
    candidates.truncate(MAX_VALUES);
    if let Some(found) = candidates
        .iter()
        .find(|value| lowered.contains(&value.to_lowercase()))
    {
        return (*found).to_string();
    }
    if let Some(quoted) = QUOTED.captures(question).and_then(|c| c.get(1)) {
        return quoted.as_str().to_string();
    }
    let words: Vec<&str> = WORD.find_iter(question).map(|m| m.as_str()).collect();
    words[words.len().saturating_sub(3)..].join(" ")
}

/// Maps a column name proposed for `question` onto a filterable column.
/// The subject column is only accepted when the question names it.
pub fn normalize_column(column: &str, question: &str) -> String {
    let upper = column.trim().to_uppercase();
    if upper == SUBJECT_COLUMN {
        if SUBJECT_MENTION.is_match(question) {
            return upper;
        }
        return DEFAULT_COLUMN.to_string();
    }
    if QUERY_COLUMNS.iter().any(|(name, _)| *name == upper) {
        upper
    } else {
        DEFAULT_COLUMN.to_string()
    }
}

/// Builds the filter for `question` against `adae`.
pub fn parse_question(question: &str, adae: &DataFrame) -> Result<QueryPlan> {
    let view = TableView::new(QUERY_TABLE, adae);
    let column = normalize_column(choose_column(question), question);
    let values = view.texts_or_empty(&column)?;
    let plan = QueryPlan {
        filter_value: choose_value(question, &values),
        target_column: column,
    };
    debug!(column = %plan.target_column, "mapped question to filter");
    Ok(plan)
}

/// Subjects matching `plan`: case-insensitive equality when the value occurs
/// in the column, otherwise case-insensitive substring match.
pub fn execute(adae: &DataFrame, plan: &QueryPlan) -> Result<QueryResult> {
    let view = TableView::new(QUERY_TABLE, adae);
    view.require(&[SUBJECT_COLUMN, plan.target_column.as_str()])?;
    let subjects = view.texts(SUBJECT_COLUMN)?;
    let values = view.texts(&plan.target_column)?;

    let needle = plan.filter_value.to_lowercase();
    let lowered: Vec<Option<String>> = values
        .iter()
        .map(|value| (!value.is_empty()).then(|| value.to_lowercase()))
        .collect();
    let exact = lowered.iter().flatten().any(|value| *value == needle);

    let mut seen = HashSet::new();
    let mut matched = Vec::new();
    for (subject, value) in subjects.iter().zip(&lowered) {
        let Some(value) = value else {
            continue;
        };
        let hit = if exact {
            *value == needle
        } else {
            value.contains(&needle)
        };
        if hit && !subject.is_empty() && seen.insert(subject.as_str()) {
            matched.push(subject.clone());
        }
    }
    Ok(QueryResult {
        count: matched.len(),
        subjects: matched,
    })
}

#[cfg(test)]
mod tests {
    use polars::prelude::*;

    use super::*;

    fn adae() -> DataFrame {
        DataFrame::new(vec![
            Column::new("USUBJID".into(), ["S1", "S2", "S2", "S3", "S4"]),
            Column::new(
                "AETERM".into(),
                [Some("Headache"), Some("Fatigue"), Some("HEADACHE"), None, Some("Rash")],
            ),
            Column::new(
                "AESOC".into(),
                [
                    "Nervous system disorders",
                    "General disorders",
                    "Nervous system disorders",
                    "Skin",
                    "Skin",
                ],
            ),
            Column::new("AESEV".into(), ["MILD", "SEVERE", "MODERATE", "SEVERE", "MILD"]),
            Column::new(
                "AEDECOD".into(),
                ["HEADACHE", "FATIGUE", "HEADACHE", "PRURITUS", "RASH"],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn chooses_column_by_keyword_overlap() {
        assert_eq!(choose_column("Subjects with the adverse event Headache"), "AETERM");
        assert_eq!(choose_column("Which subjects had severe events?"), "AESEV");
        assert_eq!(choose_column("List subjects by severity MILD"), "AESEV");
        assert_eq!(choose_column("Show the aesev of moderate"), "AESEV");
        assert_eq!(choose_column("Any cardiac body system issues?"), "AESOC");
        assert_eq!(choose_column(""), "AETERM");
    }

    #[test]
    fn prefers_longest_value_in_question() {
        let values = vec!["Skin".to_string(), "Skin disorders".to_string()];
        assert_eq!(choose_value("subjects with skin disorders", &values), "Skin disorders");
        assert_eq!(choose_value(r#"find "Eye pain" please"#, &[]), "Eye pain");
        assert_eq!(choose_value("who had a bad night", &[]), "a bad night");
    }

    #[test]
    fn exact_match_when_value_exists() {
        let plan = QueryPlan {
            target_column: "AETERM".to_string(),
            filter_value: "headache".to_string(),
        };
        let result = execute(&adae(), &plan).unwrap();
        assert_eq!(result.subjects, ["S1", "S2"]);
        assert_eq!(result.count, 2);
    }

    #[test]
    fn substring_match_otherwise() {
        let plan = QueryPlan {
            target_column: "AESOC".to_string(),
            filter_value: "nervous".to_string(),
        };
        let result = execute(&adae(), &plan).unwrap();
        assert_eq!(result.subjects, ["S1", "S2"]);
    }

    #[test]
    fn question_round_trip() {
        let plan = parse_question("Which subjects had Headache?", &adae()).unwrap();
        assert_eq!(plan.target_column, "AETERM");
        assert_eq!(plan.filter_value, "Headache");
        assert_eq!(execute(&adae(), &plan).unwrap().count, 2);
    }

    #[test]
    fn subject_column_requires_explicit_mention() {
        assert_eq!(normalize_column("usubjid", "which subjects had rash"), "AETERM");
        assert_eq!(normalize_column("USUBJID", "give me the subject id list"), "USUBJID");
        assert_eq!(normalize_column("AEOUT", "anything"), "AETERM");
        assert_eq!(normalize_column("aesev", "anything"), "AESEV");
    }
}
