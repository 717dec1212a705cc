//! Evidence reducer.
//!
//! Per subject the candidate with the greatest key wins, comparing in order:
//! imputed date, date precision, source rank (lower is better), sequence,
//! row position, variable name. The key is total, so the result does not
//! depend on the order candidates arrive in.

use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;

use adam_model::DatePrecision;
use chrono::NaiveDate;

use crate::evidence::Candidate;
use crate::evidence::source::SourceRanking;

/// The winning candidate for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub precision: DatePrecision,
    pub source: String,
    pub variable: String,
    pub sequence: Option<i64>,
}

impl From<&Candidate> for ResolvedDate {
    fn from(candidate: &Candidate) -> Self {
        Self {
            date: candidate.date,
            precision: candidate.precision,
            source: candidate.source.clone(),
            variable: candidate.variable.clone(),
            sequence: candidate.sequence,
        }
    }
}

type CandidateKey<'a> = (
    NaiveDate,
    DatePrecision,
    Reverse<usize>,
    Option<i64>,
    usize,
    &'a str,
);

fn key<'a>(candidate: &'a Candidate, ranking: &SourceRanking) -> CandidateKey<'a> {
    (
        candidate.date,
        candidate.precision,
        Reverse(ranking.rank(&candidate.source)),
        candidate.sequence,
        candidate.row,
        candidate.variable.as_str(),
    )
}

pub fn compare(a: &Candidate, b: &Candidate, ranking: &SourceRanking) -> Ordering {
    key(a, ranking).cmp(&key(b, ranking))
}

/// Reduces candidates from all sources to one resolved date per subject.
/// Subjects without candidates are absent from the result.
pub fn reduce<'a, I>(candidates: I, ranking: &SourceRanking) -> BTreeMap<String, ResolvedDate>
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let mut best: BTreeMap<&str, &Candidate> = BTreeMap::new();
    for candidate in candidates {
        best.entry(candidate.subject.as_str())
            .and_modify(|current| {
                if compare(candidate, *current, ranking) == Ordering::Greater {
                    *current = candidate;
                }
            })
            .or_insert(candidate);
    }
    best.into_iter()
        .map(|(subject, candidate)| (subject.to_string(), ResolvedDate::from(candidate)))
        .collect()
}
