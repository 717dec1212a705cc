//! Terminal tables for run summaries.

use std::path::PathBuf;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use adam_core::ae_summary::arm_header;
use adam_core::{AeSummary, EvidenceSource, QueryPlan, QueryResult, SourceRanking, ValidityRule};

use crate::types::StudyResult;

pub fn print_summary(result: &StudyResult) {
    println!("Study: {}", result.study_id);
    if result.dry_run {
        println!("Output: (dry run)");
    } else {
        println!("Output: {}", result.output_dir.display());
    }
    println!("{}", dataset_table(result));
    if result
        .datasets
        .iter()
        .any(|dataset| !dataset.report.sources.is_empty())
    {
        println!();
        println!("Input sources:");
        println!("{}", source_table(result));
    }
    if let Some(summary) = &result.ae_summary {
        println!();
        println!("Treatment-emergent adverse events:");
        println!("{}", ae_summary_table(summary));
        if let Some(path) = &result.ae_summary_csv {
            println!("AE summary: {}", path.display());
        }
    }
}

pub fn dataset_table(result: &StudyResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Dataset"),
        header_cell("Description"),
        header_cell("Records"),
        header_cell("CSV"),
        header_cell("XPT"),
        header_cell("Defects"),
        header_cell("Unresolved"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Center);
    align_column(&mut table, 5, CellAlignment::Right);
    align_column(&mut table, 6, CellAlignment::Right);
    let mut total_records = 0usize;
    for dataset in &result.datasets {
        total_records += dataset.records;
        table.add_row(vec![
            Cell::new(&dataset.name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&dataset.label),
            Cell::new(dataset.records),
            output_cell(dataset.outputs.csv.as_ref()),
            output_cell(dataset.outputs.xpt.as_ref()),
            count_cell(dataset.report.defect_count(), Color::Yellow),
            count_cell(dataset.report.unresolved_subjects, Color::Yellow),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new("All datasets")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_records).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        count_cell(result.defect_count(), Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    table
}

/// Extraction counts of every source read during the run.
pub fn source_table(result: &StudyResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Dataset"),
        header_cell("Source"),
        header_cell("Rows"),
        header_cell("Used"),
        header_cell("Filtered"),
        header_cell("Defects"),
    ]);
    apply_table_style(&mut table);
    for column in 2..6 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    for dataset in &result.datasets {
        for source in &dataset.report.sources {
            table.add_row(vec![
                Cell::new(&dataset.name),
                Cell::new(&source.source)
                    .fg(Color::Blue)
                    .add_attribute(Attribute::Bold),
                Cell::new(source.rows),
                Cell::new(source.emitted),
                count_cell(source.filtered, Color::DarkYellow),
                count_cell(source.defects, Color::Yellow),
            ]);
        }
    }
    table
}

pub fn ae_summary_table(summary: &AeSummary) -> Table {
    let mut table = Table::new();
    let mut header = vec![header_cell("System Organ Class"), header_cell("Preferred Term")];
    header.extend(summary.arms.iter().map(|arm| header_cell(&arm_header(arm))));
    table.set_header(header);
    apply_table_style(&mut table);
    for column in 2..2 + summary.arms.len() {
        align_column(&mut table, column, CellAlignment::Right);
    }
    for (idx, row) in summary.rows.iter().enumerate() {
        let mut cells = if idx == 0 {
            vec![
                Cell::new(&row.soc).add_attribute(Attribute::Bold),
                dim_cell("-"),
            ]
        } else {
            vec![Cell::new(&row.soc), Cell::new(&row.term)]
        };
        cells.extend((0..summary.arms.len()).map(|arm| Cell::new(summary.cell(row, arm))));
        table.add_row(cells);
    }
    table
}

/// Declared evidence sources in tie-break order.
pub fn evidence_sources_table(sources: &[EvidenceSource], ranking: &SourceRanking) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Rank"),
        header_cell("Source"),
        header_cell("Date"),
        header_cell("Sequence"),
        header_cell("Min precision"),
        header_cell("Rule"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    let mut ordered: Vec<&EvidenceSource> = sources.iter().collect();
    ordered.sort_by_key(|source| ranking.rank(&source.tag));
    for source in ordered {
        table.add_row(vec![
            Cell::new(ranking.rank(&source.tag) + 1),
            Cell::new(&source.tag)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&source.date_column),
            match &source.sequence_column {
                Some(column) => Cell::new(column),
                None => dim_cell("row order"),
            },
            Cell::new(source.min_precision),
            Cell::new(describe_rule(&source.rule)),
        ]);
    }
    table
}

pub fn describe_rule(rule: &ValidityRule) -> String {
    match rule {
        ValidityRule::Always => "any dated row".to_string(),
        ValidityRule::DateShape => "date reaches minimum precision".to_string(),
        ValidityRule::NotBothMissing { first, second } => {
            format!("{first} or {second} present")
        }
        ValidityRule::ValidDose {
            dose,
            placebo_markers,
            ..
        } => format!("{dose} > 0, or 0 on {}", placebo_markers.join("/")),
        ValidityRule::All(rules) => rules
            .iter()
            .map(describe_rule)
            .collect::<Vec<_>>()
            .join("; "),
    }
}

pub fn print_query(plan: &QueryPlan, result: &QueryResult) {
    println!(
        "Filter: {} matches '{}'",
        plan.target_column, plan.filter_value
    );
    println!("Subjects: {}", result.count);
    if result.subjects.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("USUBJID")]);
    apply_table_style(&mut table);
    for subject in &result.subjects {
        table.add_row(vec![Cell::new(subject)]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn output_cell(path: Option<&PathBuf>) -> Cell {
    match path {
        Some(_) => Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use adam_core::evidence::last_alive_sources;
    use adam_model::EvidenceConfig;

    use super::*;

    #[test]
    fn sources_table_follows_priority() {
        let config = EvidenceConfig {
            priority: vec!["DS".to_string()],
            ..EvidenceConfig::default()
        };
        let sources = last_alive_sources(&config);
        let ranking = SourceRanking::new(&config.priority, &sources).unwrap();
        let mut table = evidence_sources_table(&sources, &ranking);
        table
            .force_no_tty()
            .set_content_arrangement(ContentArrangement::Disabled);
        let rendered = table.to_string();
        let ds = rendered.find("DSSTDTC").unwrap();
        let vs = rendered.find("VSDTC").unwrap();
        assert!(ds < vs);
        assert!(rendered.contains("VSSTRESN or VSSTRESC present"));
        assert!(rendered.contains("row order"));
    }

    #[test]
    fn rules_read_as_text() {
        let rule = ValidityRule::ValidDose {
            dose: "EXDOSE".to_string(),
            treatment: "EXTRT".to_string(),
            placebo_markers: vec!["PLACEBO".to_string()],
        };
        assert_eq!(describe_rule(&rule), "EXDOSE > 0, or 0 on PLACEBO");
    }
}
