use anyhow::{Context, Result};
use tracing::{debug, info};

use adam_cli::logging::redact_value;
use adam_cli::pipeline::{StudyOptions, load_config, run_query, run_study};
use adam_cli::summary::{evidence_sources_table, print_query};
use adam_cli::types::StudyResult;
use adam_core::SourceRanking;
use adam_core::evidence::{check_min_precision, last_alive_sources};

use crate::cli::{QueryArgs, SourcesArgs, StudyArgs};

pub fn study(args: &StudyArgs, log_data: bool) -> Result<StudyResult> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(format) = args.format {
        config.output.formats = format.formats();
    }
    let options = StudyOptions {
        output_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(|| args.study_folder.join("output")),
        config,
        dry_run: args.dry_run,
        log_data,
        ..StudyOptions::new(&args.study_folder)
    };
    run_study(&options)
}

pub fn query(args: &QueryArgs) -> Result<()> {
    let (plan, result) = run_query(&args.adae, &args.question)?;
    info!(
        column = %plan.target_column,
        matches = result.count,
        "query answered"
    );
    for subject in &result.subjects {
        debug!(subject = redact_value(subject), "matched subject");
    }
    print_query(&plan, &result);
    Ok(())
}

pub fn sources(args: &SourcesArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let sources = last_alive_sources(&config.evidence);
    check_min_precision(&config.evidence, &sources).context("evidence min_precision")?;
    let ranking =
        SourceRanking::new(&config.evidence.priority, &sources).context("evidence priority")?;
    println!("{}", evidence_sources_table(&sources, &ranking));
    Ok(())
}
