use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cli::ExtractArgs;
use crate::extract::{ExtractionStage, PaperMetadata, QuestionExtractor, SourceDocument};
use crate::model::{
    DocumentOutcome, DocumentStatus, ExtractionBatch, ExtractionCounts, ExtractionReport,
};
use crate::profile::ExtractionProfile;
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let profile = ExtractionProfile::from_args(&args.profile)?;
    let profile_name = profile.name.clone();
    let extractor = QuestionExtractor::new(profile)?;

    let paper = PaperMetadata {
        exam: args.exam.clone(),
        year: args.year,
        paper: args.paper.clone(),
    };
    let batch_id = paper.batch_id();

    info!(
        input = %args.input.display(),
        run_id = %run_id,
        batch = %batch_id,
        profile = %profile_name,
        "starting extraction"
    );

    let document = SourceDocument::open(&args.input).with_context(|| {
        format!(
            "{} failed at stage {}",
            args.input.display(),
            ExtractionStage::Opened
        )
    })?;
    let sha256 = sha256_file(&args.input)?;
    let extraction = extractor.extract(&document, &paper, &batch_id)?;

    debug!(
        stage = %extraction.stage,
        headers_removed = extraction.header_lines_removed,
        footers_removed = extraction.footer_lines_removed,
        "document extracted"
    );
    for section in &extraction.sections {
        info!(
            section = %section.name,
            blocks = section.blocks,
            questions = section.questions,
            incomplete = section.incomplete_blocks,
            "section summary"
        );
    }

    if extraction.questions.is_empty() {
        bail!(
            "no questions extracted from {} ({} incomplete blocks)",
            args.input.display(),
            extraction.incomplete_count()
        );
    }

    let outcome = DocumentOutcome {
        file_name: extraction.file_name.clone(),
        sha256: Some(sha256),
        status: DocumentStatus::Succeeded,
        paper: Some(paper.paper.clone()),
        questions: extraction.questions.len(),
        needs_review: extraction.review_count(),
        incomplete_blocks: extraction.incomplete_count(),
        message: None,
    };

    let mut batch = ExtractionBatch::new(batch_id.clone());
    batch.extend(extraction.questions);
    batch.write_json(&args.output)?;

    info!(
        path = %args.output.display(),
        questions = batch.questions.len(),
        clean = batch.clean_count(),
        needs_review = batch.review_count(),
        "wrote extraction batch"
    );
    if batch.review_count() > 0 {
        warn!(
            needs_review = batch.review_count(),
            "some questions need an image or manual review before use"
        );
    }

    if let Some(report_path) = &args.report_path {
        let documents = vec![outcome];
        let report = ExtractionReport {
            manifest_version: 1,
            run_id,
            batch_id,
            profile: profile_name,
            started_at,
            updated_at: now_utc_string(),
            command: "extract".to_string(),
            output_path: args.output.display().to_string(),
            counts: ExtractionCounts::from_outcomes(&documents),
            documents,
            warnings: extraction.warnings,
        };
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote extraction report");
    }

    Ok(())
}
