use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cli::BatchArgs;
use crate::extract::{
    ExtractionStage, HeaderReader, PaperMetadata, QuestionExtractor, SourceDocument,
    TierClassifier,
};
use crate::model::{
    DocumentOutcome, DocumentStatus, ExtractionBatch, ExtractionCounts, ExtractionReport,
};
use crate::profile::ExtractionProfile;
use crate::util::{
    now_utc_string, sha256_file, truncate_chars, utc_compact_string, write_json_pretty,
};

#[cfg(test)]
mod tests;

const FAILURE_MESSAGE_CHARS: usize = 40;
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "txt"];

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub exam: String,
    pub year: u32,
    pub tier: String,
}

impl BatchOptions {
    fn batch_id(&self) -> String {
        PaperMetadata {
            exam: self.exam.clone(),
            year: self.year,
            paper: self.tier.clone(),
        }
        .batch_id()
    }
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub batch: ExtractionBatch,
    pub documents: Vec<DocumentOutcome>,
    pub warnings: Vec<String>,
}

impl BatchOutcome {
    pub fn counts(&self) -> ExtractionCounts {
        ExtractionCounts::from_outcomes(&self.documents)
    }

    pub fn names_with_status(&self, status: DocumentStatus) -> Vec<&str> {
        self.documents
            .iter()
            .filter(|document| document.status == status)
            .map(|document| document.file_name.as_str())
            .collect()
    }

    /// `"<file>: <message>"` per failed document, message cut to 40 characters.
    pub fn failure_lines(&self) -> Vec<String> {
        self.documents
            .iter()
            .filter(|document| document.status == DocumentStatus::Failed)
            .map(|document| {
                format!(
                    "{}: {}",
                    document.file_name,
                    truncate_chars(
                        document.message.as_deref().unwrap_or_default(),
                        FAILURE_MESSAGE_CHARS
                    )
                )
            })
            .collect()
    }
}

pub fn run(args: BatchArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let profile = ExtractionProfile::from_args(&args.profile)?;
    let profile_name = profile.name.clone();
    let classifier = match (&profile.classifier, args.no_classify) {
        (Some(config), false) => Some(TierClassifier::new(config)?),
        _ => None,
    };
    let extractor = QuestionExtractor::new(profile)?;
    let header_reader = HeaderReader::new()?;
    let options = BatchOptions {
        exam: args.exam.clone(),
        year: args.year,
        tier: args.paper.clone(),
    };

    info!(
        input_dir = %args.input_dir.display(),
        run_id = %run_id,
        batch = %options.batch_id(),
        profile = %profile_name,
        classify = classifier.is_some(),
        "starting batch extraction"
    );

    let outcome = run_batch(
        &args.input_dir,
        &extractor,
        classifier.as_ref(),
        &header_reader,
        &options,
    )?;

    outcome.batch.write_json(&args.output)?;
    log_summary(&outcome);
    info!(path = %args.output.display(), "wrote extraction batch");

    if let Some(report_path) = &args.report_path {
        let report = ExtractionReport {
            manifest_version: 1,
            run_id,
            batch_id: outcome.batch.batch_id.clone(),
            profile: profile_name,
            started_at,
            updated_at: now_utc_string(),
            command: "batch".to_string(),
            output_path: args.output.display().to_string(),
            counts: outcome.counts(),
            documents: outcome.documents,
            warnings: outcome.warnings,
        };
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote batch report");
    }

    Ok(())
}

/// Extracts every document of `input_dir` in file-name order. Per-document
/// failures are recorded and never stop the run.
pub fn run_batch(
    input_dir: &Path,
    extractor: &QuestionExtractor,
    classifier: Option<&TierClassifier>,
    header_reader: &HeaderReader,
    options: &BatchOptions,
) -> Result<BatchOutcome> {
    let mut paths = discover_documents(input_dir)?;
    paths.sort();

    if paths.is_empty() {
        bail!("no .pdf or .txt documents found in {}", input_dir.display());
    }

    let mut outcome = BatchOutcome {
        batch: ExtractionBatch::new(options.batch_id()),
        documents: Vec::with_capacity(paths.len()),
        warnings: Vec::new(),
    };

    for path in paths {
        let document_outcome =
            extract_one(&path, extractor, classifier, header_reader, options, &mut outcome);
        outcome.documents.push(document_outcome);
    }

    Ok(outcome)
}

fn extract_one(
    path: &Path,
    extractor: &QuestionExtractor,
    classifier: Option<&TierClassifier>,
    header_reader: &HeaderReader,
    options: &BatchOptions,
    outcome: &mut BatchOutcome,
) -> DocumentOutcome {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut record = DocumentOutcome {
        file_name: file_name.clone(),
        sha256: None,
        status: DocumentStatus::Failed,
        paper: None,
        questions: 0,
        needs_review: 0,
        incomplete_blocks: 0,
        message: None,
    };

    let opened = sha256_file(path).and_then(|sha256| {
        let document = SourceDocument::open(path)?;
        Ok((sha256, document))
    });
    let (sha256, document) = match opened {
        Ok(opened) => opened,
        Err(error) => {
            warn!(
                file = %file_name,
                stage = %ExtractionStage::Opened,
                error = %error,
                "document failed"
            );
            record.message = Some(format!("{error:#}"));
            return record;
        }
    };
    record.sha256 = Some(sha256);

    if let Some(classifier) = classifier {
        let classification = classifier.classify(document.leading_text());
        if !classification.is_included() {
            info!(file = %file_name, reason = %classification.reason(), "skipping document");
            record.status = DocumentStatus::Skipped;
            record.message = Some(classification.reason());
            return record;
        }
    }

    let header = header_reader.read(document.leading_text());
    debug!(
        file = %file_name,
        exam = %header.exam_name.as_deref().unwrap_or("unknown"),
        date = %header.exam_date.as_deref().unwrap_or("unknown"),
        "read cover page"
    );
    let paper = PaperMetadata {
        exam: options.exam.clone(),
        year: options.year,
        paper: header.paper_label(&options.tier, document.stem()),
    };
    if let Some(year) = header.exam_year.filter(|year| *year != options.year) {
        let message = format!(
            "{file_name}: cover page says {year}, batch is tagged {}",
            options.year
        );
        warn!("{message}");
        outcome.warnings.push(message);
    }
    record.paper = Some(paper.paper.clone());

    let extraction = match extractor.extract(&document, &paper, &outcome.batch.batch_id) {
        Ok(extraction) => extraction,
        Err(failure) => {
            warn!(
                file = %file_name,
                stage = %failure.stage,
                error = %failure.error,
                "document failed"
            );
            record.message = Some(failure.error.to_string());
            return record;
        }
    };

    record.incomplete_blocks = extraction.incomplete_count();
    outcome.warnings.extend(
        extraction
            .warnings
            .iter()
            .map(|warning| format!("{file_name}: {warning}")),
    );

    if extraction.questions.is_empty() {
        warn!(
            file = %file_name,
            incomplete = record.incomplete_blocks,
            "document yielded no questions"
        );
        record.message = Some("no questions extracted".to_string());
        return record;
    }

    record.status = DocumentStatus::Succeeded;
    record.questions = extraction.questions.len();
    record.needs_review = extraction.review_count();
    outcome.batch.extend(extraction.questions);
    record
}

fn discover_documents(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();

    let entries = fs::read_dir(input_dir)
        .with_context(|| format!("failed to read {}", input_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", input_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_document = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                DOCUMENT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false);

        if is_document {
            documents.push(path);
        }
    }

    Ok(documents)
}

fn log_summary(outcome: &BatchOutcome) {
    let counts = outcome.counts();
    info!(
        scanned = counts.scanned,
        skipped = counts.skipped,
        succeeded = counts.succeeded,
        failed = counts.failed,
        questions = counts.questions,
        clean = counts.clean,
        needs_review = counts.needs_review,
        incomplete_blocks = counts.incomplete_blocks,
        "batch extraction complete"
    );

    for name in outcome.names_with_status(DocumentStatus::Skipped) {
        info!(file = %name, "skipped");
    }
    for line in outcome.failure_lines() {
        warn!("failed {line}");
    }
}
