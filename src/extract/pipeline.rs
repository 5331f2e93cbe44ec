use std::fmt;

use anyhow::Result;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::checks::answer_distribution;
use super::pages::{SourceDocument, join_pages, remove_running_edges};
use super::parse::BlockParser;
use super::section::{SectionLocator, check_numbering};
use super::split::BlockSplitter;
use crate::error::ExtractError;
use crate::model::{Question, QuestionSource};
use crate::profile::ExtractionProfile;
use crate::util::slug;

const MIN_QUESTIONS_FOR_DISTRIBUTION_CHECK: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    Opened,
    SectionLocated,
    Parsed,
    Validated,
    Done,
}

impl ExtractionStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::SectionLocated => "section_located",
            Self::Parsed => "parsed",
            Self::Validated => "validated",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperMetadata {
    pub exam: String,
    pub year: u32,
    pub paper: String,
}

impl PaperMetadata {
    /// `<exam-slug>_<year>_<paper-slug>`, shared by every question of a run.
    pub fn batch_id(&self) -> String {
        format!("{}_{}_{}", slug(&self.exam), self.year, slug(&self.paper))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub name: String,
    pub blocks: usize,
    pub questions: usize,
    pub incomplete_blocks: usize,
}

#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    pub file_name: String,
    pub stage: ExtractionStage,
    pub questions: Vec<Question>,
    pub sections: Vec<SectionSummary>,
    pub warnings: Vec<String>,
    pub header_lines_removed: usize,
    pub footer_lines_removed: usize,
}

impl DocumentExtraction {
    pub fn review_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|question| question.needs_image_review)
            .count()
    }

    pub fn incomplete_count(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.incomplete_blocks)
            .sum()
    }
}

/// A document-level abort together with the stage it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file_name}: {error} (stage {stage})")]
pub struct StageFailure {
    pub file_name: String,
    pub stage: ExtractionStage,
    pub error: ExtractError,
}

/// Locate, split, parse and validate every configured section of a document.
#[derive(Debug)]
pub struct QuestionExtractor {
    profile: ExtractionProfile,
    locator: SectionLocator,
    splitter: BlockSplitter,
    parser: BlockParser,
}

impl QuestionExtractor {
    pub fn new(profile: ExtractionProfile) -> Result<Self> {
        let locator = SectionLocator::new(&profile)?;
        let splitter = BlockSplitter::new(profile.question_marker, profile.max_question_number)?;
        let parser = BlockParser::new(&profile)?;
        Ok(Self {
            profile,
            locator,
            splitter,
            parser,
        })
    }

    /// Every question is stamped with `batch_id`, which may be shared by several
    /// documents of one run.
    pub fn extract(
        &self,
        document: &SourceDocument,
        paper: &PaperMetadata,
        batch_id: &str,
    ) -> Result<DocumentExtraction, StageFailure> {
        let mut pages = document.pages.clone();
        let cleanup = remove_running_edges(&mut pages, &self.profile.known_headers());
        let full_text = join_pages(&pages);

        debug!(
            file = %document.file_name,
            pages = pages.len(),
            headers_removed = cleanup.header_lines_removed,
            footers_removed = cleanup.footer_lines_removed,
            "cleaned document pages"
        );

        let mut located = Vec::with_capacity(self.profile.sections.len());
        for (index, spec) in self.profile.sections.iter().enumerate() {
            let section = self
                .locator
                .locate(&full_text, index)
                .map_err(|error| StageFailure {
                    file_name: document.file_name.clone(),
                    stage: ExtractionStage::SectionLocated,
                    error,
                })?;
            if let Some((first, last)) = spec.page_hint {
                debug!(
                    section = %spec.name,
                    first_page = first,
                    last_page = last,
                    "section page hint"
                );
            }
            located.push(section);
        }

        let mut extraction = DocumentExtraction {
            file_name: document.file_name.clone(),
            stage: ExtractionStage::SectionLocated,
            questions: Vec::new(),
            sections: Vec::with_capacity(located.len()),
            warnings: Vec::new(),
            header_lines_removed: cleanup.header_lines_removed,
            footer_lines_removed: cleanup.footer_lines_removed,
        };

        for (spec, section) in self.profile.sections.iter().zip(&located) {
            let blocks = self.splitter.split(section.slice(&full_text));
            let numbers = blocks.iter().map(|block| block.number).collect::<Vec<u32>>();
            if let Err(gap) = check_numbering(&section.name, &numbers, spec.expected_questions) {
                warn!(file = %document.file_name, "{gap}");
                extraction.warnings.push(gap.to_string());
            }

            let mut summary = SectionSummary {
                name: section.name.clone(),
                blocks: blocks.len(),
                questions: 0,
                incomplete_blocks: 0,
            };

            for block in &blocks {
                match self.parser.parse(block) {
                    Ok(parsed) => {
                        for message in parsed.warnings {
                            warn!(file = %document.file_name, section = %section.name, "{message}");
                            extraction.warnings.push(message);
                        }
                        let source = QuestionSource {
                            exam: paper.exam.clone(),
                            year: paper.year,
                            paper: paper.paper.clone(),
                            section: section.name.clone(),
                            question_number: parsed.number,
                            file_name: document.file_name.clone(),
                        };
                        extraction.questions.push(Question::new(
                            parsed.content,
                            source,
                            parsed.needs_image_review,
                            batch_id,
                        ));
                        summary.questions += 1;
                    }
                    Err(error) => {
                        warn!(file = %document.file_name, section = %section.name, "{error}");
                        summary.incomplete_blocks += 1;
                    }
                }
            }

            extraction.sections.push(summary);
        }
        extraction.stage = ExtractionStage::Parsed;

        self.validate(&mut extraction);
        extraction.stage = ExtractionStage::Validated;

        info!(
            file = %document.file_name,
            batch = %batch_id,
            questions = extraction.questions.len(),
            needs_review = extraction.review_count(),
            incomplete = extraction.incomplete_count(),
            "extracted document"
        );
        extraction.stage = ExtractionStage::Done;
        Ok(extraction)
    }

    fn validate(&self, extraction: &mut DocumentExtraction) {
        for (spec, summary) in self.profile.sections.iter().zip(&extraction.sections) {
            if summary.questions != spec.expected_questions {
                let mismatch = ExtractError::CountMismatch {
                    section: spec.name.clone(),
                    expected: spec.expected_questions,
                    found: summary.questions,
                };
                warn!(file = %extraction.file_name, "{mismatch}");
                extraction.warnings.push(mismatch.to_string());
            }

            let section_questions = extraction
                .questions
                .iter()
                .filter(|question| question.source.section == spec.name)
                .cloned()
                .collect::<Vec<Question>>();
            if section_questions.len() < MIN_QUESTIONS_FOR_DISTRIBUTION_CHECK {
                continue;
            }
            let distribution = answer_distribution(&section_questions);
            if let Some((option_id, _)) = distribution
                .iter()
                .find(|(_, count)| **count == section_questions.len())
            {
                let message = format!(
                    "section '{}': every answer is {}, check the answer detection",
                    spec.name, option_id
                );
                warn!(file = %extraction.file_name, "{message}");
                extraction.warnings.push(message);
            }
        }
    }
}
