use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::util::write_json_pretty;

pub const QUESTION_IMAGE_PLACEHOLDER: &str = "[IMAGE REQUIRED - Upload question image]";
pub const OPTION_IMAGE_PLACEHOLDER: &str = "[IMAGE OPTION - Upload option image]";
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionStatus {
    #[default]
    Cold,
    Observation,
    Calibration,
    Verified,
}

impl QuestionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cold => "COLD",
            Self::Observation => "OBSERVATION",
            Self::Calibration => "CALIBRATION",
            Self::Verified => "VERIFIED",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpeedCategory {
    Quick,
    #[default]
    Standard,
    Complex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benchmarks {
    pub golden_ms: u64,
    pub shortcut_expected: bool,
    pub brute_force_acceptable: bool,
    pub speed_category: SpeedCategory,
}

impl Default for Benchmarks {
    fn default() -> Self {
        Self {
            golden_ms: 60_000,
            shortcut_expected: false,
            brute_force_acceptable: true,
            speed_category: SpeedCategory::Standard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
    pub inf_tag: Option<String>,
    pub image: Option<String>,
}

impl QuestionOption {
    pub fn id_for(index: usize) -> String {
        format!("opt_{}", index + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionContent {
    pub text: String,
    pub options: Vec<QuestionOption>,
    pub correct_option_id: String,
    pub image: Option<String>,
    #[serde(default)]
    pub has_diagram: bool,
    #[serde(default)]
    pub has_table: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSource {
    pub exam: String,
    pub year: u32,
    pub paper: String,
    pub section: String,
    pub question_number: u32,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub content: QuestionContent,
    pub source: QuestionSource,
    #[serde(default)]
    pub status: QuestionStatus,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub benchmarks: Benchmarks,
    pub p_id: Option<String>,
    #[serde(default)]
    pub needs_image_review: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub import_batch: String,
}

fn default_version() -> u32 {
    1
}

impl Question {
    pub fn new(
        content: QuestionContent,
        source: QuestionSource,
        needs_image_review: bool,
        import_batch: &str,
    ) -> Self {
        Self {
            content,
            source,
            status: QuestionStatus::default(),
            difficulty: Difficulty::default(),
            benchmarks: Benchmarks::default(),
            p_id: None,
            needs_image_review,
            is_verified: false,
            version: default_version(),
            import_batch: import_batch.to_string(),
        }
    }

    pub fn correct_count(&self) -> usize {
        self.content
            .options
            .iter()
            .filter(|option| option.is_correct)
            .count()
    }
}

/// The questions produced by one run, written once as a bare JSON array.
#[derive(Debug, Clone, Default)]
pub struct ExtractionBatch {
    pub batch_id: String,
    pub questions: Vec<Question>,
}

impl ExtractionBatch {
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            questions: Vec::new(),
        }
    }

    pub fn extend(&mut self, questions: Vec<Question>) {
        self.questions.extend(questions);
    }

    pub fn clean_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|question| !question.needs_image_review)
            .count()
    }

    pub fn review_count(&self) -> usize {
        self.questions.len() - self.clean_count()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_json_pretty(path, &self.questions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Succeeded,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub file_name: String,
    pub sha256: Option<String>,
    pub status: DocumentStatus,
    pub paper: Option<String>,
    pub questions: usize,
    pub needs_review: usize,
    pub incomplete_blocks: usize,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionCounts {
    pub scanned: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub questions: usize,
    pub clean: usize,
    pub needs_review: usize,
    pub incomplete_blocks: usize,
}

impl ExtractionCounts {
    pub fn from_outcomes(documents: &[DocumentOutcome]) -> Self {
        let mut counts = Self {
            scanned: documents.len(),
            ..Self::default()
        };
        for document in documents {
            match document.status {
                DocumentStatus::Succeeded => counts.succeeded += 1,
                DocumentStatus::Skipped => counts.skipped += 1,
                DocumentStatus::Failed => counts.failed += 1,
            }
            counts.questions += document.questions;
            counts.needs_review += document.needs_review;
            counts.incomplete_blocks += document.incomplete_blocks;
        }
        counts.clean = counts.questions - counts.needs_review;
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub manifest_version: u32,
    pub run_id: String,
    pub batch_id: String,
    pub profile: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub output_path: String,
    pub counts: ExtractionCounts,
    pub documents: Vec<DocumentOutcome>,
    pub warnings: Vec<String>,
}
