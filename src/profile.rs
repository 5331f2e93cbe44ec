use std::path::Path;

use anyhow::{Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cli::{ProfileArgs, ProfilePreset};
use crate::util::read_json;

const DEFAULT_ORDINAL_MARKER: &str = r"(?m)(?:Q\.?\s*1|^[ \t]*1\.)\s";
const DEFAULT_EXPECTED_QUESTIONS: usize = 25;
const DEFAULT_MAX_QUESTION_NUMBER: u32 = 25;
const DEFAULT_MIN_QUESTION_CHARS: usize = 8;

/// A key line of its own, e.g. `Answer: (2)` or `Ans - B`.
const BOOKLET_ANSWER_KEY_PATTERN: &str =
    r"(?mi)^[ \t]*(?:answer|ans)[ \t]*[:\-][ \t]*\(?(?P<label>[1-9A-H])\)?[ \t]*$";
const RESPONSE_SHEET_ANSWER_KEY_PATTERN: &str = r"(?i)\bchosen\s+option\s*:\s*(?P<label>[1-9])\b";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub name: String,
    pub header: String,
    #[serde(default)]
    pub alt_headers: Vec<String>,
    /// Advisory page range, logged but never enforced.
    #[serde(default)]
    pub page_hint: Option<(u32, u32)>,
    #[serde(default = "default_expected_questions")]
    pub expected_questions: usize,
    #[serde(default)]
    pub ordinal: Option<usize>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionLayout {
    Labeled,
    Ordinal,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionMarkerStyle {
    /// `N.` at the start of a line.
    Numbered,
    /// `Q.N` anywhere in the text.
    Prefixed,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionStyle {
    Numeric,
    Lettered,
    ResponseSheet,
}

impl OptionStyle {
    pub fn labels(self) -> [&'static str; 4] {
        match self {
            Self::Numeric | Self::ResponseSheet => ["1", "2", "3", "4"],
            Self::Lettered => ["A", "B", "C", "D"],
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKeyStyle {
    /// A checkmark glyph inside exactly one option.
    Inline,
    /// An answer-key token elsewhere in the block.
    Trailing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionProfile {
    pub name: String,
    pub sections: Vec<SectionSpec>,
    #[serde(default)]
    pub stop_headers: Vec<String>,
    pub layout: SectionLayout,
    #[serde(default = "default_ordinal_marker")]
    pub ordinal_marker: String,
    pub question_marker: QuestionMarkerStyle,
    pub option_style: OptionStyle,
    pub answer_key: AnswerKeyStyle,
    #[serde(default)]
    pub answer_key_pattern: Option<String>,
    #[serde(default = "default_max_question_number")]
    pub max_question_number: u32,
    #[serde(default = "default_min_question_chars")]
    pub min_question_chars: usize,
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
}

fn default_expected_questions() -> usize {
    DEFAULT_EXPECTED_QUESTIONS
}

fn default_ordinal_marker() -> String {
    DEFAULT_ORDINAL_MARKER.to_string()
}

fn default_max_question_number() -> u32 {
    DEFAULT_MAX_QUESTION_NUMBER
}

fn default_min_question_chars() -> usize {
    DEFAULT_MIN_QUESTION_CHARS
}

impl ExtractionProfile {
    pub fn from_args(args: &ProfileArgs) -> Result<Self> {
        let mut profile = match &args.profile_path {
            Some(path) => Self::load(path)?,
            None => Self::preset(args.preset),
        };

        if let Some(answer_key) = args.answer_key {
            profile.answer_key = answer_key;
        }
        if !args.sections.is_empty() {
            profile.retain_sections(&args.sections)?;
        }

        Ok(profile)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let profile: Self = read_json(path)?;
        if profile.sections.is_empty() {
            bail!("profile {} declares no sections", path.display());
        }
        Ok(profile)
    }

    pub fn preset(preset: ProfilePreset) -> Self {
        match preset {
            ProfilePreset::ResponseSheet => Self::response_sheet(),
            ProfilePreset::MarkedBooklet => Self::marked_booklet(),
            ProfilePreset::AnswerKeyBooklet => Self::answer_key_booklet(),
        }
    }

    pub fn answer_key_pattern(&self) -> &str {
        if let Some(pattern) = &self.answer_key_pattern {
            return pattern;
        }
        match self.option_style {
            OptionStyle::ResponseSheet => RESPONSE_SHEET_ANSWER_KEY_PATTERN,
            OptionStyle::Numeric | OptionStyle::Lettered => BOOKLET_ANSWER_KEY_PATTERN,
        }
    }

    /// Primary and stop header strings, protected from running-header removal.
    pub fn known_headers(&self) -> Vec<&str> {
        self.sections
            .iter()
            .map(|section| section.header.as_str())
            .chain(self.stop_headers.iter().map(String::as_str))
            .filter(|header| !header.trim().is_empty())
            .collect()
    }

    fn retain_sections(&mut self, names: &[String]) -> Result<()> {
        let unknown = names
            .iter()
            .filter(|name| {
                !self
                    .sections
                    .iter()
                    .any(|section| section.name.eq_ignore_ascii_case(name))
            })
            .cloned()
            .collect::<Vec<String>>();
        if !unknown.is_empty() {
            bail!(
                "profile '{}' has no section named {}",
                self.name,
                unknown.join(", ")
            );
        }

        self.sections.retain(|section| {
            names
                .iter()
                .any(|name| section.name.eq_ignore_ascii_case(name))
        });
        Ok(())
    }

    fn response_sheet() -> Self {
        Self {
            name: ProfilePreset::ResponseSheet.as_str().to_string(),
            sections: vec![
                SectionSpec {
                    name: "REASONING".to_string(),
                    header: "Section : General Intelligence and Reasoning".to_string(),
                    alt_headers: vec!["General Intelligence".to_string(), "Reasoning".to_string()],
                    page_hint: Some((1, 12)),
                    expected_questions: DEFAULT_EXPECTED_QUESTIONS,
                    ordinal: Some(1),
                },
                SectionSpec {
                    name: "QUANT".to_string(),
                    header: "Section : Quantitative Aptitude".to_string(),
                    alt_headers: vec!["Quantitative Aptitude".to_string()],
                    page_hint: Some((19, 28)),
                    expected_questions: DEFAULT_EXPECTED_QUESTIONS,
                    ordinal: Some(3),
                },
            ],
            stop_headers: vec![
                "Section : General Awareness".to_string(),
                "Section : English Comprehension".to_string(),
            ],
            layout: SectionLayout::Labeled,
            ordinal_marker: default_ordinal_marker(),
            question_marker: QuestionMarkerStyle::Prefixed,
            option_style: OptionStyle::ResponseSheet,
            answer_key: AnswerKeyStyle::Trailing,
            answer_key_pattern: None,
            max_question_number: DEFAULT_MAX_QUESTION_NUMBER,
            min_question_chars: 15,
            classifier: Some(tier_one_classifier()),
        }
    }

    fn marked_booklet() -> Self {
        Self {
            name: ProfilePreset::MarkedBooklet.as_str().to_string(),
            sections: vec![SectionSpec {
                name: "QUANT".to_string(),
                header: "Quantitative Aptitude".to_string(),
                alt_headers: Vec::new(),
                page_hint: None,
                expected_questions: DEFAULT_EXPECTED_QUESTIONS,
                ordinal: Some(3),
            }],
            stop_headers: Vec::new(),
            layout: SectionLayout::Ordinal,
            ordinal_marker: default_ordinal_marker(),
            question_marker: QuestionMarkerStyle::Numbered,
            option_style: OptionStyle::Numeric,
            answer_key: AnswerKeyStyle::Inline,
            answer_key_pattern: None,
            max_question_number: DEFAULT_MAX_QUESTION_NUMBER,
            min_question_chars: DEFAULT_MIN_QUESTION_CHARS,
            classifier: Some(tier_one_classifier()),
        }
    }

    fn answer_key_booklet() -> Self {
        Self {
            name: ProfilePreset::AnswerKeyBooklet.as_str().to_string(),
            sections: vec![SectionSpec {
                name: "GENERAL".to_string(),
                header: "General".to_string(),
                alt_headers: Vec::new(),
                page_hint: None,
                expected_questions: DEFAULT_EXPECTED_QUESTIONS,
                ordinal: Some(1),
            }],
            stop_headers: Vec::new(),
            layout: SectionLayout::Ordinal,
            ordinal_marker: default_ordinal_marker(),
            question_marker: QuestionMarkerStyle::Numbered,
            option_style: OptionStyle::Lettered,
            answer_key: AnswerKeyStyle::Trailing,
            answer_key_pattern: None,
            max_question_number: 200,
            min_question_chars: DEFAULT_MIN_QUESTION_CHARS,
            classifier: None,
        }
    }
}

fn tier_one_classifier() -> ClassifierConfig {
    ClassifierConfig {
        include: vec![r"Tier[\s-]*I\b".to_string(), r"Tier[\s-]*1\b".to_string()],
        exclude: vec![
            r"Tier[\s-]*II\b".to_string(),
            r"Tier[\s-]*2\b".to_string(),
            r"Paper[\s-]*II\b".to_string(),
            r"Paper[\s-]*2\b".to_string(),
            r"statistics".to_string(),
            r"AAO".to_string(),
        ],
    }
}
