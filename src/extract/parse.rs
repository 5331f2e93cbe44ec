use std::ops::Range;

use anyhow::{Context, Result, bail};
use regex::Regex;

use super::normalize::MathNormalizer;
use super::split::QuestionBlock;
use crate::error::ExtractError;
use crate::model::{
    OPTION_IMAGE_PLACEHOLDER, OPTIONS_PER_QUESTION, QUESTION_IMAGE_PLACEHOLDER, QuestionContent,
    QuestionOption,
};
use crate::profile::{AnswerKeyStyle, ExtractionProfile, OptionStyle, QuestionMarkerStyle};
use crate::util::collapse_whitespace;

const CORRECT_GLYPHS: &[char] = &['✓', '✔', '☑', '✅'];
const WRONG_GLYPHS: &[char] = &['✗', '✘', '☒', '❌'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedQuestion {
    pub(crate) number: u32,
    pub(crate) content: QuestionContent,
    pub(crate) needs_image_review: bool,
    pub(crate) warnings: Vec<String>,
}

#[derive(Debug)]
struct OptionMarker {
    label: String,
    span: Range<usize>,
}

/// Turns one question block into question text, four options and the correct
/// answer.
#[derive(Debug)]
pub(crate) struct BlockParser {
    normalizer: MathNormalizer,
    leading_marker: Regex,
    option_marker: Regex,
    options_anchor: Option<Regex>,
    answer_key_token: Regex,
    metadata_noise: Regex,
    figure_reference: Regex,
    table_reference: Regex,
    option_style: OptionStyle,
    answer_key: AnswerKeyStyle,
    min_question_chars: usize,
}

impl BlockParser {
    pub(crate) fn new(profile: &ExtractionProfile) -> Result<Self> {
        let leading_pattern = match profile.question_marker {
            QuestionMarkerStyle::Numbered => r"\A\s*\d{1,3}\.\s*",
            QuestionMarkerStyle::Prefixed => r"\A\s*Q\.\s?\d{1,3}\s*",
        };
        let option_pattern = match profile.option_style {
            OptionStyle::Numeric => r"(?P<marker>\((?P<label>[1-9])\))",
            OptionStyle::Lettered => r"(?P<marker>\((?P<label>[A-Ha-h])\))",
            OptionStyle::ResponseSheet => r"(?m)(?:^|\s)(?P<marker>(?P<label>[1-9])\.)",
        };
        let options_anchor = match profile.option_style {
            OptionStyle::ResponseSheet => {
                Some(Regex::new(r"\bAns\b").context("failed to compile options anchor regex")?)
            }
            OptionStyle::Numeric | OptionStyle::Lettered => None,
        };

        let answer_key_token = Regex::new(profile.answer_key_pattern()).with_context(|| {
            format!(
                "failed to compile answer key regex for profile '{}'",
                profile.name
            )
        })?;
        if !answer_key_token
            .capture_names()
            .any(|name| name == Some("label"))
        {
            bail!(
                "answer key pattern for profile '{}' lacks a `label` capture group",
                profile.name
            );
        }

        Ok(Self {
            normalizer: MathNormalizer::new()?,
            leading_marker: Regex::new(leading_pattern)
                .context("failed to compile leading question marker regex")?,
            option_marker: Regex::new(option_pattern)
                .context("failed to compile option marker regex")?,
            options_anchor,
            answer_key_token,
            metadata_noise: Regex::new(
                r"(?i)(?:Question\s+ID|Option\s+\d+\s+ID)\s*:\s*\d+|Status\s*:[^\n]*",
            )
            .context("failed to compile response metadata regex")?,
            figure_reference: Regex::new(r"(?i)\b(?:figure|fig\.|diagram|graph|chart|image)")
                .context("failed to compile figure reference regex")?,
            table_reference: Regex::new(r"(?i)\btable\b")
                .context("failed to compile table reference regex")?,
            option_style: profile.option_style,
            answer_key: profile.answer_key,
            min_question_chars: profile.min_question_chars,
        })
    }

    pub(crate) fn parse(&self, block: &QuestionBlock) -> Result<ParsedQuestion, ExtractError> {
        let incomplete = |reason: String| ExtractError::IncompleteQuestion {
            number: block.number,
            reason,
        };

        let key_label = self
            .answer_key_token
            .captures_iter(&block.text)
            .filter_map(|captures| captures.name("label"))
            .last()
            .map(|label| label.as_str().to_ascii_uppercase());

        let without_key = self.answer_key_token.replace_all(&block.text, " ");
        let without_noise = self.metadata_noise.replace_all(&without_key, " ");
        let body = self.leading_marker.replace(&without_noise, "");

        let (question_raw, options_region) = match &self.options_anchor {
            Some(anchor) => {
                let Some(found) = anchor.find(&body) else {
                    return Err(incomplete("no option list marker".to_string()));
                };
                (&body[..found.start()], &body[found.end()..])
            }
            None => ("", &body[..]),
        };

        let markers = self.option_markers(options_region);
        if markers.len() != OPTIONS_PER_QUESTION {
            return Err(incomplete(format!(
                "expected {} option markers, found {}",
                OPTIONS_PER_QUESTION,
                markers.len()
            )));
        }

        let expected_labels = self.option_style.labels();
        let found_labels = markers
            .iter()
            .map(|marker| marker.label.as_str())
            .collect::<Vec<&str>>();
        if found_labels != expected_labels {
            return Err(incomplete(format!(
                "option labels {} are not {}",
                found_labels.join(","),
                expected_labels.join(",")
            )));
        }

        let question_raw = if self.options_anchor.is_some() {
            question_raw
        } else {
            &options_region[..markers[0].span.start]
        };

        let option_spans = markers
            .iter()
            .enumerate()
            .map(|(index, marker)| {
                let end = markers
                    .get(index + 1)
                    .map(|next| next.span.start)
                    .unwrap_or(options_region.len());
                &options_region[marker.span.end..end]
            })
            .collect::<Vec<&str>>();

        let checked = option_spans
            .iter()
            .enumerate()
            .filter(|(_, span)| span.contains(CORRECT_GLYPHS))
            .map(|(index, _)| index)
            .collect::<Vec<usize>>();
        let glyph_index = (checked.len() == 1).then(|| checked[0]);
        let key_index = key_label
            .as_deref()
            .and_then(|label| expected_labels.iter().position(|expected| *expected == label));

        let mut warnings = Vec::new();
        let correct_index = match self.answer_key {
            AnswerKeyStyle::Inline => {
                let Some(glyph) = glyph_index else {
                    return Err(incomplete(format!(
                        "expected exactly one checkmarked option, found {}",
                        checked.len()
                    )));
                };
                if let Some(key) = key_index.filter(|key| *key != glyph) {
                    warnings.push(disagreement_warning(block.number, expected_labels, key, glyph));
                }
                glyph
            }
            AnswerKeyStyle::Trailing => match (key_index, glyph_index) {
                (Some(key), Some(glyph)) if key != glyph => {
                    warnings.push(disagreement_warning(block.number, expected_labels, key, glyph));
                    glyph
                }
                (Some(key), _) => key,
                (None, _) => {
                    let reason = match key_label {
                        Some(label) => format!("answer key '{label}' names no option"),
                        None => "no answer key token".to_string(),
                    };
                    return Err(incomplete(reason));
                }
            },
        };

        let mut needs_image_review = false;
        let options = option_spans
            .iter()
            .enumerate()
            .map(|(index, span)| {
                let cleaned = collapse_whitespace(&strip_glyphs(span));
                let text = if cleaned.is_empty() {
                    needs_image_review = true;
                    OPTION_IMAGE_PLACEHOLDER.to_string()
                } else {
                    self.normalizer.normalize(&cleaned)
                };
                QuestionOption {
                    id: QuestionOption::id_for(index),
                    text,
                    is_correct: index == correct_index,
                    inf_tag: None,
                    image: None,
                }
            })
            .collect::<Vec<QuestionOption>>();

        let question_text = collapse_whitespace(&strip_glyphs(question_raw));
        let has_diagram = self.figure_reference.is_match(&question_text);
        let has_table = self.table_reference.is_match(&question_text);
        if has_diagram || has_table || question_text.ends_with(':') {
            needs_image_review = true;
        }

        let text = if question_text.chars().count() < self.min_question_chars {
            needs_image_review = true;
            QUESTION_IMAGE_PLACEHOLDER.to_string()
        } else {
            self.normalizer.normalize(&question_text)
        };

        Ok(ParsedQuestion {
            number: block.number,
            content: QuestionContent {
                text,
                correct_option_id: QuestionOption::id_for(correct_index),
                options,
                image: None,
                has_diagram,
                has_table,
            },
            needs_image_review,
            warnings,
        })
    }

    fn option_markers(&self, region: &str) -> Vec<OptionMarker> {
        self.option_marker
            .captures_iter(region)
            .filter_map(|captures| {
                let marker = captures.name("marker")?;
                let label = captures.name("label")?;
                let preceded_by_word = region[..marker.start()]
                    .chars()
                    .next_back()
                    .is_some_and(char::is_alphanumeric);
                let followed_by_text = region[marker.end()..]
                    .chars()
                    .next()
                    .is_some_and(|next| !next.is_whitespace());

                let accepted = match self.option_style {
                    OptionStyle::Numeric | OptionStyle::Lettered => !preceded_by_word,
                    OptionStyle::ResponseSheet => !followed_by_text,
                };
                accepted.then(|| OptionMarker {
                    label: label.as_str().to_ascii_uppercase(),
                    span: marker.range(),
                })
            })
            .collect()
    }
}

fn strip_glyphs(text: &str) -> String {
    text.chars()
        .filter(|character| {
            !CORRECT_GLYPHS.contains(character) && !WRONG_GLYPHS.contains(character)
        })
        .collect()
}

fn disagreement_warning(number: u32, labels: [&str; 4], key: usize, glyph: usize) -> String {
    format!(
        "question {}: answer key names option {} but the checkmark is on option {}, keeping the checkmark",
        number, labels[key], labels[glyph]
    )
}
