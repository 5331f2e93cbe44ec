use anyhow::{Context, Result};
use regex::Regex;

use crate::profile::ClassifierConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Included,
    /// Carries the exclusion pattern that matched.
    Excluded(String),
    NotIncluded,
}

impl Classification {
    pub fn is_included(&self) -> bool {
        matches!(self, Self::Included)
    }

    pub fn reason(&self) -> String {
        match self {
            Self::Included => "included".to_string(),
            Self::Excluded(pattern) => format!("excluded by pattern '{pattern}'"),
            Self::NotIncluded => "no inclusion pattern matched".to_string(),
        }
    }
}

/// Case-insensitive include/exclude filter over a document's leading text.
/// Exclusion always wins; an empty include list admits everything not excluded.
#[derive(Debug)]
pub struct TierClassifier {
    include: Vec<Regex>,
    exclude: Vec<(String, Regex)>,
}

impl TierClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let include = config
            .include
            .iter()
            .map(|pattern| compile_case_insensitive(pattern))
            .collect::<Result<Vec<Regex>>>()?;
        let exclude = config
            .exclude
            .iter()
            .map(|pattern| Ok((pattern.clone(), compile_case_insensitive(pattern)?)))
            .collect::<Result<Vec<(String, Regex)>>>()?;

        Ok(Self { include, exclude })
    }

    pub fn classify(&self, text: &str) -> Classification {
        if let Some((pattern, _)) = self.exclude.iter().find(|(_, regex)| regex.is_match(text)) {
            return Classification::Excluded(pattern.clone());
        }
        if self.include.is_empty() || self.include.iter().any(|regex| regex.is_match(text)) {
            return Classification::Included;
        }
        Classification::NotIncluded
    }
}

fn compile_case_insensitive(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("(?i){pattern}"))
        .with_context(|| format!("failed to compile classifier pattern '{pattern}'"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperHeader {
    pub exam_name: Option<String>,
    pub exam_year: Option<u32>,
    pub exam_date: Option<String>,
    pub exam_time: Option<String>,
}

impl PaperHeader {
    /// `"<tier> - <date> <time>"` when the header carries a date, else
    /// `"<tier> - <stem>"`.
    pub fn paper_label(&self, tier: &str, stem: &str) -> String {
        match (&self.exam_date, &self.exam_time) {
            (Some(date), Some(time)) => format!("{tier} - {date} {time}"),
            (Some(date), None) => format!("{tier} - {date}"),
            _ => format!("{tier} - {stem}"),
        }
    }
}

/// Reads exam name, date and shift time from a response-sheet cover page.
#[derive(Debug)]
pub struct HeaderReader {
    exam_name: Regex,
    exam_date: Regex,
    exam_time: Regex,
}

impl HeaderReader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            exam_name: Regex::new(
                r"(?i)Combined\s+Graduate\s+Level\s+Examination\s*(?P<year>\d{4})?",
            )
            .context("failed to compile exam name regex")?,
            exam_date: Regex::new(
                r"(?i)Exam\s+Date\s*:?\s*(?P<value>\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4})",
            )
            .context("failed to compile exam date regex")?,
            exam_time: Regex::new(
                r"(?i)Exam\s+Time\s*:?\s*(?P<value>\d{1,2}(?::\d{2})?\s*(?:AM|PM)?(?:\s*-\s*\d{1,2}(?::\d{2})?\s*(?:AM|PM)?)?)",
            )
            .context("failed to compile exam time regex")?,
        })
    }

    pub fn read(&self, text: &str) -> PaperHeader {
        let mut header = PaperHeader::default();

        if let Some(captures) = self.exam_name.captures(text) {
            header.exam_name = Some("Combined Graduate Level Examination".to_string());
            header.exam_year = captures
                .name("year")
                .and_then(|year| year.as_str().parse::<u32>().ok());
        }
        header.exam_date = self
            .exam_date
            .captures(text)
            .and_then(|captures| captures.name("value"))
            .map(|value| value.as_str().trim().to_string());
        header.exam_time = self
            .exam_time
            .captures(text)
            .and_then(|captures| captures.name("value"))
            .map(|value| value.as_str().trim().to_string());

        header
    }
}
