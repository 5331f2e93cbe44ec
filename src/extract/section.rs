use std::ops::Range;

use anyhow::{Context, Result};
use regex::Regex;

use crate::error::ExtractError;
use crate::profile::{ExtractionProfile, SectionLayout, SectionSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LocatedSection {
    pub(crate) name: String,
    pub(crate) span: Range<usize>,
}

impl LocatedSection {
    pub(crate) fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.span.clone()]
    }
}

/// A header that ends the preceding labeled section. `owner` is the index of
/// the section it introduces, `None` for stop headers.
#[derive(Debug)]
struct Boundary {
    owner: Option<usize>,
    pattern: Regex,
}

#[derive(Debug)]
struct LabeledEntry {
    spec: SectionSpec,
    alt_headers: Vec<Regex>,
}

/// Finds section spans inside a document's joined text.
#[derive(Debug)]
pub(crate) struct SectionLocator {
    layout: SectionLayout,
    ordinal_marker: Regex,
    entries: Vec<LabeledEntry>,
    boundaries: Vec<Boundary>,
}

impl SectionLocator {
    pub(crate) fn new(profile: &ExtractionProfile) -> Result<Self> {
        let ordinal_marker = Regex::new(&profile.ordinal_marker).with_context(|| {
            format!(
                "failed to compile ordinal marker regex for profile '{}'",
                profile.name
            )
        })?;

        let mut entries = Vec::with_capacity(profile.sections.len());
        let mut boundaries = Vec::new();
        for (index, spec) in profile.sections.iter().enumerate() {
            let mut alt_headers = Vec::with_capacity(spec.alt_headers.len());
            for alt in &spec.alt_headers {
                let pattern = format!(r"(?i)Section\s*:\s*{}", regex::escape(alt));
                alt_headers.push(Regex::new(&pattern).with_context(|| {
                    format!("failed to compile alternate header regex for '{alt}'")
                })?);
            }
            if !spec.header.trim().is_empty() {
                boundaries.push(Boundary {
                    owner: Some(index),
                    pattern: exact_header(&spec.header)?,
                });
            }
            boundaries.extend(alt_headers.iter().map(|pattern| Boundary {
                owner: Some(index),
                pattern: pattern.clone(),
            }));
            entries.push(LabeledEntry {
                spec: spec.clone(),
                alt_headers,
            });
        }
        for stop in profile
            .stop_headers
            .iter()
            .filter(|stop| !stop.trim().is_empty())
        {
            boundaries.push(Boundary {
                owner: None,
                pattern: exact_header(stop)?,
            });
        }

        Ok(Self {
            layout: profile.layout,
            ordinal_marker,
            entries,
            boundaries,
        })
    }

    pub(crate) fn locate(&self, text: &str, index: usize) -> Result<LocatedSection, ExtractError> {
        let Some(entry) = self.entries.get(index) else {
            return Err(ExtractError::SectionNotFound {
                section: format!("#{index}"),
                detail: "no such section in profile".to_string(),
            });
        };

        match self.layout {
            SectionLayout::Ordinal => {
                let ordinal = entry.spec.ordinal.unwrap_or(index + 1);
                locate_ordinal(text, &entry.spec.name, ordinal, &self.ordinal_marker)
            }
            SectionLayout::Labeled => self.locate_labeled(text, index, entry),
        }
    }

    fn locate_labeled(
        &self,
        text: &str,
        index: usize,
        entry: &LabeledEntry,
    ) -> Result<LocatedSection, ExtractError> {
        let header_match = text
            .find(&entry.spec.header)
            .filter(|_| !entry.spec.header.trim().is_empty())
            .map(|start| start..start + entry.spec.header.len())
            .or_else(|| {
                entry
                    .alt_headers
                    .iter()
                    .find_map(|pattern| pattern.find(text).map(|found| found.range()))
            });

        let Some(header) = header_match else {
            return Err(ExtractError::SectionNotFound {
                section: entry.spec.name.clone(),
                detail: format!("header '{}' and its alternates are absent", entry.spec.header),
            });
        };

        let end = self
            .boundaries
            .iter()
            .filter(|boundary| boundary.owner != Some(index))
            .filter_map(|boundary| {
                boundary
                    .pattern
                    .find(&text[header.end..])
                    .map(|found| header.end + found.start())
            })
            .min()
            .unwrap_or(text.len());

        Ok(LocatedSection {
            name: entry.spec.name.clone(),
            span: header.start..end,
        })
    }
}

fn exact_header(header: &str) -> Result<Regex> {
    Regex::new(&regex::escape(header))
        .with_context(|| format!("failed to compile header regex for '{header}'"))
}

/// Section `ordinal` (1-based) runs from the ordinal-th marker match to the next
/// one, or to the end of the text for the last section.
pub(crate) fn locate_ordinal(
    text: &str,
    name: &str,
    ordinal: usize,
    marker: &Regex,
) -> Result<LocatedSection, ExtractError> {
    let starts = marker
        .find_iter(text)
        .map(|found| found.start())
        .collect::<Vec<usize>>();

    if ordinal == 0 || starts.len() < ordinal {
        return Err(ExtractError::SectionNotFound {
            section: name.to_string(),
            detail: format!(
                "need occurrence {} of the section marker, found {}",
                ordinal,
                starts.len()
            ),
        });
    }

    let start = starts[ordinal - 1];
    let end = starts.get(ordinal).copied().unwrap_or(text.len());
    Ok(LocatedSection {
        name: name.to_string(),
        span: start..end,
    })
}

/// Reports numbers missing below the highest in-range number found. A short
/// tail is left to the per-section count check.
pub(crate) fn check_numbering(
    section: &str,
    numbers: &[u32],
    expected: usize,
) -> Result<(), ExtractError> {
    let highest = numbers
        .iter()
        .copied()
        .filter(|number| *number as usize <= expected)
        .max()
        .unwrap_or(0);
    let missing = (1..highest)
        .filter(|wanted| !numbers.contains(wanted))
        .map(|wanted| wanted.to_string())
        .collect::<Vec<String>>();

    if missing.is_empty() {
        return Ok(());
    }

    Err(ExtractError::NumberingGap {
        section: section.to_string(),
        missing: missing.join(", "),
    })
}
