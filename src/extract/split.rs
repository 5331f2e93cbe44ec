use anyhow::{Context, Result};
use regex::Regex;

use super::pages::strip_page_markers;
use crate::profile::QuestionMarkerStyle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuestionBlock {
    pub(crate) number: u32,
    pub(crate) text: String,
}

#[derive(Debug)]
pub(crate) struct BlockSplitter {
    marker: Regex,
    max_number: u32,
}

impl BlockSplitter {
    pub(crate) fn new(style: QuestionMarkerStyle, max_number: u32) -> Result<Self> {
        let pattern = match style {
            QuestionMarkerStyle::Numbered => r"(?m)^[ \t]*(?P<marker>(?P<number>\d{1,3})\.)\s",
            QuestionMarkerStyle::Prefixed => r"(?P<marker>Q\.\s?(?P<number>\d{1,3}))\s",
        };
        Ok(Self {
            marker: Regex::new(pattern).context("failed to compile question marker regex")?,
            max_number,
        })
    }

    /// Splits at the longest run of in-range markers whose numbers strictly
    /// increase. Gaps are allowed, so a missing question only costs its own
    /// block. Markers outside the run stay inside the enclosing block.
    /// Every block is the exact slice up to the next accepted marker.
    pub(crate) fn split(&self, text: &str) -> Vec<QuestionBlock> {
        let cleaned;
        let text = if text.contains("---PAGE_") {
            cleaned = strip_page_markers(text);
            cleaned.as_str()
        } else {
            text
        };

        let mut candidates: Vec<(usize, u32)> = Vec::new();
        for captures in self.marker.captures_iter(text) {
            let (Some(marker), Some(number)) = (captures.name("marker"), captures.name("number"))
            else {
                continue;
            };
            let Ok(number) = number.as_str().parse::<u32>() else {
                continue;
            };
            if number == 0 || number > self.max_number {
                continue;
            }
            candidates.push((marker.start(), number));
        }

        let accepted = increasing_run(&candidates);

        accepted
            .iter()
            .enumerate()
            .map(|(index, (start, number))| {
                let end = accepted
                    .get(index + 1)
                    .map(|(next_start, _)| *next_start)
                    .unwrap_or(text.len());
                QuestionBlock {
                    number: *number,
                    text: text[*start..end].to_string(),
                }
            })
            .collect()
    }
}

/// Longest strictly increasing chain of marker numbers. Ties go to the chain
/// that starts earliest, then to the nearest next marker.
fn increasing_run(candidates: &[(usize, u32)]) -> Vec<(usize, u32)> {
    let count = candidates.len();
    let mut length = vec![1_usize; count];
    let mut next: Vec<Option<usize>> = vec![None; count];

    for current in (0..count).rev() {
        for later in current + 1..count {
            if candidates[later].1 > candidates[current].1 && length[later] + 1 > length[current] {
                length[current] = length[later] + 1;
                next[current] = Some(later);
            }
        }
    }

    let mut head = None;
    for index in 0..count {
        if head.is_none_or(|best: usize| length[index] > length[best]) {
            head = Some(index);
        }
    }

    let mut run = Vec::new();
    while let Some(index) = head {
        run.push(candidates[index]);
        head = next[index];
    }
    run
}
