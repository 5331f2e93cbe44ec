use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

const MIN_EDGE_REPEATS: usize = 3;
const MAX_EDGE_LINE_CHARS: usize = 120;

/// Page-structured text of one source document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub file_name: String,
    pub pages: Vec<String>,
}

impl SourceDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|value| value.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let pages = match extension.as_str() {
            "pdf" => extract_pages_with_pdftotext(path)?,
            "txt" => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                split_pages(&raw)
            }
            other => bail!(
                "unsupported document type '{}' for {}",
                other,
                path.display()
            ),
        };

        Ok(Self { file_name, pages })
    }

    pub fn from_pages(file_name: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            file_name: file_name.into(),
            pages,
        }
    }

    pub fn stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|value| value.to_str())
            .unwrap_or(&self.file_name)
    }

    pub fn leading_text(&self) -> &str {
        self.pages.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EdgeCleanup {
    pub(crate) header_lines_removed: usize,
    pub(crate) footer_lines_removed: usize,
}

fn extract_pages_with_pdftotext(pdf_path: &Path) -> Result<Vec<String>> {
    let output = Command::new("pdftotext")
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(split_pages(&String::from_utf8_lossy(&output.stdout)))
}

pub(crate) fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    pages
}

/// Drops first/last lines that repeat on at least three pages. Lines holding
/// one of `protected` are kept even when they repeat.
pub(crate) fn remove_running_edges(pages: &mut [String], protected: &[&str]) -> EdgeCleanup {
    let header_candidates = detect_repeated_edge_lines(pages, true);
    let footer_candidates = detect_repeated_edge_lines(pages, false);
    let mut cleanup = EdgeCleanup::default();

    let is_protected = |line: &str| protected.iter().any(|header| line.contains(header));

    for page in pages.iter_mut() {
        let mut lines = page
            .lines()
            .map(|line| line.to_string())
            .collect::<Vec<String>>();

        if let Some(index) = lines.iter().position(|line| !line.trim().is_empty()) {
            let candidate = normalize_edge_line(&lines[index]);
            if header_candidates.contains(&candidate) && !is_protected(&lines[index]) {
                lines.remove(index);
                cleanup.header_lines_removed += 1;
            }
        }

        if let Some(index) = lines.iter().rposition(|line| !line.trim().is_empty()) {
            let candidate = normalize_edge_line(&lines[index]);
            if footer_candidates.contains(&candidate) && !is_protected(&lines[index]) {
                lines.remove(index);
                cleanup.footer_lines_removed += 1;
            }
        }

        *page = lines.join("\n");
    }

    cleanup
}

fn detect_repeated_edge_lines(pages: &[String], header: bool) -> HashSet<String> {
    let mut counts = HashMap::<String, usize>::new();
    for page in pages {
        let mut lines = page.lines().map(str::trim);
        let candidate = if header {
            lines.find(|line| !line.is_empty())
        } else {
            lines.rev().find(|line| !line.is_empty())
        };

        let Some(candidate) = candidate else {
            continue;
        };

        let normalized = normalize_edge_line(candidate);
        if normalized.is_empty() || normalized.len() > MAX_EDGE_LINE_CHARS {
            continue;
        }
        *counts.entry(normalized).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter_map(|(candidate, count)| (count >= MIN_EDGE_REPEATS).then_some(candidate))
        .collect()
}

fn normalize_edge_line(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_ascii_lowercase()
}

pub(crate) fn join_pages(pages: &[String]) -> String {
    let mut full_text = String::new();
    for (index, page) in pages.iter().enumerate() {
        full_text.push_str(&format!("\n---PAGE_{}---\n", index + 1));
        full_text.push_str(page);
    }
    full_text
}

pub(crate) fn strip_page_markers(text: &str) -> String {
    text.lines()
        .filter(|line| !is_page_marker(line))
        .collect::<Vec<&str>>()
        .join("\n")
}

fn is_page_marker(line: &str) -> bool {
    line.trim()
        .strip_prefix("---PAGE_")
        .and_then(|rest| rest.strip_suffix("---"))
        .is_some_and(|number| !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()))
}
