use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::ValidateArgs;
use crate::extract::{QuestionIssue, answer_distribution, structural_issues};
use crate::model::Question;

#[cfg(test)]
mod tests;

#[derive(Debug)]
struct FileVerdict {
    path: PathBuf,
    questions: usize,
    needs_review: usize,
    load_error: Option<String>,
    issues: Vec<QuestionIssue>,
    distribution: BTreeMap<String, usize>,
}

impl FileVerdict {
    fn result(&self, strict: bool) -> &'static str {
        if self.load_error.is_some() || (strict && !self.issues.is_empty()) {
            "FAIL"
        } else {
            "PASS"
        }
    }
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let verdicts = args
        .inputs
        .iter()
        .map(|path| validate_file(path))
        .collect::<Vec<FileVerdict>>();

    for verdict in &verdicts {
        let result = verdict.result(args.strict);
        match &verdict.load_error {
            Some(error) => warn!(
                path = %verdict.path.display(),
                result,
                error = %error,
                "batch file unreadable"
            ),
            None => info!(
                path = %verdict.path.display(),
                result,
                questions = verdict.questions,
                needs_review = verdict.needs_review,
                issues = verdict.issues.len(),
                answers = %format_distribution(&verdict.distribution),
                "validated batch file"
            ),
        }

        for issue in &verdict.issues {
            warn!(
                path = %verdict.path.display(),
                batch = %issue.import_batch,
                section = %issue.section,
                question = issue.question_number,
                "{}",
                issue.message
            );
        }
    }

    let failed = verdicts
        .iter()
        .filter(|verdict| verdict.result(args.strict) == "FAIL")
        .count();
    if failed > 0 {
        bail!("{} of {} batch files failed validation", failed, verdicts.len());
    }

    info!(files = verdicts.len(), strict = args.strict, "validation passed");
    Ok(())
}

fn validate_file(path: &Path) -> FileVerdict {
    let mut verdict = FileVerdict {
        path: path.to_path_buf(),
        questions: 0,
        needs_review: 0,
        load_error: None,
        issues: Vec::new(),
        distribution: BTreeMap::new(),
    };

    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(error) => {
            verdict.load_error = Some(format!("failed to read: {error}"));
            return verdict;
        }
    };

    let questions: Vec<Question> = match serde_json::from_slice(&raw) {
        Ok(questions) => questions,
        Err(error) => {
            verdict.load_error = Some(error.to_string());
            return verdict;
        }
    };

    verdict.questions = questions.len();
    verdict.needs_review = questions
        .iter()
        .filter(|question| question.needs_image_review)
        .count();
    verdict.issues = structural_issues(&questions);
    verdict.distribution = answer_distribution(&questions);
    verdict
}

fn format_distribution(distribution: &BTreeMap<String, usize>) -> String {
    distribution
        .iter()
        .map(|(option_id, count)| format!("{option_id}={count}"))
        .collect::<Vec<String>>()
        .join(" ")
}
