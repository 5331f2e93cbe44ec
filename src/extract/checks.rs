use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{OPTIONS_PER_QUESTION, Question, QuestionOption};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionIssue {
    pub import_batch: String,
    pub section: String,
    pub question_number: u32,
    pub message: String,
}

/// Structural invariants every emitted question must hold.
pub fn structural_issues(questions: &[Question]) -> Vec<QuestionIssue> {
    let mut issues = Vec::new();

    for question in questions {
        let mut push = |message: String| {
            issues.push(QuestionIssue {
                import_batch: question.import_batch.clone(),
                section: question.source.section.clone(),
                question_number: question.source.question_number,
                message,
            });
        };

        let options = &question.content.options;
        if options.len() != OPTIONS_PER_QUESTION {
            push(format!(
                "expected {} options, found {}",
                OPTIONS_PER_QUESTION,
                options.len()
            ));
        }

        for (index, option) in options.iter().enumerate() {
            let expected_id = QuestionOption::id_for(index);
            if option.id != expected_id {
                push(format!(
                    "option {} has id '{}', expected '{}'",
                    index + 1,
                    option.id,
                    expected_id
                ));
            }
            if option.text.trim().is_empty() {
                push(format!("option '{}' has empty text", option.id));
            }
        }

        let correct = question.correct_count();
        if correct != 1 {
            push(format!("expected exactly one correct option, found {correct}"));
        }

        let flagged = options
            .iter()
            .find(|option| option.is_correct)
            .map(|option| option.id.as_str());
        if correct == 1 && flagged != Some(question.content.correct_option_id.as_str()) {
            push(format!(
                "correct_option_id '{}' does not match the option flagged correct",
                question.content.correct_option_id
            ));
        }

        if question.content.text.trim().is_empty() {
            push("question text is empty".to_string());
        }
    }

    issues
}

/// Count of correct answers per option id.
pub fn answer_distribution(questions: &[Question]) -> BTreeMap<String, usize> {
    let mut distribution = BTreeMap::new();
    for question in questions {
        *distribution
            .entry(question.content.correct_option_id.clone())
            .or_insert(0) += 1;
    }
    distribution
}
