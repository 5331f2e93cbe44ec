use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Aborts the whole document.
    #[error("section '{section}' not found: {detail}")]
    SectionNotFound { section: String, detail: String },

    /// Skips one block; the rest of the section is still parsed.
    #[error("question {number} incomplete: {reason}")]
    IncompleteQuestion { number: u32, reason: String },

    /// Advisory only, never returned as a failure.
    #[error("section '{section}' skips question numbers {missing}")]
    NumberingGap { section: String, missing: String },

    /// Advisory only, never returned as a failure.
    #[error("section '{section}' expected {expected} questions, found {found}")]
    CountMismatch {
        section: String,
        expected: usize,
        found: usize,
    },
}
