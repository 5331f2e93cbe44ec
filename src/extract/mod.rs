mod checks;
mod classify;
mod normalize;
mod pages;
mod parse;
mod pipeline;
mod section;
mod split;

pub use checks::{QuestionIssue, answer_distribution, structural_issues};
pub use classify::{HeaderReader, TierClassifier};
pub use pages::SourceDocument;
pub use pipeline::{ExtractionStage, PaperMetadata, QuestionExtractor};
