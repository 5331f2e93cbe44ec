use std::fs;

use super::*;
use crate::cli::ProfilePreset;

const COVER: &str = "Combined Graduate Level Examination 2020 Tier-I\nExam Date 03/03/2020\nExam Time 10:00 AM - 11:00 AM\n";
const GOOD_QUESTION: &str = "1. What is 2/4? (1) 0.5 ✓ (2) 1 (3) 2 (4) 4";

fn booklet_extractor() -> QuestionExtractor {
    let mut profile = ExtractionProfile::preset(ProfilePreset::MarkedBooklet);
    profile.sections[0].ordinal = Some(1);
    profile.sections[0].expected_questions = 1;
    QuestionExtractor::new(profile).expect("extractor should build")
}

fn tier_classifier() -> TierClassifier {
    let config = ExtractionProfile::preset(ProfilePreset::MarkedBooklet)
        .classifier
        .expect("booklets carry a classifier");
    TierClassifier::new(&config).expect("classifier should build")
}

fn options() -> BatchOptions {
    BatchOptions {
        exam: "SSC CGL".to_string(),
        year: 2020,
        tier: "Tier 1".to_string(),
    }
}

fn write_corpus(dir: &Path) {
    let documents = [
        ("01_good.txt", format!("{COVER}{GOOD_QUESTION}")),
        (
            "02_tier2.txt",
            format!("Combined Graduate Level Examination 2020 Tier 2\n{GOOD_QUESTION}"),
        ),
        ("03_good.txt", format!("{COVER}{GOOD_QUESTION}")),
        (
            "04_missing.txt",
            format!("{COVER}No questions were printed on this page"),
        ),
        ("05_good.txt", format!("{COVER}{GOOD_QUESTION}")),
        (
            "06_stats.txt",
            format!("Combined Graduate Level Examination Tier-I Statistics\n{GOOD_QUESTION}"),
        ),
        ("07_good.txt", format!("{COVER}{GOOD_QUESTION}")),
        (
            "08_broken.txt",
            format!("{COVER}1. A question that lost options (1) a ✓ (2) b"),
        ),
        (
            "09_tier_ii.txt",
            format!("Combined Graduate Level Examination Tier-II\n{GOOD_QUESTION}"),
        ),
        ("10_good.txt", format!("{COVER}{GOOD_QUESTION}")),
    ];

    for (name, body) in documents {
        fs::write(dir.join(name), body).expect("write document");
    }
    fs::write(dir.join("notes.md"), "not a document").expect("write notes");
}

#[test]
fn batch_reports_documents_in_encounter_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_corpus(dir.path());
    let extractor = booklet_extractor();
    let classifier = tier_classifier();
    let header_reader = HeaderReader::new().expect("header reader");

    let outcome = run_batch(
        dir.path(),
        &extractor,
        Some(&classifier),
        &header_reader,
        &options(),
    )
    .expect("batch runs");

    let counts = outcome.counts();
    assert_eq!(counts.scanned, 10);
    assert_eq!(counts.skipped, 3);
    assert_eq!(counts.succeeded, 5);
    assert_eq!(counts.failed, 2);
    assert_eq!(counts.questions, 5);
    assert_eq!(counts.clean, 5);

    assert_eq!(
        outcome.names_with_status(DocumentStatus::Skipped),
        vec!["02_tier2.txt", "06_stats.txt", "09_tier_ii.txt"]
    );
    assert_eq!(
        outcome.names_with_status(DocumentStatus::Failed),
        vec!["04_missing.txt", "08_broken.txt"]
    );
    assert_eq!(
        outcome.names_with_status(DocumentStatus::Succeeded),
        vec![
            "01_good.txt",
            "03_good.txt",
            "05_good.txt",
            "07_good.txt",
            "10_good.txt"
        ]
    );

    for line in outcome.failure_lines() {
        let (name, message) = line.split_once(": ").expect("name and message");
        assert!(name.ends_with(".txt"));
        assert!(message.chars().count() <= FAILURE_MESSAGE_CHARS);
    }
}

#[test]
fn batch_questions_share_one_batch_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_corpus(dir.path());
    let extractor = booklet_extractor();
    let classifier = tier_classifier();
    let header_reader = HeaderReader::new().expect("header reader");

    let outcome = run_batch(
        dir.path(),
        &extractor,
        Some(&classifier),
        &header_reader,
        &options(),
    )
    .expect("batch runs");

    assert_eq!(outcome.batch.batch_id, "SSC-CGL_2020_Tier-1");
    assert!(
        outcome
            .batch
            .questions
            .iter()
            .all(|question| question.import_batch == "SSC-CGL_2020_Tier-1")
    );
    assert_eq!(
        outcome.batch.questions[0].source.paper,
        "Tier 1 - 03/03/2020 10:00 AM - 11:00 AM"
    );
    assert_eq!(outcome.batch.questions[0].source.file_name, "01_good.txt");
    assert!(
        outcome.documents[0]
            .sha256
            .as_deref()
            .is_some_and(|sha| sha.len() == 64)
    );
}

#[test]
fn disabling_classification_extracts_every_tier() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_corpus(dir.path());
    let extractor = booklet_extractor();
    let header_reader = HeaderReader::new().expect("header reader");

    let outcome = run_batch(dir.path(), &extractor, None, &header_reader, &options())
        .expect("batch runs");

    let counts = outcome.counts();
    assert_eq!(counts.skipped, 0);
    assert_eq!(counts.succeeded, 8);
    assert_eq!(counts.failed, 2);
    assert_eq!(
        outcome
            .documents
            .iter()
            .find(|document| document.file_name == "02_tier2.txt")
            .and_then(|document| document.paper.as_deref()),
        Some("Tier 1 - 02_tier2")
    );
}

#[test]
fn empty_directory_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let extractor = booklet_extractor();
    let header_reader = HeaderReader::new().expect("header reader");

    assert!(run_batch(dir.path(), &extractor, None, &header_reader, &options()).is_err());
}
