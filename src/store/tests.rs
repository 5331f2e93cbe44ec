use std::fs;

use super::*;
use crate::model::{QuestionContent, QuestionOption, QuestionSource};

fn sample_question(number: u32, needs_image_review: bool, batch: &str) -> Question {
    let options = (0..4)
        .map(|index| QuestionOption {
            id: QuestionOption::id_for(index),
            text: format!("option {}", index + 1),
            is_correct: index == 0,
            inf_tag: None,
            image: None,
        })
        .collect();
    Question::new(
        QuestionContent {
            text: format!("Question number {number}"),
            options,
            correct_option_id: QuestionOption::id_for(0),
            image: None,
            has_diagram: false,
            has_table: false,
        },
        QuestionSource {
            exam: "SSC CGL".to_string(),
            year: 2020,
            paper: "Tier 1".to_string(),
            section: "QUANT".to_string(),
            question_number: number,
            file_name: "paper.pdf".to_string(),
        },
        needs_image_review,
        batch,
    )
}

#[test]
fn parses_sqlite_uri_with_collection() {
    let location =
        StoreLocation::parse("sqlite://data/pyq_bank.db?collection=cgl", None).expect("valid uri");
    assert_eq!(location.path, PathBuf::from("data/pyq_bank.db"));
    assert_eq!(location.database, "pyq_bank");
    assert_eq!(location.collection, "cgl");

    let overridden = StoreLocation::parse("sqlite://data/pyq_bank.db?collection=cgl", Some("other"))
        .expect("valid uri");
    assert_eq!(overridden.collection, "other");
}

#[test]
fn bare_path_uses_default_collection() {
    let location = StoreLocation::parse("bank.sqlite", None).expect("valid path");
    assert_eq!(location.database, "bank");
    assert_eq!(location.collection, DEFAULT_COLLECTION);
}

#[test]
fn rejects_foreign_schemes_and_bad_collections() {
    assert!(StoreLocation::parse("mongodb+srv://cluster0.example.net/bank", None).is_err());
    assert!(StoreLocation::parse("sqlite://bank.db?collection=drop;table", None).is_err());
    assert!(StoreLocation::parse("sqlite://bank.db", Some("9lives")).is_err());
    assert!(StoreLocation::parse("sqlite://", None).is_err());
}

#[test]
fn env_file_lookup_skips_comments_and_bom() {
    let dir = tempfile::tempdir().expect("tempdir");
    let env_path = dir.path().join(".env.local");
    fs::write(
        &env_path,
        "\u{feff}# local settings\nOTHER=1\nexport QUESTION_STORE_URI=\"sqlite://bank.db\"\n",
    )
    .expect("write env file");

    assert_eq!(
        uri_from_env_file(&env_path).expect("readable env file"),
        Some("sqlite://bank.db".to_string())
    );
    assert_eq!(
        uri_from_env_file(&dir.path().join("missing.env")).expect("missing file is fine"),
        None
    );
}

#[test]
fn explicit_uri_wins() {
    let uri = resolve_store_uri(Some(" sqlite://explicit.db "), Path::new("does-not-exist.env"))
        .expect("explicit uri");
    assert_eq!(uri, "sqlite://explicit.db");
}

#[test]
fn reimport_skips_duplicates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let uri = format!("sqlite://{}", dir.path().join("bank.db").display());
    let location = StoreLocation::parse(&uri, None).expect("valid uri");
    let mut store = QuestionStore::open(location).expect("store opens");

    let questions = vec![
        sample_question(1, false, "SSC-CGL_2020_Tier-1"),
        sample_question(2, true, "SSC-CGL_2020_Tier-1"),
        sample_question(1, false, "SSC-CGL_2019_Tier-1"),
    ];

    let first = store.insert_many(&questions).expect("first import");
    assert_eq!(
        first,
        InsertSummary {
            inserted: 3,
            duplicates: 0
        }
    );

    let second = store.insert_many(&questions).expect("second import");
    assert_eq!(
        second,
        InsertSummary {
            inserted: 0,
            duplicates: 3
        }
    );
    assert_eq!(store.total_count().expect("count"), 3);

    let counts = store.batch_counts().expect("batch counts");
    assert_eq!(
        counts,
        vec![
            BatchCount {
                import_batch: "SSC-CGL_2019_Tier-1".to_string(),
                questions: 1,
                needs_review: 0,
            },
            BatchCount {
                import_batch: "SSC-CGL_2020_Tier-1".to_string(),
                questions: 2,
                needs_review: 1,
            },
        ]
    );
}

#[test]
fn stored_body_round_trips_to_question() {
    let dir = tempfile::tempdir().expect("tempdir");
    let location =
        StoreLocation::parse(&dir.path().join("bank.db").display().to_string(), Some("cgl"))
            .expect("valid path");
    let mut store = QuestionStore::open(location).expect("store opens");
    let question = sample_question(7, false, "SSC-CGL_2020_Tier-1");
    store
        .insert_many(std::slice::from_ref(&question))
        .expect("import");

    let body: String = store
        .connection
        .query_row("SELECT body FROM cgl", [], |row| row.get(0))
        .expect("stored body");
    let restored: Question = serde_json::from_str(&body).expect("body is a question");
    assert_eq!(restored, question);
}
