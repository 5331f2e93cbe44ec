use super::*;

const VALID_BATCH: &str = r#"[
  {
    "content": {
      "text": "What is $\\frac{2}{4}$?",
      "options": [
        {"id": "opt_1", "text": "0.5", "is_correct": true, "inf_tag": null, "image": null},
        {"id": "opt_2", "text": "1", "is_correct": false, "inf_tag": null, "image": null},
        {"id": "opt_3", "text": "2", "is_correct": false, "inf_tag": null, "image": null},
        {"id": "opt_4", "text": "4", "is_correct": false, "inf_tag": null, "image": null}
      ],
      "correct_option_id": "opt_1",
      "image": null
    },
    "source": {
      "exam": "SSC CGL",
      "year": 2020,
      "paper": "Tier 1",
      "section": "QUANT",
      "question_number": 1,
      "file_name": "paper.pdf"
    },
    "p_id": null,
    "import_batch": "SSC-CGL_2020_Tier-1"
  }
]"#;

#[test]
fn valid_batch_passes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("batch.json");
    fs::write(&path, VALID_BATCH).expect("write batch");

    let verdict = validate_file(&path);
    assert!(verdict.load_error.is_none());
    assert_eq!(verdict.questions, 1);
    assert!(verdict.issues.is_empty());
    assert_eq!(verdict.distribution.get("opt_1"), Some(&1));
    assert_eq!(verdict.result(true), "PASS");
}

#[test]
fn second_correct_option_fails_only_in_strict_mode() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("batch.json");
    let broken = VALID_BATCH.replacen(
        r#""text": "1", "is_correct": false"#,
        r#""text": "1", "is_correct": true"#,
        1,
    );
    fs::write(&path, broken).expect("write batch");

    let verdict = validate_file(&path);
    assert_eq!(verdict.issues.len(), 1);
    assert_eq!(verdict.result(false), "PASS");
    assert_eq!(verdict.result(true), "FAIL");
}

#[test]
fn malformed_json_reports_position() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("batch.json");
    fs::write(&path, "[\n  {\"content\": }\n]").expect("write batch");

    let verdict = validate_file(&path);
    let error = verdict.load_error.as_deref().expect("parse error");
    assert!(error.contains("line 2"));
    assert_eq!(verdict.result(false), "FAIL");
}
