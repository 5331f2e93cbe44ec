use std::collections::BTreeSet;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ImportArgs;
use crate::extract::structural_issues;
use crate::model::Question;
use crate::store::{QuestionStore, StoreLocation, resolve_store_uri};
use crate::util::read_json;

pub fn run(args: ImportArgs) -> Result<()> {
    let questions: Vec<Question> = read_json(&args.input)?;
    let batches = questions
        .iter()
        .map(|question| question.import_batch.as_str())
        .collect::<BTreeSet<&str>>();

    info!(
        input = %args.input.display(),
        questions = questions.len(),
        batches = %batches.into_iter().collect::<Vec<&str>>().join(","),
        "loaded question batch"
    );

    let issues = structural_issues(&questions);
    if !issues.is_empty() {
        warn!(
            issues = issues.len(),
            "batch has structural issues; run validate for details"
        );
    }

    let uri = resolve_store_uri(args.store.store_uri.as_deref(), &args.store.env_file)?;
    let location = StoreLocation::parse(&uri, args.store.collection.as_deref())?;

    if args.dry_run {
        info!(
            path = %location.path.display(),
            database = %location.database,
            collection = %location.collection,
            questions = questions.len(),
            "import dry-run complete"
        );
        return Ok(());
    }

    let mut store = QuestionStore::open(location)?;
    let summary = store.insert_many(&questions)?;
    let location = store.location();

    info!(
        database = %location.database,
        collection = %location.collection,
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        total = store.total_count()?,
        "import completed"
    );

    Ok(())
}
