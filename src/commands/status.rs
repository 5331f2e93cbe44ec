use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::store::{QuestionStore, StoreLocation, resolve_store_uri};

pub fn run(args: StatusArgs) -> Result<()> {
    let uri = resolve_store_uri(args.store.store_uri.as_deref(), &args.store.env_file)?;
    let location = StoreLocation::parse(&uri, args.store.collection.as_deref())?;

    info!(
        path = %location.path.display(),
        database = %location.database,
        collection = %location.collection,
        "status requested"
    );

    if !location.path.exists() {
        warn!(path = %location.path.display(), "database file missing");
        return Ok(());
    }

    let store = QuestionStore::open(location)?;
    let counts = store.batch_counts()?;
    if counts.is_empty() {
        warn!("collection is empty");
    }

    for count in &counts {
        info!(
            batch = %count.import_batch,
            questions = count.questions,
            needs_review = count.needs_review,
            "batch status"
        );
    }

    info!(
        batches = counts.len(),
        questions = store.total_count()?,
        "collection status"
    );

    Ok(())
}
