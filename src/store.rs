use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::debug;

use crate::model::Question;
use crate::util::{ensure_directory, now_utc_string, sha256_hex};

#[cfg(test)]
mod tests;

pub const STORE_URI_VAR: &str = "QUESTION_STORE_URI";
pub const DEFAULT_COLLECTION: &str = "questions";
const SQLITE_SCHEME: &str = "sqlite://";

/// Picks the store URI from the explicit flag, the environment, then the env file.
pub fn resolve_store_uri(explicit: Option<&str>, env_file: &Path) -> Result<String> {
    if let Some(uri) = explicit.map(str::trim).filter(|uri| !uri.is_empty()) {
        return Ok(uri.to_string());
    }

    if let Ok(uri) = env::var(STORE_URI_VAR) {
        if !uri.trim().is_empty() {
            return Ok(uri.trim().to_string());
        }
    }

    if let Some(uri) = uri_from_env_file(env_file)? {
        return Ok(uri);
    }

    bail!(
        "no store URI: pass --store-uri, set {} or add it to {}",
        STORE_URI_VAR,
        env_file.display()
    )
}

pub(crate) fn uri_from_env_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let raw = raw.trim_start_matches('\u{feff}');

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() != STORE_URI_VAR {
            continue;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        if !value.is_empty() {
            return Ok(Some(value.to_string()));
        }
    }

    Ok(None)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub database: String,
    pub collection: String,
}

impl StoreLocation {
    /// Accepts `sqlite://<path>[?collection=<name>]` or a bare path.
    pub fn parse(uri: &str, collection_override: Option<&str>) -> Result<Self> {
        let without_scheme = uri.strip_prefix(SQLITE_SCHEME).unwrap_or(uri);
        if without_scheme.contains("://") {
            bail!("unsupported store URI '{uri}', expected {SQLITE_SCHEME}<path>");
        }

        let (raw_path, query) = match without_scheme.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (without_scheme, None),
        };
        if raw_path.trim().is_empty() {
            bail!("store URI '{uri}' has no database path");
        }

        let uri_collection = query.and_then(|query| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "collection")
                .map(|(_, value)| value)
        });
        let collection = collection_override
            .or(uri_collection)
            .unwrap_or(DEFAULT_COLLECTION)
            .to_string();
        validate_collection_name(&collection)?;

        let path = PathBuf::from(raw_path);
        let database = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("store path has no file name: {}", path.display()))?;

        Ok(Self {
            path,
            database,
            collection,
        })
    }
}

fn validate_collection_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("invalid collection name '{name}': use letters, digits and underscores");
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InsertSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchCount {
    pub import_batch: String,
    pub questions: usize,
    pub needs_review: usize,
}

pub struct QuestionStore {
    connection: Connection,
    location: StoreLocation,
}

impl QuestionStore {
    pub fn open(location: StoreLocation) -> Result<Self> {
        if let Some(parent) = location.path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_directory(parent)?;
            }
        }

        let connection = Connection::open(&location.path)
            .with_context(|| format!("failed to open {}", location.path.display()))?;
        configure_connection(&connection)?;

        let store = Self {
            connection,
            location,
        };
        store.ensure_collection()?;
        Ok(store)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    fn ensure_collection(&self) -> Result<()> {
        let collection = &self.location.collection;
        self.connection
            .execute_batch(&format!(
                "
                CREATE TABLE IF NOT EXISTS {collection} (
                  doc_id TEXT PRIMARY KEY,
                  import_batch TEXT NOT NULL,
                  exam TEXT NOT NULL,
                  year INTEGER NOT NULL,
                  section TEXT NOT NULL,
                  question_number INTEGER NOT NULL,
                  needs_image_review INTEGER NOT NULL,
                  status TEXT NOT NULL,
                  body TEXT NOT NULL,
                  inserted_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_{collection}_import_batch ON {collection}(import_batch);
                "
            ))
            .with_context(|| format!("failed to create collection {collection}"))
    }

    /// Inserts every question in one transaction. Questions already stored
    /// under the same batch, file, section and number are skipped.
    pub fn insert_many(&mut self, questions: &[Question]) -> Result<InsertSummary> {
        let collection = self.location.collection.clone();
        let inserted_at = now_utc_string();
        let tx = self.connection.transaction()?;
        let mut summary = InsertSummary::default();

        {
            let mut statement = tx.prepare(&format!(
                "
                INSERT OR IGNORE INTO {collection}(
                  doc_id, import_batch, exam, year, section, question_number,
                  needs_image_review, status, body, inserted_at
                )
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "
            ))?;

            for question in questions {
                let body = serde_json::to_string(question).with_context(|| {
                    format!(
                        "failed to serialize question {} of {}",
                        question.source.question_number, question.source.file_name
                    )
                })?;
                let changed = statement.execute(params![
                    document_id(question),
                    &question.import_batch,
                    &question.source.exam,
                    question.source.year,
                    &question.source.section,
                    question.source.question_number,
                    question.needs_image_review,
                    question.status.as_str(),
                    body,
                    &inserted_at,
                ])?;

                if changed == 0 {
                    summary.duplicates += 1;
                } else {
                    summary.inserted += 1;
                }
            }
        }

        tx.commit()?;
        debug!(
            collection = %collection,
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            "committed question insert"
        );
        Ok(summary)
    }

    pub fn batch_counts(&self) -> Result<Vec<BatchCount>> {
        let collection = &self.location.collection;
        let mut statement = self.connection.prepare(&format!(
            "
            SELECT import_batch, COUNT(*), SUM(needs_image_review)
            FROM {collection}
            GROUP BY import_batch
            ORDER BY import_batch
            "
        ))?;

        let rows = statement.query_map([], |row| {
            Ok(BatchCount {
                import_batch: row.get(0)?,
                questions: row.get::<_, i64>(1)? as usize,
                needs_review: row.get::<_, Option<i64>>(2)?.unwrap_or(0) as usize,
            })
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    pub fn total_count(&self) -> Result<usize> {
        let collection = &self.location.collection;
        let count: i64 = self.connection.query_row(
            &format!("SELECT COUNT(*) FROM {collection}"),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

/// Stable id so re-importing a batch skips rows it already stored.
fn document_id(question: &Question) -> String {
    sha256_hex(&format!(
        "{}|{}|{}|{}",
        question.import_batch,
        question.source.file_name,
        question.source.section,
        question.source.question_number
    ))
}
