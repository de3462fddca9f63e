//! Ingestion actions: how one classified file becomes a catalog record.
//!
//! Every action funnels into [`CatalogStore::upsert`], so records accumulate
//! fields progressively: a file may be registered by extension first and
//! enriched by its JSON or text sidecar later, in any order. Failures are
//! handled here and reported as an outcome; they never abort the scan.

use std::sync::Arc;

use serde_json::Value;

use crate::classifier::{Action, Classifier};
use crate::store::{CatalogStore, Record, Upsert};
use crate::walker::FileEntry;

/// Unique-key field of every catalog record.
pub const FILENAME_FIELD: &str = "filename";
/// Absolute path observed during the most recent scan. Overwritten, not
/// merged, whenever an ingestion supplies a new path.
pub const FILEPATH_FIELD: &str = "filepath";
/// Free text from a plain-text sidecar.
pub const LONG_DESCRIPTION_FIELD: &str = "longDescription";

/// Terminal state of one scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Direct registration committed an insert or update.
    Registered,
    /// A sidecar merge committed an insert or update.
    Merged,
    /// The store already held identical values; nothing was written.
    Unchanged,
    /// Extension not recognized by the classifier, or a JSON sidecar
    /// referencing a file the classifier does not catalog.
    Ignored,
    /// A text sidecar with no matching record; its text is discarded.
    Orphaned,
    /// Read, parse, or store failure. Logged; the file is skipped whole.
    Failed,
}

/// Classifies `entry` and performs the resulting ingestion action.
pub async fn ingest_file(
    store: Arc<CatalogStore>,
    classifier: Classifier,
    entry: FileEntry,
) -> IngestOutcome {
    match classifier.classify(&entry.name) {
        Action::Register { collection } => register(&store, collection, &entry),
        Action::MergeJson => merge_json(&store, classifier, &entry).await,
        Action::MergeText => merge_text(&store, classifier, &entry).await,
        Action::Ignore => IngestOutcome::Ignored,
    }
}

/// Direct registration: presence and location, no descriptive metadata.
fn register(store: &CatalogStore, collection: &str, entry: &FileEntry) -> IngestOutcome {
    let mut record = Record::new();
    record.insert(FILENAME_FIELD.to_string(), Value::from(entry.name.clone()));
    record.insert(
        FILEPATH_FIELD.to_string(),
        Value::from(entry.path.to_string_lossy().into_owned()),
    );

    match store.upsert(collection, FILENAME_FIELD, record) {
        Ok(Upsert::Inserted) | Ok(Upsert::Updated) => IngestOutcome::Registered,
        Ok(Upsert::Unchanged) => IngestOutcome::Unchanged,
        Err(error) => {
            log::warn!(
                "failed to register {} into {collection}: {error}",
                entry.path.display()
            );
            IngestOutcome::Failed
        }
    }
}

/// Structured-metadata merge: the sidecar's fields are upserted whole, or
/// not at all.
async fn merge_json(
    store: &CatalogStore,
    classifier: Classifier,
    entry: &FileEntry,
) -> IngestOutcome {
    let data = match tokio::fs::read_to_string(&entry.path).await {
        Ok(data) => data,
        Err(error) => {
            log::warn!("cannot read sidecar {}: {error}", entry.path.display());
            return IngestOutcome::Failed;
        }
    };

    let record: Record = match serde_json::from_str::<Value>(&data) {
        Ok(Value::Object(record)) => record,
        Ok(_) => {
            log::warn!("sidecar {} is not a JSON object", entry.path.display());
            return IngestOutcome::Failed;
        }
        Err(error) => {
            log::warn!("cannot parse sidecar {}: {error}", entry.path.display());
            return IngestOutcome::Failed;
        }
    };

    let Some(filename) = record.get(FILENAME_FIELD).and_then(Value::as_str) else {
        log::warn!(
            "sidecar {} has no {FILENAME_FIELD} field",
            entry.path.display()
        );
        return IngestOutcome::Failed;
    };

    let Some(collection) = classifier.json_target(filename) else {
        log::warn!(
            "sidecar {} references {filename}, which the {} scan does not catalog",
            entry.path.display(),
            classifier.name()
        );
        return IngestOutcome::Ignored;
    };

    match store.upsert(collection, FILENAME_FIELD, record) {
        Ok(Upsert::Inserted) | Ok(Upsert::Updated) => IngestOutcome::Merged,
        Ok(Upsert::Unchanged) => IngestOutcome::Unchanged,
        Err(error) => {
            log::warn!(
                "failed to merge sidecar {}: {error}",
                entry.path.display()
            );
            IngestOutcome::Failed
        }
    }
}

/// Free-text merge: attach the sidecar's text to the record whose filename
/// shares the sidecar's base name, only when the text actually changed.
async fn merge_text(
    store: &CatalogStore,
    classifier: Classifier,
    entry: &FileEntry,
) -> IngestOutcome {
    let text = match tokio::fs::read_to_string(&entry.path).await {
        Ok(text) => text,
        Err(error) => {
            log::warn!("cannot read sidecar {}: {error}", entry.path.display());
            return IngestOutcome::Failed;
        }
    };

    let base = stem(&entry.name);
    let collection = classifier.text_collection();
    let existing = store.find_where(collection, |record| {
        record
            .get(FILENAME_FIELD)
            .and_then(Value::as_str)
            .is_some_and(|filename| stem(filename) == base)
    });

    let Some(existing) = existing else {
        // No record to attach the text to; the sidecar is discarded.
        log::debug!(
            "text sidecar {} has no matching record in {collection}",
            entry.path.display()
        );
        return IngestOutcome::Orphaned;
    };

    if existing.get(LONG_DESCRIPTION_FIELD).and_then(Value::as_str) == Some(text.as_str()) {
        return IngestOutcome::Unchanged;
    }

    let Some(filename) = existing.get(FILENAME_FIELD).cloned() else {
        return IngestOutcome::Failed;
    };
    let mut update = Record::new();
    update.insert(FILENAME_FIELD.to_string(), filename);
    update.insert(LONG_DESCRIPTION_FIELD.to_string(), Value::from(text));

    match store.upsert(collection, FILENAME_FIELD, update) {
        Ok(Upsert::Inserted) | Ok(Upsert::Updated) => IngestOutcome::Merged,
        Ok(Upsert::Unchanged) => IngestOutcome::Unchanged,
        Err(error) => {
            log::warn!(
                "failed to merge sidecar {}: {error}",
                entry.path.display()
            );
            IngestOutcome::Failed
        }
    }
}

/// The filename with its final extension stripped; sidecars and their
/// primary files pair up by this base name.
fn stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((base, _)) if !base.is_empty() => base,
        _ => name,
    }
}
