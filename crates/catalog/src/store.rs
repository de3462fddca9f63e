//! File-backed document store for catalog records.
//!
//! The store holds named collections of schemaless records and persists the
//! whole catalog as one pretty-printed JSON file. Every committed mutation
//! rewrites the file atomically (temp file + rename), so a crash mid-write
//! never corrupts the catalog. Records are sparse and additive: the upsert
//! primitive merges incoming fields onto the existing record instead of
//! replacing it, and is the sole mutation path into any collection.
//!
//! All mutations serialize through one internal lock, so two concurrent
//! upserts racing on the same key merge atomically rather than losing an
//! update.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{CatalogError, Result};

/// A schemaless catalog record: a flat map of field name to JSON value.
pub type Record = serde_json::Map<String, Value>;

/// What an upsert did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// No record with the key existed; the candidate was inserted verbatim.
    Inserted,
    /// A record existed and at least one field changed.
    Updated,
    /// A record existed and every incoming field already matched.
    /// Nothing was written and the mutation counter did not move.
    Unchanged,
}

#[derive(Default)]
struct StoreInner {
    collections: BTreeMap<String, Vec<Record>>,
    mutations: u64,
}

/// Process-local document store, durable across restarts.
pub struct CatalogStore {
    path: PathBuf,
    inner: Mutex<StoreInner>,
}

impl CatalogStore {
    /// Opens the store at `path`, loading the existing catalog file if one
    /// is present. A missing file yields an empty store; the file is created
    /// on the first committed mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let collections = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => return Err(error.into()),
        };
        let inner = StoreInner {
            collections,
            mutations: 0,
        };
        log::debug!(
            "opened catalog store at {} ({} collections)",
            path.display(),
            inner.collections.len()
        );
        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    /// Creates the named collection if it does not exist yet.
    /// Safe to call repeatedly with the same name.
    pub fn ensure_collection(&self, name: &str) {
        let mut inner = self.inner.lock();
        inner.collections.entry(name.to_string()).or_default();
    }

    /// Inserts `record` into `collection`, or merges its fields onto the
    /// existing record whose `key_field` value matches.
    ///
    /// The merge is field-level and additive: fields absent from `record`
    /// are left untouched, incoming fields win on conflict. After the call
    /// exactly one record with that key exists. The candidate must carry
    /// the key field.
    ///
    /// A committed insert or update persists the store before returning.
    pub fn upsert(&self, collection: &str, key_field: &str, record: Record) -> Result<Upsert> {
        let key = record
            .get(key_field)
            .cloned()
            .ok_or_else(|| {
                CatalogError::InvalidRecord(format!(
                    "upsert into {collection} is missing key field {key_field}"
                ))
            })?;

        let mut inner = self.inner.lock();
        let records = inner.collections.entry(collection.to_string()).or_default();

        let outcome = match records
            .iter_mut()
            .find(|existing| existing.get(key_field) == Some(&key))
        {
            Some(existing) => {
                let mut changed = false;
                for (field, value) in record {
                    if existing.get(&field) != Some(&value) {
                        existing.insert(field, value);
                        changed = true;
                    }
                }
                if changed {
                    Upsert::Updated
                } else {
                    Upsert::Unchanged
                }
            }
            None => {
                records.push(record);
                Upsert::Inserted
            }
        };

        if outcome != Upsert::Unchanged {
            inner.mutations += 1;
            persist(&self.path, &inner.collections)?;
        }
        Ok(outcome)
    }

    /// Looks up the record in `collection` whose `key_field` equals `key`.
    pub fn find(&self, collection: &str, key_field: &str, key: &str) -> Option<Record> {
        let inner = self.inner.lock();
        inner.collections.get(collection).and_then(|records| {
            records
                .iter()
                .find(|record| record.get(key_field).and_then(Value::as_str) == Some(key))
                .cloned()
        })
    }

    /// Returns the first record in `collection` matching `predicate`.
    pub fn find_where(
        &self,
        collection: &str,
        predicate: impl Fn(&Record) -> bool,
    ) -> Option<Record> {
        let inner = self.inner.lock();
        inner
            .collections
            .get(collection)
            .and_then(|records| records.iter().find(|record| predicate(record)).cloned())
    }

    /// Number of records in `collection` (0 if it does not exist).
    pub fn collection_len(&self, collection: &str) -> usize {
        let inner = self.inner.lock();
        inner
            .collections
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Names of all collections, in sorted order.
    pub fn collection_names(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner.collections.keys().cloned().collect()
    }

    /// Number of mutations committed since the store was opened.
    /// No-op upserts do not count.
    pub fn mutation_count(&self) -> u64 {
        self.inner.lock().mutations
    }

    /// Forces a write of the current state to the backing file.
    pub fn flush(&self) -> Result<()> {
        let inner = self.inner.lock();
        persist(&self.path, &inner.collections)
    }
}

/// Writes the catalog snapshot atomically: temp file, then rename.
fn persist(path: &Path, collections: &BTreeMap<String, Vec<Record>>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(collections)?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    log::debug!(
        "wrote catalog store to {} ({} collections)",
        path.display(),
        collections.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(fields: Value) -> Record {
        fields.as_object().expect("object literal").clone()
    }

    fn open_store(temp: &TempDir) -> CatalogStore {
        CatalogStore::open(temp.path().join("catalog.json")).expect("open store")
    }

    #[test]
    fn insert_then_find() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let outcome = store
            .upsert(
                "pwads",
                "filename",
                record(json!({"filename": "a.wad", "filepath": "/x/a.wad"})),
            )
            .unwrap();
        assert_eq!(outcome, Upsert::Inserted);

        let found = store.find("pwads", "filename", "a.wad").unwrap();
        assert_eq!(found.get("filepath"), Some(&json!("/x/a.wad")));
    }

    #[test]
    fn upsert_merges_without_replacing() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store
            .upsert(
                "pwads",
                "filename",
                record(json!({"filename": "a.wad", "filepath": "/x"})),
            )
            .unwrap();
        let outcome = store
            .upsert(
                "pwads",
                "filename",
                record(json!({"filename": "a.wad", "longDescription": "desc"})),
            )
            .unwrap();
        assert_eq!(outcome, Upsert::Updated);

        let found = store.find("pwads", "filename", "a.wad").unwrap();
        assert_eq!(found.get("filepath"), Some(&json!("/x")));
        assert_eq!(found.get("longDescription"), Some(&json!("desc")));
        assert_eq!(store.collection_len("pwads"), 1);
    }

    #[test]
    fn upsert_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let candidate = record(json!({"filename": "a.wad", "filepath": "/x"}));

        assert_eq!(
            store.upsert("pwads", "filename", candidate.clone()).unwrap(),
            Upsert::Inserted
        );
        let mutations = store.mutation_count();
        assert_eq!(
            store.upsert("pwads", "filename", candidate).unwrap(),
            Upsert::Unchanged
        );
        assert_eq!(store.mutation_count(), mutations);
        assert_eq!(store.collection_len("pwads"), 1);
    }

    #[test]
    fn key_stays_unique_across_conflicting_upserts() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        for path in ["/a", "/b", "/c"] {
            store
                .upsert(
                    "iwads",
                    "filename",
                    record(json!({"filename": "doom.wad", "filepath": path})),
                )
                .unwrap();
        }

        assert_eq!(store.collection_len("iwads"), 1);
        let found = store.find("iwads", "filename", "doom.wad").unwrap();
        assert_eq!(found.get("filepath"), Some(&json!("/c")));
    }

    #[test]
    fn upsert_without_key_field_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let result = store.upsert("pwads", "filename", record(json!({"filepath": "/x"})));
        assert!(matches!(result, Err(CatalogError::InvalidRecord(_))));
        assert_eq!(store.collection_len("pwads"), 0);
    }

    #[test]
    fn survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.json");

        {
            let store = CatalogStore::open(&path).unwrap();
            store
                .upsert(
                    "sourceports",
                    "filename",
                    record(json!({"filename": "engine.exe", "filepath": "/ports/engine.exe"})),
                )
                .unwrap();
        }

        let reopened = CatalogStore::open(&path).unwrap();
        let found = reopened
            .find("sourceports", "filename", "engine.exe")
            .unwrap();
        assert_eq!(found.get("filepath"), Some(&json!("/ports/engine.exe")));
    }

    #[test]
    fn ensure_collection_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store.ensure_collection("pwads");
        store.ensure_collection("pwads");

        assert_eq!(store.collection_names(), vec!["pwads".to_string()]);
        assert_eq!(store.collection_len("pwads"), 0);
    }

    #[test]
    fn flush_writes_a_snapshot_even_without_mutations() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.json");

        let store = CatalogStore::open(&path).unwrap();
        store.ensure_collection("pwads");
        assert!(!path.exists(), "no mutation committed yet");

        store.flush().unwrap();

        let reopened = CatalogStore::open(&path).unwrap();
        assert_eq!(reopened.collection_names(), vec!["pwads".to_string()]);
    }

    #[test]
    fn corrupt_store_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            CatalogStore::open(&path),
            Err(CatalogError::Json(_))
        ));
    }
}
