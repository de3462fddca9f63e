//! Scan orchestration.
//!
//! One scan runs the three classifier walks concurrently over their roots.
//! Each walk streams discovered files into per-file ingestion tasks; every
//! completed ingestion feeds one upsert. The whole scan is a single
//! awaitable that resolves once every spawned operation has settled,
//! returning an aggregate [`ScanSummary`].

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::cancel::CancelToken;
use crate::classifier::{Action, Classifier, IWADS, PWADS, SOURCEPORTS, SOURCEPORT_CONFIGS};
use crate::config::CatalogPaths;
use crate::ingest::{ingest_file, IngestOutcome};
use crate::store::CatalogStore;
use crate::walker::{walk, WalkStats};

/// Buffered file entries between the walker and the ingestion fan-out.
const SCAN_CHANNEL_CAPACITY: usize = 64;

/// Aggregate result of a scan, for observability and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Files registered by extension (insert or update committed).
    pub registered: usize,
    /// Sidecar merges committed (JSON fields or long description).
    pub merged: usize,
    /// Ingestions that found the store already up to date.
    pub unchanged: usize,
    /// Files whose extension no classifier recognized.
    pub ignored: usize,
    /// Text sidecars discarded for lack of a matching record.
    pub orphaned_text: usize,
    /// Read, parse, store, or task failures.
    pub errors: usize,
    /// Traversal counters summed over the walks.
    pub walk: WalkStats,
}

impl ScanSummary {
    fn count(&mut self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Registered => self.registered += 1,
            IngestOutcome::Merged => self.merged += 1,
            IngestOutcome::Unchanged => self.unchanged += 1,
            IngestOutcome::Ignored => self.ignored += 1,
            IngestOutcome::Orphaned => self.orphaned_text += 1,
            IngestOutcome::Failed => self.errors += 1,
        }
    }

    /// Folds another walk's summary into this one.
    pub fn merge(&mut self, other: ScanSummary) {
        self.registered += other.registered;
        self.merged += other.merged;
        self.unchanged += other.unchanged;
        self.ignored += other.ignored;
        self.orphaned_text += other.orphaned_text;
        self.errors += other.errors;
        self.walk.merge(other.walk);
    }
}

/// Walks one root under one classifier, ingesting every discovered file.
///
/// Registrations and JSON merges run as their own tasks and may interleave
/// freely; their upserts commute. Text merges are held back until those
/// have settled, because a text sidecar attaches to an existing record and
/// must not lose the race against its sibling file's registration.
/// Cancellation stops new ingestions between suspension points while
/// in-flight upserts complete.
pub async fn scan_root(
    store: Arc<CatalogStore>,
    classifier: Classifier,
    root: PathBuf,
    cancel: CancelToken,
) -> ScanSummary {
    let mut summary = ScanSummary::default();
    let (files_tx, mut files_rx) = mpsc::channel(SCAN_CHANNEL_CAPACITY);
    let walk_task = tokio::spawn(walk(root, cancel.clone(), files_tx));

    let mut ingestions = JoinSet::new();
    let mut text_sidecars = Vec::new();
    while let Some(entry) = files_rx.recv().await {
        if cancel.is_cancelled() {
            // Drain the channel so the walker can finish, but issue nothing new.
            continue;
        }
        if classifier.classify(&entry.name) == Action::MergeText {
            text_sidecars.push(entry);
        } else {
            ingestions.spawn(ingest_file(store.clone(), classifier, entry));
        }
    }
    while let Some(joined) = ingestions.join_next().await {
        match joined {
            Ok(outcome) => summary.count(outcome),
            Err(error) => {
                log::warn!("ingestion task failed: {error}");
                summary.errors += 1;
            }
        }
    }

    for entry in text_sidecars {
        if cancel.is_cancelled() {
            break;
        }
        let outcome = ingest_file(store.clone(), classifier, entry).await;
        summary.count(outcome);
    }

    match walk_task.await {
        Ok(stats) => summary.walk = stats,
        Err(error) => {
            log::warn!("walk task failed: {error}");
            summary.errors += 1;
        }
    }

    log::debug!(
        "{} scan finished: {} registered, {} merged, {} unchanged, {} errors",
        classifier.name(),
        summary.registered,
        summary.merged,
        summary.unchanged,
        summary.errors
    );
    summary
}

/// Runs the three classifier walks concurrently over the catalog roots.
///
/// Re-running against an unchanged tree upserts identical values and
/// changes nothing observable in the store.
pub async fn scan_catalog(
    store: Arc<CatalogStore>,
    paths: &CatalogPaths,
    cancel: CancelToken,
) -> ScanSummary {
    for collection in [PWADS, IWADS, SOURCEPORTS, SOURCEPORT_CONFIGS] {
        store.ensure_collection(collection);
    }

    let (level_mods, base_data, engines) = tokio::join!(
        scan_root(
            store.clone(),
            Classifier::level_mods(),
            paths.pwads(),
            cancel.clone(),
        ),
        scan_root(
            store.clone(),
            Classifier::base_data(),
            paths.iwads(),
            cancel.clone(),
        ),
        scan_root(
            store.clone(),
            Classifier::engines(),
            paths.sourceports(),
            cancel,
        ),
    );

    let mut summary = level_mods;
    summary.merge(base_data);
    summary.merge(engines);
    summary
}
