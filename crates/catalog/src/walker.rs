//! Asynchronous recursive directory walker.
//!
//! The walk is a depth-unbounded, unordered traversal: every directory is
//! listed by its own task in a [`JoinSet`], so sibling subtrees proceed
//! concurrently and completions arrive in arbitrary order. Discovered files
//! stream over an [`mpsc`] channel; the channel closes only once every
//! spawned listing task has settled, which makes the end of the walk
//! observable to the consumer.
//!
//! A directory that cannot be listed is logged and skipped without aborting
//! sibling subtrees.

use std::path::PathBuf;

use tokio::fs;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::cancel::CancelToken;

/// A plain file discovered during a walk. Visited exactly once per scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// The filename component, lossily decoded.
    pub name: String,
}

/// Counters accumulated over one walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    /// Files sent to the consumer.
    pub files: usize,
    /// Directories listed successfully.
    pub directories: usize,
    /// Subtrees skipped because their directory could not be listed.
    pub skipped: usize,
}

impl WalkStats {
    /// Folds another walk's counters into this one.
    pub fn merge(&mut self, other: WalkStats) {
        self.files += other.files;
        self.directories += other.directories;
        self.skipped += other.skipped;
    }
}

/// Outcome of listing a single directory.
enum Listing {
    Listed {
        subdirs: Vec<PathBuf>,
        files_sent: usize,
    },
    Skipped,
    Cancelled,
}

/// Walks `root` recursively, sending every plain file to `files`.
///
/// Returns once all outstanding per-directory tasks have settled. The
/// caller observes completion as the channel closing after the final
/// [`FileEntry`]. Cancellation is honored at the start of each directory
/// listing; directories already being listed finish normally.
pub async fn walk(root: PathBuf, cancel: CancelToken, files: mpsc::Sender<FileEntry>) -> WalkStats {
    let mut stats = WalkStats::default();
    let mut tasks = JoinSet::new();
    tasks.spawn(list_directory(root, files.clone(), cancel.clone()));

    while let Some(joined) = tasks.join_next().await {
        let listing = match joined {
            Ok(listing) => listing,
            Err(error) => {
                log::warn!("directory listing task failed: {error}");
                stats.skipped += 1;
                continue;
            }
        };
        match listing {
            Listing::Listed {
                subdirs,
                files_sent,
            } => {
                stats.directories += 1;
                stats.files += files_sent;
                for subdir in subdirs {
                    tasks.spawn(list_directory(subdir, files.clone(), cancel.clone()));
                }
            }
            Listing::Skipped => stats.skipped += 1,
            Listing::Cancelled => {}
        }
    }
    stats
}

/// Lists one directory level: files go to the channel, subdirectories are
/// returned for the driver to spawn.
async fn list_directory(
    dir: PathBuf,
    files: mpsc::Sender<FileEntry>,
    cancel: CancelToken,
) -> Listing {
    if cancel.is_cancelled() {
        return Listing::Cancelled;
    }

    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(error) => {
            log::warn!("cannot list {}: {error}", dir.display());
            return Listing::Skipped;
        }
    };

    let mut subdirs = Vec::new();
    let mut files_sent = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(error) => {
                // The remainder of this directory is unreadable; siblings
                // already collected still proceed.
                log::warn!("cannot read entry in {}: {error}", dir.display());
                break;
            }
        };

        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(error) => {
                log::warn!("cannot stat {}: {error}", entry.path().display());
                continue;
            }
        };

        if file_type.is_dir() {
            subdirs.push(entry.path());
        } else {
            let name = entry.file_name().to_string_lossy().into_owned();
            let sent = files
                .send(FileEntry {
                    path: entry.path(),
                    name,
                })
                .await;
            if sent.is_err() {
                // Consumer is gone; stop producing.
                return Listing::Cancelled;
            }
            files_sent += 1;
        }
    }

    Listing::Listed {
        subdirs,
        files_sent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs::{create_dir, create_dir_all, File};
    use tempfile::TempDir;

    async fn collect(root: PathBuf, cancel: CancelToken) -> (Vec<FileEntry>, WalkStats) {
        let (tx, mut rx) = mpsc::channel(16);
        let walk_task = tokio::spawn(walk(root, cancel, tx));
        let mut entries = Vec::new();
        while let Some(entry) = rx.recv().await {
            entries.push(entry);
        }
        let stats = walk_task.await.expect("walk task");
        (entries, stats)
    }

    #[tokio::test]
    async fn visits_every_file_across_nesting_levels() {
        let temp = TempDir::new().unwrap();
        create_dir_all(temp.path().join("a/deep/deeper")).unwrap();
        create_dir(temp.path().join("b")).unwrap();
        File::create(temp.path().join("top.wad")).unwrap();
        File::create(temp.path().join("a/mid.pk3")).unwrap();
        File::create(temp.path().join("a/deep/deeper/leaf.txt")).unwrap();
        File::create(temp.path().join("b/other.exe")).unwrap();

        let (entries, stats) = collect(temp.path().to_path_buf(), CancelToken::new()).await;

        let names: BTreeSet<_> = entries.iter().map(|entry| entry.name.clone()).collect();
        assert_eq!(names.len(), entries.len(), "each file visited exactly once");
        assert_eq!(
            names,
            ["top.wad", "mid.pk3", "leaf.txt", "other.exe"]
                .map(String::from)
                .into_iter()
                .collect()
        );
        assert_eq!(stats.files, 4);
        assert_eq!(stats.directories, 5);
        assert_eq!(stats.skipped, 0);
    }

    #[tokio::test]
    async fn missing_root_is_skipped_not_fatal() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("does-not-exist");

        let (entries, stats) = collect(missing, CancelToken::new()).await;

        assert!(entries.is_empty());
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.files, 0);
    }

    #[tokio::test]
    async fn cancelled_walk_produces_nothing() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("a.wad")).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let (entries, stats) = collect(temp.path().to_path_buf(), cancel).await;

        assert!(entries.is_empty());
        assert_eq!(stats.files, 0);
    }

    #[tokio::test]
    async fn empty_directory_yields_no_files() {
        let temp = TempDir::new().unwrap();
        let (entries, stats) = collect(temp.path().to_path_buf(), CancelToken::new()).await;

        assert!(entries.is_empty());
        assert_eq!(stats.directories, 1);
    }
}
