//! SP-006: Polling change detection for watch mode.
//!
//! A snapshot maps every regular, non-hidden file under the project root to
//! its modification time, length and BLAKE3 hash. Only files whose mtime or
//! length moved since the previous snapshot are re-hashed. A rebuild is due
//! when the snapshot differs from the baseline and the debounce interval has
//! passed since the last rebuild.

use super::hasher;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// Delay between snapshots.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Minimum gap between two rebuilds.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

/// Observed state of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
    pub hash: String,
}

pub type Snapshot = BTreeMap<PathBuf, FileStamp>;

/// Snapshot the tree under `root`, leaving out hidden entries and `ignored`
/// paths. Stamps from `previous` are reused for files whose mtime and length
/// are unchanged. Files that vanish or become unreadable mid-walk are skipped.
pub fn snapshot(root: &Path, ignored: &[PathBuf], previous: &Snapshot) -> Snapshot {
    let mut files = Snapshot::new();
    walk(root, ignored, previous, &mut files);
    files
}

fn walk(dir: &Path, ignored: &[PathBuf], previous: &Snapshot, files: &mut Snapshot) {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in read_dir.flatten() {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if ignored.iter().any(|p| p == &path) {
            continue;
        }
        let Ok(ft) = entry.file_type() else {
            continue;
        };
        if ft.is_dir() {
            walk(&path, ignored, previous, files);
        } else if ft.is_file() {
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let modified = meta.modified().ok();
            let len = meta.len();

            let unchanged = previous.get(&path).filter(|old| {
                old.modified.is_some() && old.modified == modified && old.len == len
            });
            if let Some(old) = unchanged {
                files.insert(path, old.clone());
            } else if let Ok(hash) = hasher::hash_file(&path) {
                files.insert(path, FileStamp { modified, len, hash });
            }
        }
    }
}

/// Tracks a project tree between rebuilds.
#[derive(Debug)]
pub struct Watcher {
    root: PathBuf,
    ignored: Vec<PathBuf>,
    baseline: Snapshot,
    last_build: Option<Instant>,
    debounce: Duration,
}

impl Watcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let baseline = snapshot(&root, &[], &Snapshot::new());
        Self {
            root,
            ignored: Vec::new(),
            baseline,
            last_build: None,
            debounce: DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Exclude a path (typically the written artifact) from change tracking.
    pub fn ignore(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.ignored.contains(&path) {
            self.baseline.remove(&path);
            self.ignored.push(path);
        }
    }

    pub fn tracked_files(&self) -> usize {
        self.baseline.len()
    }

    /// Take a fresh snapshot. Returns true when a rebuild is due; the new
    /// snapshot then becomes the baseline. A change inside the debounce
    /// window stays pending for a later poll.
    pub fn poll(&mut self) -> bool {
        let current = snapshot(&self.root, &self.ignored, &self.baseline);
        if current == self.baseline {
            return false;
        }
        if let Some(last) = self.last_build {
            if last.elapsed() < self.debounce {
                return false;
            }
        }
        tracing::debug!(
            before = self.baseline.len(),
            after = current.len(),
            "tree changed"
        );
        self.baseline = current;
        true
    }

    /// Record that a rebuild just finished.
    pub fn mark_built(&mut self) {
        self.last_build = Some(Instant::now());
    }
}
