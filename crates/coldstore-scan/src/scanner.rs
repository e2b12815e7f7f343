//! Breadth-first, depth-bounded, resumable directory scanner.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use coldstore_core::{
    DirId, FileRecord, ScanConfig, ScanError, ScanInfo, ScanWarning, Timestamps, TreeDocument,
};

use crate::checkpoint::{CheckpointState, CheckpointStore};
use crate::filter::ExclusionFilter;
use crate::progress::ScanProgress;

/// How a scan ended.
#[derive(Debug)]
pub enum ScanOutcome {
    /// The walk finished; the document has been written and the checkpoint
    /// removed.
    Completed(TreeDocument),
    /// Cancelled before the walk finished. `saved` tells whether the final
    /// checkpoint reached disk.
    Interrupted { checkpoint: PathBuf, saved: bool },
}

impl ScanOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn document(&self) -> Option<&TreeDocument> {
        match self {
            Self::Completed(doc) => Some(doc),
            Self::Interrupted { .. } => None,
        }
    }

    pub fn into_document(self) -> Option<TreeDocument> {
        match self {
            Self::Completed(doc) => Some(doc),
            Self::Interrupted { .. } => None,
        }
    }
}

/// Single-threaded scanner producing one [`TreeDocument`] per root.
///
/// Directories are processed level by level. Each processed directory is
/// listed exactly once; progress is published after it and the whole state
/// is checkpointed every `checkpoint_interval` directories.
pub struct TreeScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl TreeScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Scan `config.root`, resuming from its checkpoint when allowed.
    ///
    /// Fails only when the root is unusable, a pattern does not compile, or
    /// the finished document cannot be validated or written. Problems with
    /// individual entries end up in `statistics.errors_warnings`.
    pub fn scan(
        &self,
        config: &ScanConfig,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, ScanError> {
        let root = resolve_root(&config.root)?;
        let filter = ExclusionFilter::new(config)?;
        let store = CheckpointStore::new(config.checkpoint_path());
        let state = initial_state(config, &root, &store);

        tracing::info!(
            root = %root.display(),
            max_depth = config.max_depth,
            resumed = state.scan_info.resumed_from_checkpoint,
            "starting scan"
        );

        let estimate = if config.precount {
            let estimate = count_directories(config, &root, &filter, cancel);
            if let Some(count) = estimate {
                tracing::info!(directories = count, "counted directories");
            }
            estimate
        } else {
            None
        };

        let mut walker = Walker {
            config,
            filter,
            store,
            state,
            estimate,
            progress_tx: &self.progress_tx,
        };

        if !walker.walk(cancel) {
            let saved = walker.checkpoint();
            tracing::info!(
                checkpoint = %walker.store.path().display(),
                saved,
                "scan interrupted"
            );
            return Ok(ScanOutcome::Interrupted {
                checkpoint: walker.store.path().to_path_buf(),
                saved,
            });
        }

        walker.checkpoint();
        walker.finish(&config.output_path()).map(ScanOutcome::Completed)
    }
}

impl Default for TreeScanner {
    fn default() -> Self {
        Self::new()
    }
}

struct Walker<'a> {
    config: &'a ScanConfig,
    filter: ExclusionFilter,
    store: CheckpointStore,
    state: CheckpointState,
    estimate: Option<u64>,
    progress_tx: &'a broadcast::Sender<ScanProgress>,
}

/// Immediate contents of one directory, accepted by the filter.
#[derive(Default)]
struct Listing {
    subdirs: Vec<(String, PathBuf)>,
    files: Vec<FileRecord>,
}

impl Walker<'_> {
    /// Run the queue to exhaustion. Returns false if cancelled.
    fn walk(&mut self, cancel: &CancellationToken) -> bool {
        let max_depth = self.config.max_depth;
        let interval = self.config.checkpoint_interval;
        let mut queue = VecDeque::from([(self.state.arena.root_id(), 0u32)]);
        let mut since_checkpoint = 0usize;

        while let Some((id, depth)) = queue.pop_front() {
            if cancel.is_cancelled() {
                return false;
            }
            if depth > max_depth {
                continue;
            }
            let Some(path) = self.state.arena.get(id).map(|node| node.path.clone()) else {
                continue;
            };

            // Visited directories keep their committed children; only their
            // descendants may still need work.
            if !self.state.visited.contains(&path) {
                self.expand(id, &path, depth);
                self.state.statistics.record_processed(depth);
                self.publish(&path, depth);
                self.state.visited.insert(path);

                since_checkpoint += 1;
                if interval > 0 && since_checkpoint >= interval {
                    self.checkpoint();
                    since_checkpoint = 0;
                }
            }

            queue.extend(
                self.state
                    .arena
                    .children(id)
                    .into_iter()
                    .map(|child| (child, depth + 1)),
            );
        }
        true
    }

    /// List a directory and commit its children and files in one step.
    fn expand(&mut self, id: DirId, dir: &Path, depth: u32) {
        let Some(relative) = self.state.arena.get(id).map(|n| n.relative_path.clone()) else {
            return;
        };
        let Some(listing) = self.read_listing(dir, &relative, depth) else {
            return;
        };

        for (name, path) in listing.subdirs {
            if let Some((_, true)) = self.state.arena.add_child(id, &name, path) {
                self.state.statistics.record_dir();
            }
        }
        for file in &listing.files {
            self.state.statistics.record_file(file);
        }
        self.state.arena.replace_files(id, listing.files);
    }

    fn read_listing(&mut self, dir: &Path, relative: &str, depth: u32) -> Option<Listing> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                self.warn(ScanWarning::read_error(dir, &err));
                return None;
            }
        };

        let mut entries: Vec<fs::DirEntry> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    self.warn(ScanWarning::read_error(dir, &err));
                    None
                }
            })
            .collect();
        entries.sort_by_key(|entry| entry.file_name());

        let root = self.state.root.clone();
        let follow = self.config.follow_symlinks;
        let mut listing = Listing::default();

        for entry in entries {
            let path = entry.path();
            let file_name = entry.file_name();
            let lossy = file_name.to_str().is_none();
            let name = file_name.to_string_lossy().into_owned();

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    self.warn(ScanWarning::metadata_error(&path, &err));
                    continue;
                }
            };

            let (is_dir, is_file) = if file_type.is_symlink() {
                if !follow {
                    tracing::debug!(path = %path.display(), "skipping symlink");
                    continue;
                }
                match fs::metadata(&path) {
                    Ok(target) => (target.is_dir(), target.is_file()),
                    Err(err) => {
                        self.warn(ScanWarning::metadata_error(&path, &err));
                        continue;
                    }
                }
            } else {
                (file_type.is_dir(), file_type.is_file())
            };

            if is_dir {
                if depth + 1 > self.config.max_depth {
                    continue;
                }
                if self.filter.should_exclude_dir(&path, &root) {
                    tracing::debug!(path = %path.display(), "excluded directory");
                    continue;
                }
                if follow && !self.claim_real_path(&path) {
                    continue;
                }
                if lossy {
                    self.warn(ScanWarning::lossy_name(&path));
                }
                listing.subdirs.push((name, path));
            } else if is_file {
                if self.filter.should_exclude_file(&path, &name) {
                    tracing::trace!(path = %path.display(), "excluded file");
                    continue;
                }
                match fs::metadata(&path) {
                    Ok(meta) => {
                        if lossy {
                            self.warn(ScanWarning::lossy_name(&path));
                        }
                        let timestamps =
                            Timestamps::from_system(meta.modified().ok(), meta.created().ok());
                        listing
                            .files
                            .push(FileRecord::new(name, path, relative, meta.len(), timestamps));
                    }
                    Err(err) => self.warn(ScanWarning::metadata_error(&path, &err)),
                }
            }
        }

        Some(listing)
    }

    /// Record the canonical path of a directory reached while following
    /// links. Returns false if it was already reached another way.
    fn claim_real_path(&mut self, path: &Path) -> bool {
        match fs::canonicalize(path) {
            Ok(real) => {
                if self.state.real_paths.contains(&real) {
                    self.warn(ScanWarning::symlink_loop(path, real));
                    false
                } else {
                    self.state.real_paths.insert(real);
                    true
                }
            }
            Err(err) => {
                self.warn(ScanWarning::metadata_error(path, &err));
                false
            }
        }
    }

    fn warn(&mut self, warning: ScanWarning) {
        tracing::warn!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
        self.state.statistics.record_warning(&warning);
    }

    fn publish(&self, path: &Path, depth: u32) {
        let stats = &self.state.statistics;
        let progress = ScanProgress {
            dirs_processed: stats.directory_depth_distribution.values().sum(),
            dirs_estimated: self.estimate,
            files_found: stats.total_files,
            bytes_found: stats.total_size,
            current_path: path.to_path_buf(),
            depth,
            errors_count: stats.errors_warnings.len() as u64,
            elapsed: elapsed_since(self.state.started_at),
        };
        // No subscribers is fine.
        let _ = self.progress_tx.send(progress);
    }

    /// Save the current state. Failures are logged and never abort the scan.
    fn checkpoint(&mut self) -> bool {
        self.state.saved_at = Utc::now();
        match self.store.save(&self.state) {
            Ok(()) => {
                tracing::info!(
                    path = %self.store.path().display(),
                    visited = self.state.visited.len(),
                    files = self.state.statistics.total_files,
                    "checkpoint saved"
                );
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "checkpoint save failed, continuing without it");
                false
            }
        }
    }

    /// Build, validate and write the document, then drop the checkpoint.
    fn finish(self, output: &Path) -> Result<TreeDocument, ScanError> {
        let Walker { state, store, .. } = self;
        let mut statistics = state.statistics;
        statistics.finish(elapsed_since(state.started_at));

        let document = TreeDocument {
            scan_info: state.scan_info,
            statistics,
            tree: state.arena.to_tree_node(),
        };
        document.validate()?;
        document.write_to(output)?;

        if let Err(err) = store.clear() {
            tracing::warn!(error = %err, "could not remove checkpoint");
        }

        tracing::info!(
            output = %output.display(),
            files = document.statistics.total_files,
            directories = document.statistics.total_directories,
            bytes = document.statistics.total_size,
            seconds = document.statistics.scan_duration_seconds,
            warnings = document.statistics.errors_warnings.len(),
            "scan complete"
        );
        Ok(document)
    }
}

/// Canonicalize the root and make sure it is a directory.
fn resolve_root(root: &Path) -> Result<PathBuf, ScanError> {
    let root = root.canonicalize().map_err(|e| ScanError::io(root, e))?;
    if !root.is_dir() {
        return Err(ScanError::NotADirectory { path: root });
    }
    Ok(root)
}

/// Adopt a usable checkpoint or start over.
fn initial_state(config: &ScanConfig, root: &Path, store: &CheckpointStore) -> CheckpointState {
    let fresh_info = ScanInfo::new(root, config);

    if config.resume {
        if let Some(mut state) = store.load(root) {
            if same_parameters(&state.scan_info, &fresh_info) {
                tracing::info!(
                    path = %store.path().display(),
                    visited = state.visited.len(),
                    started_at = %state.started_at,
                    "resuming from checkpoint"
                );
                state.scan_info.resumed_from_checkpoint = true;
                return state;
            }
            tracing::info!(
                path = %store.path().display(),
                "checkpoint was taken with different scan parameters, starting fresh"
            );
        }
    } else if store.exists() {
        tracing::info!(path = %store.path().display(), "resume disabled, ignoring checkpoint");
    }

    CheckpointState::new(root, fresh_info)
}

fn same_parameters(saved: &ScanInfo, current: &ScanInfo) -> bool {
    saved.max_depth == current.max_depth
        && saved.include_extensions == current.include_extensions
        && saved.exclude_patterns == current.exclude_patterns
        && saved.excluded_root_folders == current.excluded_root_folders
        && saved.follow_symlinks == current.follow_symlinks
}

/// Count the directories the walk will process, root included.
///
/// Uses the same depth, exclusion and symlink rules as the walk, and the
/// same breadth-first, name-sorted order, so followed links claim the same
/// canonical directories. Returns `None` if cancelled.
pub fn count_directories(
    config: &ScanConfig,
    root: &Path,
    filter: &ExclusionFilter,
    cancel: &CancellationToken,
) -> Option<u64> {
    let follow = config.follow_symlinks;
    let mut seen: HashSet<PathBuf> = HashSet::from([root.to_path_buf()]);
    let mut queue = VecDeque::from([(root.to_path_buf(), 0u32)]);
    let mut count = 0u64;

    while let Some((dir, depth)) = queue.pop_front() {
        if cancel.is_cancelled() {
            return None;
        }
        count += 1;
        if depth >= config.max_depth {
            continue;
        }
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        let mut entries: Vec<fs::DirEntry> = entries.flatten().collect();
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            let is_dir = if file_type.is_symlink() {
                follow && path.is_dir()
            } else {
                file_type.is_dir()
            };
            if !is_dir || filter.should_exclude_dir(&path, root) {
                continue;
            }
            if follow {
                let Ok(real) = fs::canonicalize(&path) else {
                    continue;
                };
                if !seen.insert(real) {
                    continue;
                }
            }
            queue.push_back((path, depth + 1));
        }
    }
    Some(count)
}

fn elapsed_since(started_at: DateTime<Utc>) -> Duration {
    (Utc::now() - started_at).to_std().unwrap_or_default()
}
