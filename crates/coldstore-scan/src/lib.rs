//! Directory scanning engine for coldstore.
//!
//! `coldstore-scan` walks one archive disk and produces its
//! [`TreeDocument`]. Key features:
//!
//! - **Breadth-first** traversal bounded by `max_depth`
//! - **Resumable** through periodic, atomically written checkpoints
//! - **Cancellable** at every directory boundary via [`CancellationToken`]
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use coldstore_scan::{CancellationToken, ScanConfig, ScanOutcome, TreeScanner};
//!
//! let config = ScanConfig::new("/Volumes/Archive01");
//! let scanner = TreeScanner::new();
//! match scanner.scan(&config, &CancellationToken::new()).unwrap() {
//!     ScanOutcome::Completed(doc) => println!("{} files", doc.statistics.total_files),
//!     ScanOutcome::Interrupted { checkpoint, .. } => {
//!         println!("resume later from {}", checkpoint.display())
//!     }
//! }
//! ```

mod checkpoint;
mod filter;
mod progress;
mod scanner;

pub use checkpoint::{CHECKPOINT_VERSION, CheckpointState, CheckpointStore};
pub use filter::{ExclusionFilter, compile_patterns};
pub use progress::ScanProgress;
pub use scanner::{ScanOutcome, TreeScanner, count_directories};

pub use tokio_util::sync::CancellationToken;

// Re-export core types for convenience
pub use coldstore_core::{
    DirArena, FileCategory, FileRecord, ScanConfig, ScanError, ScanInfo, ScanWarning, Statistics,
    TreeDocument, TreeNode, WarningKind,
};
