//! Built-in extension sets, exclusion rules and scanner identity.

/// Name written to `scan_info.scanner`.
pub const SCANNER_NAME: &str = "coldstore";

/// Version written to `scan_info.version`.
pub const SCANNER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default maximum traversal depth below the scan root.
pub const DEFAULT_MAX_DEPTH: u32 = 8;

/// Default number of processed directories between checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 1000;

/// Extensions included when no allow-list is given: the media and document
/// formats typically found on photo/video archive disks.
pub const DEFAULT_INCLUDE_EXTENSIONS: &[&str] = &[
    // raw photo
    ".cr2", ".cr3", ".nef", ".arw", ".dng", ".iiq", ".3fr", ".orf", ".rw2", ".pef",
    // photo
    ".jpg", ".jpeg", ".png", ".tiff", ".tif", ".psd", ".gif", ".bmp", ".webp",
    // video
    ".mp4", ".mov", ".avi", ".r3d", ".braw", ".mxf", ".mkv", ".wmv", ".m4v",
    // audio
    ".wav", ".aiff", ".mp3", ".flac", ".aac", ".m4a",
    // documents
    ".pdf", ".ai", ".eps", ".indd", ".doc", ".docx",
];

/// Narrower allow-list for photo and video only scans.
pub const PHOTO_VIDEO_EXTENSIONS: &[&str] = &[
    ".cr2", ".cr3", ".nef", ".arw", ".dng", ".iiq", ".3fr", ".orf", ".rw2", ".pef",
    ".jpg", ".jpeg", ".png", ".tiff", ".tif", ".psd", ".gif", ".bmp", ".webp", ".svg",
    ".mp4", ".mov", ".avi", ".r3d", ".braw", ".mxf", ".mkv", ".wmv", ".m4v",
];

/// Regular expressions matched case-insensitively against full paths.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    r"\.DS_Store$",
    r"Thumbs\.db$",
    r"\.tmp$",
    r"\.temp$",
    r"__MACOSX",
    r"System Volume Information",
    r"\$RECYCLE\.BIN",
    r"\.VolumeIcon",
    r"\.localized",
    r"\.Trash",
    r"\$([A-Za-z0-9_]{2})",
];

/// Folder names skipped when they sit directly under the scan root.
/// Matched exactly and case-sensitively.
pub const EXCLUDED_ROOT_FOLDERS: &[&str] = &[
    "Backups.backupdb",
    ".Spotlight-V100",
    ".TemporaryItems",
    ".Trashes",
    ".fseventsd",
    "$RECYCLE.BIN",
    "System Volume Information",
];

pub(crate) fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}
