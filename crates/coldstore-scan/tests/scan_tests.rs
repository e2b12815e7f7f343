use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use chrono::Utc;
use coldstore_core::Timestamps;
use coldstore_scan::{
    CancellationToken, CheckpointState, CheckpointStore, FileCategory, FileRecord, ScanConfig,
    ScanError, ScanInfo, ScanOutcome, Statistics, TreeDocument, TreeScanner,
};
use tempfile::TempDir;

/// Disk layout used by most tests:
///
/// ```text
/// disk/
///   A/a.jpg          2048 bytes
///   A/B/b.txt          10 bytes
///   C/.DS_Store
/// ```
fn create_test_disk(temp: &TempDir) -> PathBuf {
    let root = temp.path().join("disk");
    fs::create_dir_all(root.join("A/B")).unwrap();
    fs::create_dir_all(root.join("C")).unwrap();
    fs::write(root.join("A/a.jpg"), vec![0u8; 2048]).unwrap();
    fs::write(root.join("A/B/b.txt"), vec![0u8; 10]).unwrap();
    fs::write(root.join("C/.DS_Store"), b"junk").unwrap();
    root
}

fn config_for(temp: &TempDir, root: &Path, output: &str) -> ScanConfig {
    ScanConfig::builder()
        .root(root)
        .output(Some(temp.path().join("out").join(output)))
        .include_extensions(None)
        .build()
        .unwrap()
}

fn scan_to_completion(config: &ScanConfig) -> TreeDocument {
    match TreeScanner::new()
        .scan(config, &CancellationToken::new())
        .unwrap()
    {
        ScanOutcome::Completed(doc) => doc,
        ScanOutcome::Interrupted { .. } => panic!("scan was not cancelled"),
    }
}

fn comparable(mut stats: Statistics) -> Statistics {
    stats.scan_duration_seconds = 0.0;
    stats
}

fn all_file_names(doc: &TreeDocument) -> Vec<String> {
    let mut names: Vec<String> = doc
        .tree
        .walk()
        .flat_map(|node| node.files.iter().map(|f| f.relative_path.clone()))
        .collect();
    names.sort();
    names
}

#[test]
fn test_basic_scan() {
    let temp = TempDir::new().unwrap();
    let root = create_test_disk(&temp);
    let config = config_for(&temp, &root, "disk.json");

    let doc = scan_to_completion(&config);
    let stats = &doc.statistics;

    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.total_directories, 3);
    assert_eq!(stats.total_size, 2058);
    assert_eq!(stats.file_types[&FileCategory::Image], 1);
    assert_eq!(stats.file_types[&FileCategory::Document], 1);
    assert!(!stats.file_extensions.contains_key(""));
    assert_eq!(stats.max_depth, 2);
    assert_eq!(stats.directory_depth_distribution[&0], 1);
    assert_eq!(stats.directory_depth_distribution[&1], 2);
    assert_eq!(stats.directory_depth_distribution[&2], 1);
    assert!(!stats.has_warnings());

    assert_eq!(all_file_names(&doc), vec!["A/B/b.txt", "A/a.jpg"]);
    assert!(doc.tree.children["C"].files.is_empty());
    doc.validate().unwrap();

    // Document written, checkpoint gone.
    assert!(config.output_path().exists());
    assert!(!config.checkpoint_path().exists());
    let loaded = TreeDocument::load(&config.output_path()).unwrap();
    assert_eq!(loaded, doc);
}

#[test]
fn test_tree_paths() {
    let temp = TempDir::new().unwrap();
    let root = create_test_disk(&temp);
    let doc = scan_to_completion(&config_for(&temp, &root, "disk.json"));

    let canonical = root.canonicalize().unwrap();
    assert_eq!(doc.tree.path, canonical);
    assert_eq!(doc.tree.relative_path, "");
    assert_eq!(doc.tree.parent_path, None);

    let b = &doc.tree.children["A"].children["B"];
    assert_eq!(b.relative_path, "A/B");
    assert_eq!(b.parent_path.as_deref(), Some("A"));
    assert_eq!(b.depth, 2);
    assert_eq!(b.metadata.file_count, 1);
    assert_eq!(b.files[0].parent_directory, "A/B");
    assert_eq!(b.files[0].path, canonical.join("A/B/b.txt"));

    assert_eq!(
        doc.statistics.largest_file.name,
        canonical.join("A/a.jpg").to_string_lossy()
    );
    assert_eq!(doc.scan_info.root_path, canonical.to_string_lossy());
}

#[test]
fn test_max_depth_zero() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("disk");
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("sub/inner.jpg"), b"x").unwrap();
    fs::write(root.join("top.jpg"), b"xyz").unwrap();

    let mut config = config_for(&temp, &root, "disk.json");
    config.max_depth = 0;
    let doc = scan_to_completion(&config);

    assert_eq!(doc.statistics.total_directories, 0);
    assert!(doc.tree.children.is_empty());
    assert_eq!(doc.tree.metadata.subdirectory_count, 0);
    assert_eq!(all_file_names(&doc), vec!["top.jpg"]);
    assert_eq!(doc.statistics.total_files, 1);
}

#[test]
fn test_depth_bound() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("disk");
    fs::create_dir_all(root.join("1/2/3/4")).unwrap();
    fs::write(root.join("1/2/two.jpg"), b"2").unwrap();
    fs::write(root.join("1/2/3/three.jpg"), b"3").unwrap();
    fs::write(root.join("1/2/3/4/four.jpg"), b"4").unwrap();

    let mut config = config_for(&temp, &root, "disk.json");
    config.max_depth = 2;
    let doc = scan_to_completion(&config);

    assert!(doc.tree.walk().all(|node| node.depth <= 2));
    assert_eq!(doc.tree.deepest(), 2);
    assert_eq!(all_file_names(&doc), vec!["1/2/two.jpg"]);
    assert_eq!(doc.statistics.total_directories, 2);
    assert_eq!(doc.statistics.max_depth, 2);
}

#[test]
fn test_exclusions() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("disk");
    fs::create_dir_all(root.join("Backups.backupdb/2020")).unwrap();
    fs::create_dir_all(root.join("Work/Backups.backupdb")).unwrap();
    fs::create_dir_all(root.join("Work/__MACOSX")).unwrap();
    fs::write(root.join("Backups.backupdb/2020/old.jpg"), b"old").unwrap();
    fs::write(root.join("Work/notes.tmp"), b"tmp").unwrap();
    fs::write(root.join("Work/notes.pdf"), b"pdf").unwrap();
    fs::write(root.join("Work/__MACOSX/._notes.pdf"), b"rsrc").unwrap();

    let doc = scan_to_completion(&config_for(&temp, &root, "disk.json"));

    assert!(!doc.tree.children.contains_key("Backups.backupdb"));
    let work = &doc.tree.children["Work"];
    // The deny-list only applies directly under the root.
    assert!(work.children.contains_key("Backups.backupdb"));
    assert!(!work.children.contains_key("__MACOSX"));
    assert_eq!(all_file_names(&doc), vec!["Work/notes.pdf"]);
    assert_eq!(doc.statistics.total_directories, 2);
}

#[test]
fn test_default_allow_list() {
    let temp = TempDir::new().unwrap();
    let root = create_test_disk(&temp);
    let config = ScanConfig::builder()
        .root(&root)
        .output(Some(temp.path().join("out/disk.json")))
        .build()
        .unwrap();

    let doc = scan_to_completion(&config);
    assert_eq!(all_file_names(&doc), vec!["A/a.jpg"]);
    assert_eq!(doc.statistics.total_directories, 3);
}

#[test]
fn test_invalid_pattern_is_fatal() {
    let temp = TempDir::new().unwrap();
    let root = create_test_disk(&temp);
    let mut config = config_for(&temp, &root, "disk.json");
    config.exclude_patterns.push("[broken".to_string());

    let err = TreeScanner::new()
        .scan(&config, &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidPattern { .. }));
}

#[test]
fn test_cancelled_scan_checkpoints_and_resumes() {
    let temp = TempDir::new().unwrap();
    let root = create_test_disk(&temp);
    let config = config_for(&temp, &root, "disk.json");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = TreeScanner::new().scan(&config, &cancel).unwrap();

    match outcome {
        ScanOutcome::Interrupted { checkpoint, saved } => {
            assert!(saved);
            assert_eq!(checkpoint, config.checkpoint_path());
            assert!(checkpoint.exists());
        }
        ScanOutcome::Completed(_) => panic!("expected interruption"),
    }
    // No partial document.
    assert!(!config.output_path().exists());

    let resumed = scan_to_completion(&config);
    assert!(resumed.scan_info.resumed_from_checkpoint);
    assert_eq!(resumed.statistics.total_files, 2);
    assert!(!config.checkpoint_path().exists());
}

#[test]
fn test_resume_matches_uninterrupted_scan() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("disk");
    for dir in 0..6 {
        for sub in 0..3 {
            let path = root.join(format!("d{dir}/s{sub}"));
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join("clip.mov"), vec![0u8; dir * 10 + sub + 1]).unwrap();
        }
    }

    let fresh = scan_to_completion(&config_for(&temp, &root, "fresh.json"));

    let mut config = config_for(&temp, &root, "resumed.json");
    config.checkpoint_interval = 1;

    // Cancel as soon as the first directory is reported.
    let scanner = TreeScanner::new();
    let mut rx = scanner.subscribe();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = thread::spawn(move || {
        if rx.blocking_recv().is_ok() {
            trigger.cancel();
        }
    });
    let first = scanner.scan(&config, &cancel).unwrap();
    drop(scanner);
    watcher.join().unwrap();

    let resumed = match first {
        ScanOutcome::Completed(doc) => doc,
        ScanOutcome::Interrupted { saved, .. } => {
            assert!(saved);
            scan_to_completion(&config)
        }
    };

    assert_eq!(comparable(resumed.statistics.clone()), comparable(fresh.statistics.clone()));
    assert_eq!(resumed.tree, fresh.tree);
}

/// Checkpoint in which only the root has been listed: it holds `top.jpg`
/// and the child `A`.
fn seed_checkpoint(config: &ScanConfig, root: &Path) {
    let mut state = CheckpointState::new(root, ScanInfo::new(root, config));
    let root_id = state.arena.root_id();
    state.arena.add_child(root_id, "A", root.join("A")).unwrap();
    state.statistics.record_dir();

    let top = FileRecord::new(
        "top.jpg",
        root.join("top.jpg"),
        "",
        7,
        Timestamps::with_modified(Utc::now()),
    );
    state.statistics.record_file(&top);
    state.arena.replace_files(root_id, vec![top]);
    state.statistics.record_processed(0);
    state.visited.insert(root.to_path_buf());

    CheckpointStore::new(config.checkpoint_path())
        .save(&state)
        .unwrap();
}

#[test]
fn test_visited_directories_are_not_relisted() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("disk");
    fs::create_dir_all(root.join("A")).unwrap();
    fs::write(root.join("top.jpg"), vec![0u8; 7]).unwrap();
    fs::write(root.join("A/a.jpg"), vec![0u8; 3]).unwrap();
    let root = root.canonicalize().unwrap();

    let config = config_for(&temp, &root, "disk.json");
    seed_checkpoint(&config, &root);
    // Appeared after the root was listed.
    fs::write(root.join("late.jpg"), b"late").unwrap();

    let doc = scan_to_completion(&config);
    assert!(doc.scan_info.resumed_from_checkpoint);
    assert_eq!(all_file_names(&doc), vec!["A/a.jpg", "top.jpg"]);
    assert_eq!(doc.statistics.total_files, 2);
    assert_eq!(doc.statistics.total_directories, 1);
    assert_eq!(doc.statistics.directory_depth_distribution[&1], 1);
    doc.validate().unwrap();
}

#[test]
fn test_no_resume_ignores_checkpoint() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("disk");
    fs::create_dir_all(root.join("A")).unwrap();
    fs::write(root.join("top.jpg"), vec![0u8; 7]).unwrap();
    let root = root.canonicalize().unwrap();

    let mut config = config_for(&temp, &root, "disk.json");
    seed_checkpoint(&config, &root);
    fs::write(root.join("late.jpg"), b"late").unwrap();

    config.resume = false;
    let doc = scan_to_completion(&config);
    assert!(!doc.scan_info.resumed_from_checkpoint);
    assert_eq!(all_file_names(&doc), vec!["late.jpg", "top.jpg"]);
}

#[test]
fn test_checkpoint_with_other_parameters_is_ignored() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("disk");
    fs::create_dir_all(root.join("A")).unwrap();
    fs::write(root.join("top.jpg"), vec![0u8; 7]).unwrap();
    let root = root.canonicalize().unwrap();

    let mut config = config_for(&temp, &root, "disk.json");
    seed_checkpoint(&config, &root);
    fs::write(root.join("late.jpg"), b"late").unwrap();

    config.max_depth = 3;
    let doc = scan_to_completion(&config);
    assert!(!doc.scan_info.resumed_from_checkpoint);
    assert_eq!(all_file_names(&doc), vec!["late.jpg", "top.jpg"]);
}

#[test]
fn test_checkpoint_with_other_root_deny_list_is_ignored() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("disk");
    fs::create_dir_all(root.join("A")).unwrap();
    fs::write(root.join("top.jpg"), vec![0u8; 7]).unwrap();
    let root = root.canonicalize().unwrap();

    let mut config = config_for(&temp, &root, "disk.json");
    seed_checkpoint(&config, &root);
    fs::write(root.join("late.jpg"), b"late").unwrap();

    config.excluded_root_folders.push("Scratch".to_string());
    let doc = scan_to_completion(&config);
    assert!(!doc.scan_info.resumed_from_checkpoint);
    assert!(doc.scan_info.excluded_root_folders.contains(&"Scratch".to_string()));
    assert_eq!(all_file_names(&doc), vec!["late.jpg", "top.jpg"]);
}

#[test]
fn test_inconsistent_checkpoint_starts_fresh() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("disk");
    fs::create_dir_all(root.join("A")).unwrap();
    fs::write(root.join("top.jpg"), vec![0u8; 7]).unwrap();
    let root = root.canonicalize().unwrap();

    let config = config_for(&temp, &root, "disk.json");
    seed_checkpoint(&config, &root);
    let mut saved: serde_json::Value =
        serde_json::from_slice(&fs::read(config.checkpoint_path()).unwrap()).unwrap();
    saved["arena"]["nodes"] = serde_json::json!([]);
    fs::write(config.checkpoint_path(), serde_json::to_vec(&saved).unwrap()).unwrap();
    fs::write(root.join("late.jpg"), b"late").unwrap();

    let doc = scan_to_completion(&config);
    assert!(!doc.scan_info.resumed_from_checkpoint);
    assert_eq!(all_file_names(&doc), vec!["late.jpg", "top.jpg"]);
    doc.validate().unwrap();
}

#[test]
fn test_corrupt_checkpoint_starts_fresh() {
    let temp = TempDir::new().unwrap();
    let root = create_test_disk(&temp);
    let config = config_for(&temp, &root, "disk.json");

    fs::create_dir_all(temp.path().join("out")).unwrap();
    fs::write(config.checkpoint_path(), b"{ not json").unwrap();

    let doc = scan_to_completion(&config);
    assert!(!doc.scan_info.resumed_from_checkpoint);
    assert_eq!(doc.statistics.total_files, 2);
    assert!(!config.checkpoint_path().exists());
}

#[test]
fn test_periodic_checkpoints_disabled() {
    let temp = TempDir::new().unwrap();
    let root = create_test_disk(&temp);
    let mut config = config_for(&temp, &root, "disk.json");
    config.checkpoint_interval = 0;
    config.precount = false;

    let doc = scan_to_completion(&config);
    assert_eq!(doc.statistics.total_files, 2);
    assert!(!config.checkpoint_path().exists());
}

#[cfg(unix)]
#[test]
fn test_symlinks_skipped_by_default() {
    use std::os::unix::fs::symlink;

    let temp = TempDir::new().unwrap();
    let root = create_test_disk(&temp);
    symlink(root.join("A"), root.join("link_to_a")).unwrap();
    symlink(root.join("A/a.jpg"), root.join("link.jpg")).unwrap();

    let doc = scan_to_completion(&config_for(&temp, &root, "disk.json"));
    assert!(!doc.tree.children.contains_key("link_to_a"));
    assert_eq!(doc.statistics.total_files, 2);
    assert!(!doc.statistics.has_warnings());
}

#[cfg(unix)]
#[test]
fn test_followed_symlink_loop_terminates() {
    use std::os::unix::fs::symlink;

    let temp = TempDir::new().unwrap();
    let root = create_test_disk(&temp);
    symlink(&root, root.join("A/B/back_to_root")).unwrap();
    let external = temp.path().join("external");
    fs::create_dir_all(&external).unwrap();
    fs::write(external.join("ext.jpg"), b"ext").unwrap();
    symlink(&external, root.join("mounted")).unwrap();

    let mut config = config_for(&temp, &root, "disk.json");
    config.follow_symlinks = true;
    let doc = scan_to_completion(&config);

    let b = &doc.tree.children["A"].children["B"];
    assert!(!b.children.contains_key("back_to_root"));
    assert!(doc.tree.children.contains_key("mounted"));
    assert_eq!(doc.statistics.total_files, 3);
    assert!(
        doc.statistics
            .errors_warnings
            .iter()
            .any(|w| w.contains("back_to_root"))
    );
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_a_warning() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("disk");
    fs::create_dir_all(root.join("A")).unwrap();
    fs::create_dir_all(root.join("Locked")).unwrap();
    fs::create_dir_all(root.join("Z")).unwrap();
    fs::write(root.join("A/a.jpg"), b"a").unwrap();
    fs::write(root.join("Locked/secret.jpg"), b"s").unwrap();
    fs::write(root.join("Z/z.jpg"), b"z").unwrap();

    let locked = root.join("Locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        // Permission bits do not apply to the superuser.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = TreeScanner::new().scan(
        &config_for(&temp, &root, "disk.json"),
        &CancellationToken::new(),
    );
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let doc = result.unwrap().into_document().unwrap();
    assert_eq!(all_file_names(&doc), vec!["A/a.jpg", "Z/z.jpg"]);
    assert!(doc.tree.children["Locked"].files.is_empty());
    assert_eq!(doc.statistics.total_directories, 3);

    let warnings = &doc.statistics.errors_warnings;
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Permission denied"));
    assert!(warnings[0].contains("Locked"));
    doc.validate().unwrap();
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_names_are_recorded_lossily() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("disk");
    fs::create_dir_all(root.join("A")).unwrap();
    fs::write(root.join("A/ok.jpg"), b"ok").unwrap();
    let latin1 = root.join("A").join(OsStr::from_bytes(b"caf\xe9.jpg"));
    fs::write(&latin1, b"cafe").unwrap();

    let mut config = config_for(&temp, &root, "disk.json");
    config.checkpoint_interval = 1;
    let doc = scan_to_completion(&config);

    assert_eq!(doc.statistics.total_files, 2);
    assert!(
        doc.statistics
            .errors_warnings
            .iter()
            .any(|w| w.contains("not valid UTF-8"))
    );
    assert!(!config.checkpoint_path().exists());

    let loaded = TreeDocument::load(&config.output_path()).unwrap();
    let names: Vec<&str> = loaded.tree.children["A"]
        .files
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["caf\u{FFFD}.jpg", "ok.jpg"]);
    loaded.validate().unwrap();

    // A snapshot holding the raw path must still be writable.
    let root = root.canonicalize().unwrap();
    let mut state = CheckpointState::new(&root, ScanInfo::new(&root, &config));
    state.visited.insert(latin1.clone());
    let store = CheckpointStore::new(config.checkpoint_path());
    store.save(&state).unwrap();
    assert!(store.load(&root).is_some());
}
