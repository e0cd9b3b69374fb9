//! End-to-end rename batches

mod common;

use common::*;

use predicates::prelude::*;
use std::fs;

#[test]
fn test_swap_two_files() {
    let temp = create_files(&["a.txt", "b.txt"]);
    let root = temp.path();

    run(root, &["rename", "a.txt", "b.txt", "b.txt", "a.txt"]).success();

    assert_eq!(read(root, "a.txt"), "b.txt");
    assert_eq!(read(root, "b.txt"), "a.txt");

    let log = read_log(root);
    assert!(log.starts_with("<RENAME "));
    assert!(log.contains("a.txt -> "));
    assert!(log.trim_end().ends_with("<END OF BATCH>"));
}

#[test]
fn test_rotate_three_files_leaves_no_intermediates() {
    let temp = create_files(&["1", "2", "3"]);
    let root = temp.path();

    run(root, &["rename", "1", "2", "2", "3", "3", "1"]).success();

    assert_eq!(read(root, "1"), "3");
    assert_eq!(read(root, "2"), "1");
    assert_eq!(read(root, "3"), "2");

    // Three files plus the undo log.
    assert_eq!(fs::read_dir(root).unwrap().count(), 4);
}

#[test]
fn test_bare_destination_stays_in_source_directory() {
    let temp = create_files(&["sub/x.txt"]);
    let root = temp.path();

    run(root, &["rename", "sub/x.txt", "y.txt"]).success();

    assert!(root.join("sub/y.txt").exists());
    assert!(!root.join("y.txt").exists());
}

#[test]
fn test_dry_run_does_not_modify() {
    let temp = create_files(&["a.txt"]);
    let root = temp.path();

    run(root, &["rename", "a.txt", "b.txt", "--dry-run"])
        .success()
        .stdout(predicate::str::contains("DRY RUN"));

    assert!(root.join("a.txt").exists());
    assert!(!root.join("b.txt").exists());
    assert!(!undo_log(root).exists());
}

#[test]
fn test_abort_keeps_completed_entries() {
    let temp = create_files(&["a.txt"]);
    let root = temp.path();

    // `missing.txt` sorts after `a.txt`, so `a.txt` is staged before the failure.
    run(
        root,
        &["rename", "a.txt", "b.txt", "missing.txt", "c.txt", "--on-error", "abort"],
    )
    .code(2)
    .stderr(predicate::str::contains("aborted after 1 of 2"));

    assert!(root.join("b.txt").exists());
    assert!(!root.join("a.txt").exists());
    assert!(!root.join("c.txt").exists());

    let log = read_log(root);
    assert!(log.contains("b.txt"));
    assert!(!log.contains("missing.txt"));
}

#[test]
fn test_non_interactive_errors_abort_by_default() {
    let temp = create_files(&[]);
    let root = temp.path();

    run(root, &["rename", "missing.txt", "c.txt"]).code(2);
}

#[test]
fn test_ignore_skips_failed_entries() {
    let temp = create_files(&["a.txt", "c.txt"]);
    let root = temp.path();

    run(
        root,
        &[
            "rename", "a.txt", "b.txt", "missing.txt", "m.txt", "c.txt", "d.txt",
            "--on-error", "ignore",
        ],
    )
    .success()
    .stdout(predicate::str::contains("cannot find file"));

    assert!(root.join("b.txt").exists());
    assert!(root.join("d.txt").exists());
    assert!(!root.join("m.txt").exists());

    let log = read_log(root);
    assert!(!log.contains("m.txt"));
}

#[test]
fn test_existing_destination_is_not_overwritten() {
    let temp = create_files(&["a.txt", "b.txt"]);
    let root = temp.path();

    run(root, &["rename", "a.txt", "b.txt", "--on-error", "ignore"]).success();

    assert_eq!(read(root, "a.txt"), "a.txt");
    assert_eq!(read(root, "b.txt"), "b.txt");

    // Nothing committed, so nothing recorded.
    assert!(!read_log(root).contains("<RENAME"));
    let leftovers = fs::read_dir(root)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".txt"))
        .count();
    assert_eq!(leftovers, 2);
}

#[test]
fn test_pattern_rename() {
    let temp = create_files(&["IMG_001.jpg", "IMG_002.jpg", "notes.txt"]);
    let root = temp.path();

    run(
        root,
        &["rename", "--pattern", r"^IMG_(\d+)", "--replace", "photo-$1"],
    )
    .success();

    assert!(root.join("photo-001.jpg").exists());
    assert!(root.join("photo-002.jpg").exists());
    assert!(root.join("notes.txt").exists());
}

#[test]
fn test_odd_number_of_paths() {
    let temp = create_files(&["a.txt"]);

    run(temp.path(), &["rename", "a.txt", "b.txt", "c.txt"])
        .code(1)
        .stderr(predicate::str::contains("SRC DST pairs"));
}

#[test]
fn test_duplicate_destination_rejected() {
    let temp = create_files(&["a.txt", "b.txt"]);
    let root = temp.path();

    run(root, &["rename", "a.txt", "x.txt", "b.txt", "x.txt"])
        .code(1)
        .stderr(predicate::str::contains("both rename to"));

    assert!(root.join("a.txt").exists());
    assert!(root.join("b.txt").exists());
}
