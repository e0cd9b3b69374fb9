//! Helpers for end-to-end tests of the `batchmv` binary.
//!
//! Every command runs inside a temp directory with its own undo log, so
//! tests never read or write the log next to the test executable.

use assert_cmd::cargo::cargo_bin_cmd;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a temp directory holding the given files, each containing its own name.
pub fn create_files(names: &[&str]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for name in names {
        let path = temp.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, name).unwrap();
    }
    temp
}

pub fn undo_log(root: &Path) -> PathBuf {
    root.join("batchmv_undo.log")
}

/// Runs `batchmv <args> --yes` in `root` with the test's undo log.
pub fn run(root: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = cargo_bin_cmd!("batchmv");
    cmd.args(args)
        .arg("--undo-log")
        .arg(undo_log(root))
        .arg("--yes")
        .current_dir(root);

    cmd.assert()
}

#[allow(unused)]
pub fn read(root: &Path, name: &str) -> String {
    fs::read_to_string(root.join(name)).unwrap()
}

#[allow(unused)]
pub fn read_log(root: &Path) -> String {
    fs::read_to_string(undo_log(root)).unwrap_or_default()
}
