// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::Deserialize;

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Doc {
    count: u32,
    name: String,
}

#[test]
fn round_trips_through_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("state.json");
    let doc = Doc {
        count: 7,
        name: "loopwork".to_string(),
    };
    save_json(&path, &doc).unwrap();
    assert_eq!(load_json::<Doc>(&path), doc);
}

#[test]
fn missing_file_yields_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    assert_eq!(load_json::<Doc>(&tmp.path().join("absent.json")), Doc::default());
}

#[test]
fn corrupt_file_is_rotated_to_bak() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("state.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert_eq!(load_json::<Doc>(&path), Doc::default());
    assert!(!path.exists(), "corrupt file moved aside");
    assert!(tmp.path().join("state.json.bak").exists());
}

#[test]
fn bak_rotation_never_overwrites() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("state.json");
    std::fs::write(format!("{}.bak", path.display()), "old").unwrap();
    assert_eq!(
        rotate_bak_path(&path),
        PathBuf::from(format!("{}.bak.1", path.display()))
    );
}

#[test]
fn save_creates_parent_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested/dir/state.json");
    save_json(&path, &Doc::default()).unwrap();
    assert!(path.exists());
}
