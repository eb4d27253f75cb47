// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON state persistence with corrupt-file rotation
//!
//! State files are small and rewritten whole: serialize to a sibling temp
//! file, then rename over the target. A file that fails to parse is
//! rotated to `.bak` and replaced with defaults rather than aborting the
//! process.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Load a JSON state file, rotating corrupt content aside.
pub fn load_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "state file unreadable, starting fresh");
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let bak = rotate_bak_path(path);
            tracing::warn!(
                path = %path.display(),
                bak = %bak.display(),
                error = %e,
                "corrupt state file, rotating to .bak and starting fresh"
            );
            let _ = std::fs::rename(path, &bak);
            T::default()
        }
    }
}

/// Write a JSON state file atomically (temp file + rename).
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(value).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)
}

/// Next free `.bak` / `.bak.N` sibling for a corrupt file.
pub fn rotate_bak_path(path: &Path) -> PathBuf {
    let base = PathBuf::from(format!("{}.bak", path.display()));
    if !base.exists() {
        return base;
    }
    for n in 1.. {
        let candidate = PathBuf::from(format!("{}.bak.{n}", path.display()));
        if !candidate.exists() {
            return candidate;
        }
    }
    base
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
