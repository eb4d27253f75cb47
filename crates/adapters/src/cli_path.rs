// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin vendor-binary discovery
//!
//! `LOOPWORK_<KIND>_PATH` wins outright; otherwise the first PATH entry
//! containing the kind's binary name is used.

use lw_core::CliKind;
use std::path::PathBuf;

/// Resolve the binary for a cli-kind, or `None` when nothing is installed.
pub fn resolve(kind: &CliKind) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(kind.path_env_var()) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
        tracing::warn!(
            var = kind.path_env_var(),
            path = %path.display(),
            "cli path override does not exist, falling back to PATH"
        );
    }
    search_path(kind.binary_name(), &std::env::var_os("PATH")?)
}

fn search_path(binary: &str, path: &std::ffi::OsStr) -> Option<PathBuf> {
    std::env::split_paths(path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
#[path = "cli_path_tests.rs"]
mod tests;
