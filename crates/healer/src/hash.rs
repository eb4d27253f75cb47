// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed error hashing
//!
//! Two occurrences of the same failure differ in timestamps, paths, pids,
//! and addresses. Normalization strips the volatile parts so the hash is
//! stable across occurrences, and is idempotent: normalizing an already
//! normalized string is a no-op.

use sha2::{Digest, Sha256};
use std::sync::OnceLock;

struct Normalizers {
    timestamp: regex::Regex,
    hex: regex::Regex,
    path: regex::Regex,
    number: regex::Regex,
    spaces: regex::Regex,
}

// Literal patterns; a compile failure here is a programming error.
#[allow(clippy::unwrap_used)]
fn literal(pattern: &str) -> regex::Regex {
    regex::Regex::new(pattern).unwrap()
}

fn normalizers() -> &'static Normalizers {
    static CELL: OnceLock<Normalizers> = OnceLock::new();
    CELL.get_or_init(|| Normalizers {
        timestamp: literal(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2})?(\.\d+)?(Z|[+-]\d{2}:?\d{2})?"),
        hex: literal(r"0x[0-9a-fA-F]+"),
        path: literal(r"/[\w@.+-]+(?:/[\w@.+-]+)+"),
        number: literal(r"\b\d+\b"),
        spaces: literal(r"\s+"),
    })
}

/// Strip volatile fragments and case from an error string.
pub fn normalize_error(error: &str) -> String {
    let n = normalizers();
    let s = error.to_lowercase();
    let s = n.timestamp.replace_all(&s, "<ts>");
    let s = n.hex.replace_all(&s, "<hex>");
    let s = n.path.replace_all(&s, "<path>");
    let s = n.number.replace_all(&s, "<n>");
    let s = n.spaces.replace_all(&s, " ");
    s.trim().to_string()
}

/// Stable short hash of the normalized error string.
pub fn error_hash(error: &str) -> String {
    let normalized = normalize_error(error);
    let digest = Sha256::digest(normalized.as_bytes());
    let mut out = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
