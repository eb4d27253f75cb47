// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::spawner::{FakeSpawner, ScriptedRun};

#[tokio::test]
async fn working_probe_selects_pty_mode() {
    let candidate = FakeSpawner::new();
    candidate.push(ScriptedRun::ok(""));
    let detector = SpawnModeDetector::new();
    assert_eq!(detector.detect(&candidate).await, SpawnMode::Pty);
    assert_eq!(detector.cached(), Some(SpawnMode::Pty));
}

#[tokio::test]
async fn refused_spawn_falls_back_to_pipe_mode() {
    let candidate = FakeSpawner::refusing();
    let detector = SpawnModeDetector::new();
    assert_eq!(detector.detect(&candidate).await, SpawnMode::Pipe);
}

#[tokio::test]
async fn nonzero_probe_exit_falls_back_to_pipe_mode() {
    let candidate = FakeSpawner::new();
    candidate.push(ScriptedRun::exit(127, ""));
    let detector = SpawnModeDetector::new();
    assert_eq!(detector.detect(&candidate).await, SpawnMode::Pipe);
}

#[tokio::test]
async fn verdict_is_cached_and_never_reprobed() {
    let candidate = FakeSpawner::new();
    candidate.push(ScriptedRun::ok(""));
    let detector = SpawnModeDetector::new();

    assert_eq!(detector.detect(&candidate).await, SpawnMode::Pty);
    // A second detect must not spawn again, even though the script is
    // now empty and a fresh probe would still pass.
    assert_eq!(detector.detect(&candidate).await, SpawnMode::Pty);
    assert_eq!(candidate.spawn_count(), 1);
}

#[test]
fn unprobed_detector_has_no_cached_verdict() {
    let detector = SpawnModeDetector::new();
    assert_eq!(detector.cached(), None);
}
