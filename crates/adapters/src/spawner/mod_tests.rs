// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn output_chunk_bytes_ignores_the_stream_tag() {
    assert_eq!(OutputChunk::Stdout(b"abc".to_vec()).bytes(), b"abc");
    assert_eq!(OutputChunk::Stderr(b"err".to_vec()).bytes(), b"err");
}

#[tokio::test]
async fn write_stdin_on_a_child_without_stdin_is_a_noop() {
    let spawner = FakeSpawner::new();
    spawner.push(ScriptedRun::ok("hi"));
    let mut child = spawner
        .spawn(Path::new("claude"), &[], SpawnOptions::default())
        .await
        .unwrap();
    child.close_stdin().await;
    // Closed stdin: writes are silently dropped, not errors
    child.write_stdin(b"late").await.unwrap();
    assert_eq!(child.wait().await.unwrap(), 0);
}
