//! Seed scenario: opencode cache corruption is cleared and the task
//! retried to success.

use crate::prelude::*;
use lw_adapters::ScriptedRun;
use lw_core::CliKind;

#[tokio::test(start_paused = true)]
#[serial_test::serial]
async fn corrupted_cache_is_cleared_exactly_once_then_the_retry_succeeds() {
    let w = world(vec![model("x", CliKind::Opencode)], vec![]);

    // A fake vendor cache the clear step will wipe
    let cache_dir = w.dir.path().join("opencode-cache");
    std::fs::create_dir_all(cache_dir.join("node_modules")).unwrap();
    std::env::set_var("LOOPWORK_OPENCODE_CACHE_DIR", &cache_dir);

    w.spawner.push(
        ScriptedRun::exit(
            1,
            "ENOENT: no such file or directory, open '/home/u/.cache/opencode/node_modules/zod/package.json'",
        ),
    );
    w.spawner.push(ScriptedRun::ok("clean run"));

    let result = w
        .executor
        .execute("p", &w.output_file(), 30, lw_engine::ExecOptions::default())
        .await;
    std::env::remove_var("LOOPWORK_OPENCODE_CACHE_DIR");

    assert_eq!(result.unwrap(), 0);
    assert_eq!(w.spawner.spawn_count(), 2);
    assert!(!cache_dir.exists(), "cache cleared exactly once");
}
