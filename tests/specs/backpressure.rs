//! Seed scenario: pool backpressure serializes concurrent executes.

use crate::prelude::*;
use lw_adapters::ScriptedRun;
use lw_core::CliKind;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn second_execute_waits_for_the_first_slot() {
    let w = world_with_pools(vec![model("sonnet", CliKind::Claude)], vec![], 1);
    let hold = Duration::from_millis(500);
    // First child holds its slot for 500ms; second is instant
    w.spawner.push(ScriptedRun::ok("one").with_run_for(hold));
    w.spawner.push(ScriptedRun::ok("two"));

    let out_a = w.dir.path().join("a/out.log");
    let out_b = w.dir.path().join("b/out.log");

    let start = tokio::time::Instant::now();
    let (a, b) = tokio::join!(
        w.executor
            .execute("first", &out_a, 30, lw_engine::ExecOptions::default()),
        async {
            // Ensure the first execute wins the only slot
            tokio::task::yield_now().await;
            let result = w
                .executor
                .execute("second", &out_b, 30, lw_engine::ExecOptions::default())
                .await;
            (result, start.elapsed())
        }
    );

    let (b_result, b_elapsed) = b;
    assert_eq!(a.unwrap(), 0);
    assert_eq!(b_result.unwrap(), 0);
    assert!(
        b_elapsed >= hold,
        "second execute waited at least the hold time, got {b_elapsed:?}"
    );
    assert_eq!(w.pools.stats()["medium"].active, 0, "all slots returned");
}
