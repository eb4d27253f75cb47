//! Seed scenario: rate-limit sleeps before retrying.

use crate::prelude::*;
use lw_adapters::ScriptedRun;
use lw_core::CliKind;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn two_rate_limits_cost_at_least_two_waits() {
    // Two models give the executor an attempt budget of three
    let w = world(
        vec![model("sonnet", CliKind::Claude), model("haiku", CliKind::Claude)],
        vec![],
    );
    w.spawner.push(ScriptedRun::ok("429 Too Many Requests"));
    w.spawner.push(ScriptedRun::ok("still 429, Too Many Requests"));
    w.spawner.push(ScriptedRun::ok("finally through"));

    let start = tokio::time::Instant::now();
    let code = w
        .executor
        .execute("p", &w.output_file(), 30, lw_engine::ExecOptions::default())
        .await
        .unwrap();

    assert_eq!(code, 0);
    assert_eq!(w.spawner.spawn_count(), 3);
    // rate_limit_wait_ms = 100 in the fixture; two sleeps happened
    assert!(
        start.elapsed() >= Duration::from_millis(200),
        "elapsed {:?}",
        start.elapsed()
    );
}
