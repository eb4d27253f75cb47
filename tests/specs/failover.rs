//! Seed scenario: failover on quota exhaustion.

use crate::prelude::*;
use lw_adapters::ScriptedRun;
use lw_core::CliKind;

#[tokio::test(start_paused = true)]
async fn quota_on_primary_switches_to_fallback_and_succeeds() {
    let w = world(
        vec![model("primary-a", CliKind::Claude)],
        vec![model("fallback-b", CliKind::Claude)],
    );
    // Child exits 0 but its output carries a quota signal
    w.spawner.push(ScriptedRun::ok("monthly quota exceeded, upgrade your plan"));
    w.spawner.push(ScriptedRun::ok("fallback output"));

    let code = w
        .executor
        .execute(
            "do the thing",
            &w.output_file(),
            30,
            lw_engine::ExecOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(code, 0);
    assert!(w.selector.using_fallback(), "selector switched pools");
    assert_eq!(w.spawner.spawn_count(), 2);
    // The final, successful output reached the file
    let output = std::fs::read_to_string(w.output_file()).unwrap();
    assert!(output.contains("fallback output"));
}
