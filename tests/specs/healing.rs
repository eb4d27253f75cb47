//! End-to-end healing: watcher → pattern engine → corrective action.

use lw_adapters::StrategyRegistry;
use lw_core::{FakeClock, SystemClock, TaskFailure, TaskId};
use lw_healer::{
    ActionRunner, HealOutcome, Healer, HealerConfig, LogWatcher, WatcherConfig,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn a_logged_missing_spec_is_scaffolded_from_the_tail() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("exec.log");
    std::fs::write(&log, "").unwrap();

    let runner = ActionRunner::new(tmp.path().join("specs"), StrategyRegistry::new().unwrap());
    let healer = Arc::new(
        Healer::new(HealerConfig::new(tmp.path()), FakeClock::new(), runner).unwrap(),
    );

    let config = WatcherConfig {
        path: log.clone(),
        debounce: Duration::from_millis(10),
        poll_interval: Duration::from_millis(25),
    };
    let (_watcher, lines) = LogWatcher::start(config, SystemClock);
    let (_failure_tx, failure_rx) = tokio::sync::mpsc::channel(4);
    let (shutdown, handle) = Arc::clone(&healer).spawn_dispatcher(lines, failure_rx);

    // The executor (or anyone) appends a recognizable symptom
    {
        let mut file = std::fs::OpenOptions::new().append(true).open(&log).unwrap();
        writeln!(file, "[executor] task t-1 failed: spec not found: welcome.md").unwrap();
    }

    let scaffolded = tmp.path().join("specs").join("welcome.md");
    let mut found = false;
    for _ in 0..100 {
        if scaffolded.exists() {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let _ = shutdown.send(());
    handle.await.unwrap();

    assert!(found, "healer scaffolded the missing spec from the log tail");
    let monitor = healer.monitor_snapshot();
    assert_eq!(monitor.pattern_counts["missing-spec"], 1);
    assert!(
        tmp.path().join(".loopwork/ai-monitor/monitor-state.json").exists(),
        "state persisted after the action"
    );
    assert!(tmp.path().join(".loopwork/ai-monitor/wisdom.json").exists());
}

#[tokio::test]
async fn task_failure_reports_enhance_the_spec_at_most_once() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = lw_core::FakeBackend::new().with_spec_dir(tmp.path().join("specs"));
    std::fs::create_dir_all(tmp.path().join("specs")).unwrap();
    std::fs::write(tmp.path().join("specs/t-1.md"), "# t-1\n").unwrap();

    let runner = ActionRunner::new(tmp.path().join("specs"), StrategyRegistry::new().unwrap())
        .with_backend(Arc::new(backend.clone()));
    let healer = Healer::new(HealerConfig::new(tmp.path()), FakeClock::new(), runner).unwrap();

    let failure = TaskFailure {
        task_id: TaskId::new("t-1"),
        exit_reason: "Claude Sonnet timed out after 30s".to_string(),
        log_tail: "last lines of output\n".to_string(),
    };

    assert!(matches!(
        healer.handle_task_failure(&failure).await,
        HealOutcome::Enhanced { .. }
    ));
    assert!(matches!(
        healer.handle_task_failure(&failure).await,
        HealOutcome::Skipped { .. }
    ));

    let spec = std::fs::read_to_string(tmp.path().join("specs/t-1.md")).unwrap();
    assert_eq!(
        spec.matches("## Recovery hints").count(),
        1,
        "one enhancement per (task, reason)"
    );
    assert!(spec.contains("timed out after 30s"));
}
