//! Shared fixtures for the spec suite.

use lw_adapters::{FakeSpawner, LogSink, StrategyRegistry};
use lw_core::{
    BreakerConfig, CliKind, ExecutorConfig, FakeClock, ModelConfig, PoolConfig, RetryConfig,
    SelectorConfig,
};
use lw_engine::{CliExecutor, ExecutorDeps, ModelSelector, WorkerPoolManager};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct World {
    pub executor: CliExecutor<FakeClock>,
    pub spawner: FakeSpawner,
    pub selector: Arc<ModelSelector<FakeClock>>,
    pub pools: Arc<WorkerPoolManager>,
    pub clock: FakeClock,
    pub dir: tempfile::TempDir,
}

impl World {
    pub fn output_file(&self) -> PathBuf {
        self.dir.path().join("task-output.log")
    }
}

pub fn model(name: &str, cli: CliKind) -> ModelConfig {
    ModelConfig::new(name, cli, format!("{name}-id"))
}

pub fn breaker_config() -> BreakerConfig {
    BreakerConfig {
        failure_threshold: 3,
        reset_timeout: Duration::from_secs(30),
        half_open_max_calls: 1,
    }
}

pub fn retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        base_delay_ms: 10,
        max_delay_ms: 50,
        multiplier: 2.0,
        exponential: true,
        rate_limit_wait_ms: 100,
        retryable_errors: vec![],
    }
}

pub fn world_with_pools(
    primary: Vec<ModelConfig>,
    fallback: Vec<ModelConfig>,
    pool_size: usize,
) -> World {
    let clock = FakeClock::new();
    let mut pool_map = HashMap::new();
    pool_map.insert("medium".to_string(), PoolConfig::with_size(pool_size));
    let pools = Arc::new(WorkerPoolManager::new(pool_map, "medium").unwrap());
    let selector = Arc::new(ModelSelector::new(
        primary,
        fallback,
        SelectorConfig::default(),
        breaker_config(),
        clock.clone(),
    ));
    let spawner = FakeSpawner::new();
    let dir = tempfile::tempdir().unwrap();
    let executor = CliExecutor::new(
        ExecutorDeps {
            pools: Arc::clone(&pools),
            selector: Arc::clone(&selector),
            spawner: Arc::new(spawner.clone()),
            strategies: StrategyRegistry::new().unwrap(),
            sink: LogSink::open(dir.path().join("exec.log")).unwrap(),
        },
        ExecutorConfig {
            min_free_memory_mb: 0,
            kill_grace_ms: 50,
            ..ExecutorConfig::default()
        },
        retry_config(),
    )
    .with_path_resolver(|kind| Some(PathBuf::from(format!("/fake/bin/{kind}"))));
    World {
        executor,
        spawner,
        selector,
        pools,
        clock,
        dir,
    }
}

pub fn world(primary: Vec<ModelConfig>, fallback: Vec<ModelConfig>) -> World {
    world_with_pools(primary, fallback, 4)
}
