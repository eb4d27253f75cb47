// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named worker pools with FIFO backpressure
//!
//! At-capacity acquires park in a per-pool FIFO rather than failing; a
//! release hands the freed capacity to the eldest live waiter. Slot ids
//! are minted from a process-wide counter and never reused.

use lw_core::{PoolConfig, Priority, SlotId, TaskId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from pool operations
#[derive(Debug, Error, PartialEq)]
pub enum PoolError {
    #[error("unknown pool: {0}")]
    UnknownPool(String),
    #[error("acquire timed out after {waited_ms}ms in pool {pool}")]
    AcquireTimeout { pool: String, waited_ms: u64 },
    #[error("pool manager is shutting down")]
    ShuttingDown,
    #[error("unknown slot: {0}")]
    UnknownSlot(SlotId),
}

/// Point-in-time counters for one pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub size: usize,
    pub active: usize,
    pub waiting: usize,
}

struct Waiter {
    tx: oneshot::Sender<SlotId>,
    task: Option<TaskId>,
}

struct PoolState {
    config: PoolConfig,
    active: HashSet<SlotId>,
    waiters: VecDeque<Waiter>,
}

struct SlotInfo {
    pool: String,
    task: Option<TaskId>,
    acquired_at: Instant,
}

struct ManagerState {
    pools: HashMap<String, PoolState>,
    slots: HashMap<SlotId, SlotInfo>,
    next_slot: u64,
    shutdown: bool,
}

/// Gates child-process launches per named pool
pub struct WorkerPoolManager {
    state: Mutex<ManagerState>,
    default_pool: String,
}

impl std::fmt::Debug for WorkerPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPoolManager").finish_non_exhaustive()
    }
}

impl WorkerPoolManager {
    /// Declare the pool map. The default pool must be declared.
    pub fn new(
        pools: HashMap<String, PoolConfig>,
        default_pool: impl Into<String>,
    ) -> Result<Self, PoolError> {
        let default_pool = default_pool.into();
        if !pools.contains_key(&default_pool) {
            return Err(PoolError::UnknownPool(default_pool));
        }
        let pools = pools
            .into_iter()
            .map(|(name, config)| {
                (
                    name,
                    PoolState {
                        config,
                        active: HashSet::new(),
                        waiters: VecDeque::new(),
                    },
                )
            })
            .collect();
        Ok(Self {
            state: Mutex::new(ManagerState {
                pools,
                slots: HashMap::new(),
                next_slot: 1,
                shutdown: false,
            }),
            default_pool,
        })
    }

    /// Resolve the pool for a task: a feature tag naming a declared pool
    /// wins, then the priority class's pool, then the default.
    pub fn pool_for(&self, priority: Priority, feature: Option<&str>) -> String {
        let state = self.state.lock();
        if let Some(feature) = feature {
            if state.pools.contains_key(feature) {
                return feature.to_string();
            }
        }
        if state.pools.contains_key(priority.pool_name()) {
            return priority.pool_name().to_string();
        }
        self.default_pool.clone()
    }

    /// Acquire a slot, parking FIFO when the pool is at capacity.
    ///
    /// A timeout bounds the wait; `None` waits until release or shutdown.
    pub async fn acquire(
        &self,
        pool: Option<&str>,
        task: Option<TaskId>,
        timeout: Option<Duration>,
    ) -> Result<SlotId, PoolError> {
        let (name, rx) = {
            let mut state = self.state.lock();
            if state.shutdown {
                return Err(PoolError::ShuttingDown);
            }
            let name = pool.unwrap_or(&self.default_pool).to_string();
            let at_capacity = match state.pools.get(&name) {
                Some(p) => p.active.len() >= p.config.size,
                None => return Err(PoolError::UnknownPool(name)),
            };

            if !at_capacity {
                let slot = SlotId(state.next_slot);
                state.next_slot += 1;
                if let Some(p) = state.pools.get_mut(&name) {
                    p.active.insert(slot);
                }
                state.slots.insert(
                    slot,
                    SlotInfo {
                        pool: name,
                        task,
                        acquired_at: Instant::now(),
                    },
                );
                return Ok(slot);
            }

            let (tx, rx) = oneshot::channel();
            if let Some(p) = state.pools.get_mut(&name) {
                p.waiters.push_back(Waiter { tx, task });
                tracing::debug!(pool = %name, waiting = p.waiters.len(), "pool at capacity, queued waiter");
            }
            (name, rx)
        };

        match timeout {
            None => rx.await.map_err(|_| PoolError::ShuttingDown),
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(Ok(slot)) => Ok(slot),
                Ok(Err(_)) => Err(PoolError::ShuttingDown),
                Err(_) => {
                    // Expired: the waiter's receiver is dropped; release()
                    // skips dead waiters when handing out capacity.
                    Err(PoolError::AcquireTimeout {
                        pool: name,
                        waited_ms: limit.as_millis() as u64,
                    })
                }
            },
        }
    }

    /// Release a slot. Frees the capacity or hands it to the eldest live
    /// waiter. Double release is an error.
    pub fn release(&self, slot: SlotId) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        let info = state
            .slots
            .remove(&slot)
            .ok_or(PoolError::UnknownSlot(slot))?;
        if let Some(p) = state.pools.get_mut(&info.pool) {
            p.active.remove(&slot);
        }

        // Hand the capacity to the eldest waiter still listening
        loop {
            let waiter = match state.pools.get_mut(&info.pool) {
                Some(p) => match p.waiters.pop_front() {
                    Some(w) => w,
                    None => return Ok(()),
                },
                None => return Ok(()),
            };
            if waiter.tx.is_closed() {
                continue; // timed out or abandoned
            }
            let minted = SlotId(state.next_slot);
            state.next_slot += 1;
            if waiter.tx.send(minted).is_ok() {
                if let Some(p) = state.pools.get_mut(&info.pool) {
                    p.active.insert(minted);
                }
                state.slots.insert(
                    minted,
                    SlotInfo {
                        pool: info.pool.clone(),
                        task: waiter.task,
                        acquired_at: Instant::now(),
                    },
                );
                return Ok(());
            }
            // Receiver vanished between the closed check and the send;
            // the minted id is burned, move to the next waiter.
        }
    }

    pub fn get_pool_config(&self, name: &str) -> Option<PoolConfig> {
        self.state.lock().pools.get(name).map(|p| p.config.clone())
    }

    /// Pool name, task, and hold duration of a live slot
    pub fn slot_info(&self, slot: SlotId) -> Option<(String, Option<TaskId>, Duration)> {
        let state = self.state.lock();
        state
            .slots
            .get(&slot)
            .map(|info| (info.pool.clone(), info.task.clone(), info.acquired_at.elapsed()))
    }

    pub fn stats(&self) -> HashMap<String, PoolStats> {
        let state = self.state.lock();
        state
            .pools
            .iter()
            .map(|(name, pool)| {
                (
                    name.clone(),
                    PoolStats {
                        size: pool.config.size,
                        active: pool.active.len(),
                        waiting: pool.waiters.iter().filter(|w| !w.tx.is_closed()).count(),
                    },
                )
            })
            .collect()
    }

    /// Release every tracked slot and reject all pending waiters.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        state.slots.clear();
        for pool in state.pools.values_mut() {
            pool.active.clear();
            pool.waiters.clear(); // dropping senders rejects the waiters
        }
    }
}

/// RAII guard that releases its slot exactly once, on drop or explicitly.
pub struct SlotGuard {
    manager: Arc<WorkerPoolManager>,
    slot: Option<SlotId>,
}

impl SlotGuard {
    pub fn new(manager: Arc<WorkerPoolManager>, slot: SlotId) -> Self {
        Self {
            manager,
            slot: Some(slot),
        }
    }

    pub fn slot(&self) -> Option<SlotId> {
        self.slot
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            if let Err(e) = self.manager.release(slot) {
                tracing::debug!(%slot, error = %e, "slot already gone at release");
            }
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
