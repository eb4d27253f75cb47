// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lw-adapters: process, filesystem, and vendor-CLI adapters
//!
//! Everything here sits at the boundary between the execution engine and
//! the operating system: spawning children, resolving vendor binaries,
//! probing free memory, and assembling per-vendor command lines.

pub mod cli_path;
pub mod env;
pub mod logsink;
pub mod memory;
pub mod spawner;
pub mod strategy;
pub mod subprocess;

pub use logsink::{LogSink, SubscriberToken};
pub use spawner::{
    ChildControl, OutputChunk, PipeSpawner, ProcessSpawner, Signal, SpawnError, SpawnMode,
    SpawnModeDetector, SpawnOptions, SpawnedChild,
};
pub use strategy::{CliStrategy, Invocation, StrategyRegistry};

#[cfg(any(test, feature = "test-support"))]
pub use spawner::{FakeSpawner, ScriptedRun, SpawnCall};
