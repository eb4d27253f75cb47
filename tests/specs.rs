//! Behavioral specifications for the loopwork execution core.
//!
//! These tests drive the public crate APIs end-to-end with fake spawners,
//! clocks, and analyzers; no real vendor CLI is ever launched.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/selection.rs"]
mod selection;

#[path = "specs/failover.rs"]
mod failover;

#[path = "specs/breaker.rs"]
mod breaker;

#[path = "specs/cache_recovery.rs"]
mod cache_recovery;

#[path = "specs/rate_limit.rs"]
mod rate_limit;

#[path = "specs/backpressure.rs"]
mod backpressure;

#[path = "specs/healing.rs"]
mod healing;
