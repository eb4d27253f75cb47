// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM-fallback analyzer boundary
//!
//! Escalation target for error-looking lines no pattern recognized. The
//! production wiring (which model, which token) belongs to the embedder;
//! the healer only rations and caches the calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Structured result of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub root_cause: String,
    pub suggested_fixes: Vec<String>,
    pub confidence: f64,
}

/// Analyzes an error excerpt out of band
#[async_trait]
pub trait FallbackAnalyzer: Send + Sync {
    async fn analyze(&self, error_text: &str) -> Result<Analysis, String>;
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAnalyzer;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Scripted analyzer that records every call
    #[derive(Clone, Default)]
    pub struct FakeAnalyzer {
        calls: Arc<Mutex<Vec<String>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl FakeAnalyzer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every analysis call fail
        pub fn failing() -> Self {
            let analyzer = Self::default();
            *analyzer.fail.lock() = true;
            analyzer
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl FallbackAnalyzer for FakeAnalyzer {
        async fn analyze(&self, error_text: &str) -> Result<Analysis, String> {
            self.calls.lock().push(error_text.to_string());
            if *self.fail.lock() {
                return Err("analyzer unavailable".to_string());
            }
            Ok(Analysis {
                root_cause: format!("analyzed: {error_text}"),
                suggested_fixes: vec!["retry with a different model".to_string()],
                confidence: 0.5,
            })
        }
    }
}
