// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Settle policies: how long to let a rendered page settle before reading it.

use crate::renderer::{RenderContext, RenderResult};
use serde::Serialize;
use std::time::Duration;

/// Strategy applied after navigation and before extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettlePolicy {
    /// Sleep for a fixed duration.
    Delay { millis: u64 },
    /// Wait until `selector` is visible, bounded by `timeout_ms`.
    UntilVisible { selector: String, timeout_ms: u64 },
    /// Read immediately.
    Immediate,
}

impl SettlePolicy {
    pub fn delay(duration: Duration) -> Self {
        Self::Delay {
            millis: duration.as_millis() as u64,
        }
    }

    pub fn until_visible(selector: impl Into<String>, timeout: Duration) -> Self {
        Self::UntilVisible {
            selector: selector.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Apply the policy against `ctx`.
    pub async fn settle(&self, ctx: &dyn RenderContext) -> RenderResult<()> {
        match self {
            Self::Delay { millis } => {
                if *millis > 0 {
                    tokio::time::sleep(Duration::from_millis(*millis)).await;
                }
                Ok(())
            }
            Self::UntilVisible {
                selector,
                timeout_ms,
            } => {
                ctx.wait_visible(selector, Duration::from_millis(*timeout_ms))
                    .await
            }
            Self::Immediate => Ok(()),
        }
    }
}

impl std::fmt::Display for SettlePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delay { millis } => write!(f, "delay {millis}ms"),
            Self::UntilVisible {
                selector,
                timeout_ms,
            } => write!(f, "until `{selector}` visible (max {timeout_ms}ms)"),
            Self::Immediate => write!(f, "immediate"),
        }
    }
}
