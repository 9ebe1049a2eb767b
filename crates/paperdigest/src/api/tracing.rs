//! Correlation IDs and token accounting for pipeline runs.
//!
//! Each document run gets a `trace_id`; each attempt inside it a `span_id`.
//! [`UsageTracker`] accumulates calls and reported token usage per
//! [`CallKind`], so a runaway retry loop shows up in the final log line.

use super::model::CallKind;
use crate::UsageInfo;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Generate a unique trace ID for a document run.
pub fn generate_trace_id() -> String {
    let ts = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("pd-{ts:x}-{count:04x}")
}

/// Generate a span ID for an attempt within a run.
pub fn generate_span_id(trace_id: &str, attempt: u32) -> String {
    format!("{trace_id}:a{attempt}")
}

/// Counters for one kind of call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindUsage {
    pub calls: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Cumulative calls and token usage, broken down by [`CallKind`].
///
/// Only successful calls are recorded; retried failures are not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageTracker {
    by_kind: BTreeMap<CallKind, KindUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful call. Missing usage counts as zero tokens.
    pub fn record(&mut self, kind: CallKind, usage: Option<&UsageInfo>) {
        let entry = self.by_kind.entry(kind).or_default();
        entry.calls += 1;
        if let Some(u) = usage {
            entry.prompt_tokens += u64::from(u.prompt_tokens.unwrap_or(0));
            entry.completion_tokens += u64::from(u.completion_tokens.unwrap_or(0));
        }
    }

    /// Counters for one kind (zero if never called).
    pub fn get(&self, kind: CallKind) -> KindUsage {
        self.by_kind.get(&kind).copied().unwrap_or_default()
    }

    pub fn calls(&self, kind: CallKind) -> u32 {
        self.get(kind).calls
    }

    pub fn total_calls(&self) -> u32 {
        self.by_kind.values().map(|u| u.calls).sum()
    }

    pub fn total_tokens(&self) -> u64 {
        self.by_kind
            .values()
            .map(|u| u.prompt_tokens + u.completion_tokens)
            .sum()
    }

    /// Format as a short summary string.
    pub fn summary(&self) -> String {
        let per_kind: Vec<String> = self
            .by_kind
            .iter()
            .map(|(kind, u)| format!("{kind}={}", u.calls))
            .collect();
        format!(
            "calls: {} ({}), tokens: {} total",
            self.total_calls(),
            per_kind.join(", "),
            self.total_tokens(),
        )
    }
}
