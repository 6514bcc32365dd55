//! Document codes of the form `PREFIX-YYYYMMDDhhmmss`

use std::sync::Mutex;

use chrono::{TimeZone, Utc};

use crate::types::MILLIS_PER_SECOND;

/// Hands out one code second per document within this process.
///
/// A request landing in a second that was already handed out takes the next free
/// second instead, so two creates in the same process never share a code.
///
/// Stamps are UTC for every branch.
#[derive(Debug, Default)]
pub struct CodeClock {
    last_second: Mutex<i64>,
}

impl CodeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, prefix: &str, now_millis: i64) -> String {
        let wanted = now_millis.div_euclid(MILLIS_PER_SECOND);
        let second = {
            let mut last = self
                .last_second
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let second = wanted.max(*last + 1);
            *last = second;
            second
        };
        format_code(prefix, second)
    }
}

pub fn format_code(prefix: &str, epoch_second: i64) -> String {
    let stamp = Utc
        .timestamp_opt(epoch_second, 0)
        .single()
        .map(|t| t.format("%Y%m%d%H%M%S").to_string())
        .unwrap_or_else(|| epoch_second.to_string());
    format!("{}-{}", prefix, stamp)
}
