use chrono::{DateTime, Duration as DayOffset, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::metrics::Metrics;
use crate::store::{bounded, CounterStore, StoreError};
use crate::utils::{retry_on_transient, RetryConfig};

// ============================================================================
// Sequence Allocator - Daily order codes
// ============================================================================
//
// Codes are `VT<YYYYMMDD><seq>` with the sequence zero-padded to four digits
// (wider past 9999). The counter lives in the store; each allocation carries
// one request id across all of its retries, so a retry after a lost reply
// gets back the value already issued instead of burning another one.
//
// ============================================================================

pub const CODE_PREFIX: &str = "VT";

pub struct SequenceAllocator {
    counters: Arc<dyn CounterStore>,
    retry: RetryConfig,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl SequenceAllocator {
    pub fn new(counters: Arc<dyn CounterStore>, retry: RetryConfig, timeout: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            counters,
            retry,
            timeout,
            metrics,
        }
    }

    pub fn day_key(day: NaiveDate) -> String {
        day.format("%Y%m%d").to_string()
    }

    pub fn format_code(day_key: &str, seq: u64) -> String {
        format!("{}{}{:04}", CODE_PREFIX, day_key, seq)
    }

    /// Allocate the next code for `day`
    pub async fn next_code(&self, day: NaiveDate) -> Result<String, StoreError> {
        let day_key = Self::day_key(day);
        let request_id = Uuid::new_v4();

        let key = day_key.as_str();
        let counters = &self.counters;
        let timeout = self.timeout;

        let seq = retry_on_transient(self.retry.clone(), "sequence_increment", |_attempt| async move {
            bounded(timeout, counters.increment(key, request_id)).await
        })
        .await
        .into_result()?;

        let code = Self::format_code(&day_key, seq);
        self.metrics.order_codes_allocated.inc();

        tracing::debug!(day_key = %day_key, seq = seq, order_code = %code, "Allocated order code");
        Ok(code)
    }
}

/// Calendar day of `now` in a business timezone `offset_hours` east of UTC
pub fn business_day(now: DateTime<Utc>, offset_hours: i32) -> NaiveDate {
    (now + DayOffset::hours(offset_hours as i64)).date_naive()
}
