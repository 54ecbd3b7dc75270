use chrono::{DateTime, Duration, Utc};

use crate::aggregate::AggregationResult;

/// Restrict `result` to versions downloaded within the last `since_days`
/// days, measured back from `now`.
///
/// `None` returns the input unchanged. Versions never downloaded are dropped,
/// and so are packages with nothing left.
pub fn filter_since(
    result: &AggregationResult,
    since_days: Option<u32>,
    now: DateTime<Utc>,
) -> AggregationResult {
    let Some(days) = since_days else {
        return result.clone();
    };
    let cutoff = now - Duration::days(i64::from(days));
    result.retain_versions(|v| matches!(v.last_downloaded, Some(at) if at >= cutoff && at <= now))
}
