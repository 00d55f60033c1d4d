//! The fixed sampling grid. Every stored sample and every scheduler tick sits on a
//! 15-minute boundary of UTC wall-clock time.

use time::{Duration, OffsetDateTime, UtcOffset};

pub const QUANTUM: Duration = Duration::minutes(15);
pub const RETENTION: Duration = Duration::hours(168);
pub const PROBE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Latest boundary at or before `t`.
pub fn align_down(t: OffsetDateTime) -> OffsetDateTime {
    let t = t.to_offset(UtcOffset::UTC);
    let rem = t.unix_timestamp_nanos().rem_euclid(QUANTUM.whole_nanoseconds());
    // rem < 15 minutes in nanoseconds, well inside i64
    t - Duration::nanoseconds(rem as i64)
}

/// Earliest boundary strictly after `t`.
pub fn next_boundary_after(t: OffsetDateTime) -> OffsetDateTime {
    align_down(t) + QUANTUM
}

/// The boundary the scheduler should fire at next. Never the one it already fired, even
/// when the sleep woke slightly before that boundary on the wall clock.
pub fn next_fire(last_fired: Option<OffsetDateTime>, now: OffsetDateTime) -> OffsetDateTime {
    let next = next_boundary_after(now);
    match last_fired {
        Some(last) if next <= last => last + QUANTUM,
        _ => next,
    }
}

/// Time to sleep from `now` until `at`, zero if `at` has already passed.
pub fn delay_until(at: OffsetDateTime, now: OffsetDateTime) -> std::time::Duration {
    let d = at - now;
    if d <= Duration::ZERO { std::time::Duration::ZERO } else { d.unsigned_abs() }
}

/// Boundaries missing between the last stored sample and `now`: from the first boundary
/// after `last` up to, but excluding, the boundary `now` falls in.
pub fn missing_slots(last: OffsetDateTime, now: OffsetDateTime) -> Vec<OffsetDateTime> {
    let end = align_down(now);
    let mut slot = next_boundary_after(last);
    let mut out = Vec::new();
    while slot < end {
        out.push(slot);
        slot += QUANTUM;
    }
    out
}

/// Oldest `observed_at` a retained row may have at `now`.
pub fn retention_cutoff(now: OffsetDateTime, retention: Duration) -> OffsetDateTime {
    now - retention
}
