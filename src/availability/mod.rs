//! Free slot computation over a set of busy intervals.
//!
//! Busy intervals come straight from the calendar backend and may be
//! unsorted, overlapping or fall partly outside the query window. The
//! sweep below never moves the cursor backwards so nested and
//! overlapping blocks collapse naturally.

use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A busy block or a free block. `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub minimum_duration_minutes: i64,
}

impl AvailabilityQuery {
    pub fn new(
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        minimum_duration_minutes: i64,
    ) -> Self {
        Self {
            window_start,
            window_end,
            minimum_duration_minutes,
        }
    }

    /// Fails fast on a reversed window or a non-positive minimum.
    pub fn validate(&self) -> Result<(), InvalidRangeError> {
        if self.window_start > self.window_end {
            return Err(InvalidRangeError::ReversedWindow {
                start: self.window_start,
                end: self.window_end,
            });
        }
        if self.minimum_duration_minutes <= 0 {
            return Err(InvalidRangeError::NonPositiveDuration(
                self.minimum_duration_minutes,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRangeError {
    #[error("window start {start} is after window end {end}")]
    ReversedWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("minimum duration must be positive, got {0} minutes")]
    NonPositiveDuration(i64),
}

/// The instant `days` whole days after `start`, or `None` when it falls
/// outside chrono's representable range.
pub fn days_after(start: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|span| start.checked_add_signed(span))
}

/// Returns the free intervals of at least `minimum_duration_minutes`
/// inside the query window, ordered by start and pairwise disjoint.
pub fn compute_free_slots(
    busy: &[TimeInterval],
    query: &AvailabilityQuery,
) -> Result<Vec<TimeInterval>, InvalidRangeError> {
    query.validate()?;

    // A minimum beyond chrono's range can't fit in any window
    let Some(minimum) = Duration::try_minutes(query.minimum_duration_minutes) else {
        return Ok(Vec::new());
    };
    let mut free = Vec::new();
    let mut cursor = query.window_start;

    for interval in busy.iter().sorted_by_key(|i| (i.start, i.end)) {
        // Anything starting past the window can't open a gap inside it
        let gap_end = interval.start.min(query.window_end);
        if cursor < gap_end && gap_end - cursor >= minimum {
            free.push(TimeInterval::new(cursor, gap_end));
        }
        cursor = cursor.max(interval.end);
    }

    if cursor < query.window_end && query.window_end - cursor >= minimum {
        free.push(TimeInterval::new(cursor, query.window_end));
    }

    Ok(free)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, hour, minute, 0).unwrap()
    }

    fn interval(start: (u32, u32), end: (u32, u32)) -> TimeInterval {
        TimeInterval::new(at(start.0, start.1), at(end.0, end.1))
    }

    fn query(start: (u32, u32), end: (u32, u32), minimum: i64) -> AvailabilityQuery {
        AvailabilityQuery::new(at(start.0, start.1), at(end.0, end.1), minimum)
    }

    fn assert_well_formed(free: &[TimeInterval], q: &AvailabilityQuery) {
        for slot in free {
            assert!(slot.start >= q.window_start && slot.end <= q.window_end);
            assert!(slot.duration() >= Duration::minutes(q.minimum_duration_minutes));
        }
        for pair in free.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn it_merges_overlapping_busy_intervals() {
        let busy = vec![interval((9, 0), (10, 0)), interval((9, 30), (11, 0))];
        let q = query((9, 0), (12, 0), 30);
        let free = compute_free_slots(&busy, &q).unwrap();
        assert_eq!(free, vec![interval((11, 0), (12, 0))]);
    }

    #[test]
    fn it_returns_whole_window_when_nothing_is_busy() {
        let q = query((9, 0), (10, 30), 30);
        let free = compute_free_slots(&[], &q).unwrap();
        assert_eq!(free, vec![interval((9, 0), (10, 30))]);
    }

    #[test]
    fn it_returns_nothing_for_a_window_shorter_than_the_minimum() {
        let q = query((9, 0), (9, 10), 30);
        assert!(compute_free_slots(&[], &q).unwrap().is_empty());
    }

    #[test]
    fn it_rejects_a_reversed_window() {
        let q = query((10, 0), (9, 0), 30);
        assert!(matches!(
            compute_free_slots(&[], &q),
            Err(InvalidRangeError::ReversedWindow { .. })
        ));
    }

    #[test]
    fn it_rejects_a_non_positive_minimum() {
        assert_eq!(
            compute_free_slots(&[], &query((9, 0), (10, 0), 0)),
            Err(InvalidRangeError::NonPositiveDuration(0))
        );
        assert_eq!(
            compute_free_slots(&[], &query((9, 0), (10, 0), -15)),
            Err(InvalidRangeError::NonPositiveDuration(-15))
        );
    }

    #[test]
    fn it_skips_gaps_shorter_than_the_minimum() {
        let busy = vec![interval((9, 15), (10, 0)), interval((10, 20), (11, 0))];
        let q = query((9, 0), (12, 0), 30);
        let free = compute_free_slots(&busy, &q).unwrap();
        assert_eq!(free, vec![interval((11, 0), (12, 0))]);
    }

    #[test]
    fn it_handles_nested_busy_intervals() {
        let busy = vec![interval((9, 0), (12, 0)), interval((10, 0), (10, 30))];
        let q = query((8, 0), (13, 0), 30);
        let free = compute_free_slots(&busy, &q).unwrap();
        assert_eq!(free, vec![interval((8, 0), (9, 0)), interval((12, 0), (13, 0))]);
    }

    #[test]
    fn it_ignores_busy_intervals_outside_the_window() {
        let busy = vec![
            interval((6, 0), (7, 0)),
            interval((8, 30), (9, 30)),
            interval((14, 0), (15, 0)),
        ];
        let q = query((9, 0), (12, 0), 30);
        let free = compute_free_slots(&busy, &q).unwrap();
        assert_eq!(free, vec![interval((9, 30), (12, 0))]);
        assert_well_formed(&free, &q);
    }

    #[test]
    fn it_returns_nothing_when_the_window_is_fully_covered() {
        let busy = vec![interval((8, 0), (13, 0))];
        let q = query((9, 0), (12, 0), 30);
        assert!(compute_free_slots(&busy, &q).unwrap().is_empty());
    }

    #[test]
    fn it_is_independent_of_input_order() {
        let busy = vec![
            interval((9, 0), (9, 45)),
            interval((13, 0), (14, 0)),
            interval((10, 30), (11, 0)),
            interval((10, 45), (12, 0)),
            interval((15, 30), (16, 0)),
        ];
        let q = query((8, 0), (17, 0), 30);
        let expected = compute_free_slots(&busy, &q).unwrap();
        assert_well_formed(&expected, &q);

        let mut reversed = busy.clone();
        reversed.reverse();
        assert_eq!(compute_free_slots(&reversed, &q).unwrap(), expected);

        let mut rotated = busy.clone();
        rotated.rotate_left(2);
        assert_eq!(compute_free_slots(&rotated, &q).unwrap(), expected);
    }

    #[test]
    fn it_keeps_slots_exactly_at_the_minimum() {
        let busy = vec![interval((9, 30), (10, 0))];
        let q = query((9, 0), (10, 30), 30);
        let free = compute_free_slots(&busy, &q).unwrap();
        assert_eq!(free, vec![interval((9, 0), (9, 30)), interval((10, 0), (10, 30))]);
    }

    #[test]
    fn it_returns_nothing_for_an_out_of_range_minimum() {
        let q = query((9, 0), (12, 0), i64::MAX);
        assert_eq!(compute_free_slots(&[], &q), Ok(vec![]));

        let q = query((9, 0), (12, 0), i64::MAX / 2);
        let busy = vec![interval((10, 0), (11, 0))];
        assert_eq!(compute_free_slots(&busy, &q), Ok(vec![]));
    }

    #[test]
    fn it_holds_for_every_subset_of_a_small_grid() {
        // Half-hour blocks between 08:00 and 12:00, including overlaps
        let candidates = vec![
            interval((8, 0), (8, 30)),
            interval((8, 15), (9, 0)),
            interval((9, 0), (10, 0)),
            interval((9, 30), (9, 45)),
            interval((10, 30), (11, 30)),
            interval((11, 0), (12, 30)),
            interval((7, 0), (8, 15)),
        ];
        let queries = [
            query((8, 0), (12, 0), 15),
            query((8, 0), (12, 0), 30),
            query((8, 30), (11, 0), 45),
        ];

        for q in &queries {
            for size in 0..=candidates.len() {
                for busy in candidates.iter().copied().combinations(size) {
                    let free = compute_free_slots(&busy, q).unwrap();
                    assert_well_formed(&free, q);

                    // No free slot may overlap a busy block
                    for slot in &free {
                        assert!(busy.iter().all(|b| b.end <= slot.start || b.start >= slot.end));
                    }

                    let mut reversed = busy.clone();
                    reversed.reverse();
                    assert_eq!(compute_free_slots(&reversed, q).unwrap(), free);

                    for shift in 1..busy.len() {
                        let mut rotated = busy.clone();
                        rotated.rotate_left(shift);
                        assert_eq!(compute_free_slots(&rotated, q).unwrap(), free);
                    }
                }
            }
        }
    }

    #[test]
    fn it_bounds_window_arithmetic() {
        assert_eq!(days_after(at(9, 0), 1), Some(at(9, 0) + Duration::days(1)));
        assert_eq!(days_after(at(9, 0), 200_000_000), None);
        assert_eq!(days_after(at(9, 0), i64::MAX), None);
    }

    #[test]
    fn it_accepts_an_empty_window() {
        let q = query((9, 0), (9, 0), 30);
        assert!(compute_free_slots(&[], &q).unwrap().is_empty());
    }
}
