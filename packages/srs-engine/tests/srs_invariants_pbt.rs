//! Property-Based Tests for the scheduling core
//!
//! Pins the following invariants:
//! - EF bounds: for any quality and any starting EF in [1.3, 2.5], the
//!   resulting EF stays within [1.3, 2.5]
//! - Failure reset: quality < 3 always yields interval 0, repetitions 0
//! - Success step: repetitions always advance by exactly one
//! - Review date: next_review_date == reference_date + interval days
//! - Streak: longest never decreases; a freeze is consumed only on an
//!   exact two-day gap with a positive balance

use chrono::NaiveDate;
use proptest::prelude::*;

use danci_srs::types::{MAX_EASINESS, MIN_EASINESS};
use danci_srs::{calculate_streak, compute_next_schedule, QualityRating, SchedulingState};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_quality() -> impl Strategy<Value = QualityRating> {
    (0i64..=5).prop_map(|q| QualityRating::try_from(q).unwrap())
}

fn arb_state() -> impl Strategy<Value = SchedulingState> {
    (13u32..=25u32, 0i64..=2000, 0i64..=100).prop_map(|(ef_tenths, interval, repetitions)| {
        // 真实链路里 repetitions >= 2 的状态 interval 必然 >= 1
        let interval = if repetitions >= 2 { interval.max(1) } else { interval };
        SchedulingState {
            easiness_factor: ef_tenths as f64 / 10.0,
            interval,
            repetitions,
        }
    })
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..=2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

// ============================================================================
// SM-2 invariants
// ============================================================================

proptest! {
    #[test]
    fn ef_never_leaves_bounds(state in arb_state(), quality in arb_quality(), date in arb_date()) {
        let outcome = compute_next_schedule(&state, quality, date);
        prop_assert!(outcome.next.easiness_factor >= MIN_EASINESS);
        prop_assert!(outcome.next.easiness_factor <= MAX_EASINESS);
    }

    #[test]
    fn failure_always_resets_interval_and_repetitions(
        state in arb_state(),
        quality in (0i64..=2).prop_map(|q| QualityRating::try_from(q).unwrap()),
        date in arb_date(),
    ) {
        let outcome = compute_next_schedule(&state, quality, date);
        prop_assert!(!outcome.was_successful);
        prop_assert_eq!(outcome.next.interval, 0);
        prop_assert_eq!(outcome.next.repetitions, 0);
        prop_assert_eq!(outcome.next_review_date, date);
    }

    #[test]
    fn success_advances_repetitions_by_one(
        state in arb_state(),
        quality in (3i64..=5).prop_map(|q| QualityRating::try_from(q).unwrap()),
        date in arb_date(),
    ) {
        let outcome = compute_next_schedule(&state, quality, date);
        prop_assert!(outcome.was_successful);
        prop_assert_eq!(outcome.next.repetitions, state.repetitions + 1);
        prop_assert!(outcome.next.interval >= 1);
    }

    #[test]
    fn next_review_date_matches_interval(
        state in arb_state(),
        quality in arb_quality(),
        date in arb_date(),
    ) {
        let outcome = compute_next_schedule(&state, quality, date);
        let expected = date + chrono::Duration::days(outcome.next.interval);
        prop_assert_eq!(outcome.next_review_date, expected);
    }
}

// ============================================================================
// Streak invariants
// ============================================================================

proptest! {
    #[test]
    fn longest_streak_never_decreases(
        gap in 0i64..=10,
        current in 0i64..=400,
        extra in 0i64..=50,
        freezes in 0i64..=5,
        date in arb_date(),
    ) {
        let longest = current + extra;
        let last = date - chrono::Duration::days(gap);
        let outcome = calculate_streak(Some(last), date, current, longest, freezes);
        prop_assert!(outcome.longest_streak >= longest);
        prop_assert_eq!(outcome.last_study_date, date);
    }

    #[test]
    fn freeze_consumed_only_on_exact_two_day_gap(
        gap in 0i64..=10,
        current in 0i64..=400,
        freezes in 0i64..=5,
        date in arb_date(),
    ) {
        let last = date - chrono::Duration::days(gap);
        let outcome = calculate_streak(Some(last), date, current, current, freezes);
        if outcome.freeze_used {
            prop_assert_eq!(gap, 2);
            prop_assert!(freezes > 0);
        }
        if gap >= 3 {
            prop_assert_eq!(outcome.current_streak, 1);
            prop_assert!(!outcome.freeze_used);
        }
    }

    #[test]
    fn studying_after_a_gap_always_restarts_at_least_at_one(
        gap in 1i64..=30,
        current in 0i64..=400,
        freezes in 0i64..=5,
        date in arb_date(),
    ) {
        let last = date - chrono::Duration::days(gap);
        let outcome = calculate_streak(Some(last), date, current, current, freezes);
        prop_assert!(outcome.current_streak >= 1);
    }
}
