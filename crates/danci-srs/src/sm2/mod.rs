//! SM-2 Spaced Repetition Scheduler - Native Rust Implementation
//!
//! Core update rule:
//! - EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), clamped to [1.3, 2.5]
//! - q < 3 resets interval and repetition count to zero; EF is still
//!   recalculated, so repeated failure keeps lowering item easiness
//! - first success -> 1 day, second -> 6 days, afterwards
//!   round(previous interval * EF'), rounding half away from zero
//!
//! The next review date is calendar-day addition on the reference date,
//! never millisecond arithmetic: month/year rollover and leap years come
//! from chrono's calendar.
//!
//! References:
//! - Wozniak, P. A. (1990). Optimization of learning. (SuperMemo SM-2)

use chrono::NaiveDate;

use crate::types::{
    QualityRating, SchedulingState, FIRST_INTERVAL_DAYS, MAX_EASINESS, MAX_INTERVAL_DAYS,
    MIN_EASINESS, SECOND_INTERVAL_DAYS,
};

/// 一次复习的调度结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewOutcome {
    pub next: SchedulingState,
    pub next_review_date: NaiveDate,
    pub was_successful: bool,
}

/// SM-2 调度: 当前状态 + 质量评分 -> 下一个状态与复习日期
///
/// 输入的 `quality` 已在系统边界完成校验, 0 和 5 均为合法边界值。
pub fn compute_next_schedule(
    current: &SchedulingState,
    quality: QualityRating,
    reference_date: NaiveDate,
) -> ReviewOutcome {
    let was_successful = quality.is_successful();

    // 无论成败 EF 都会重算
    let easiness_factor = next_easiness(current.easiness_factor, quality);

    let (interval, repetitions) = if was_successful {
        let repetitions = current.repetitions + 1;
        let interval = match repetitions {
            1 => FIRST_INTERVAL_DAYS,
            2 => SECOND_INTERVAL_DAYS,
            // 用旧间隔乘新 EF, 四舍五入远离零
            _ => round_half_away(current.interval as f64 * easiness_factor)
                .min(MAX_INTERVAL_DAYS),
        };
        (interval, repetitions)
    } else {
        (0, 0)
    };

    let next_review_date = reference_date + chrono::Duration::days(interval);

    ReviewOutcome {
        next: SchedulingState {
            easiness_factor,
            interval,
            repetitions,
        },
        next_review_date,
        was_successful,
    }
}

fn next_easiness(easiness: f64, quality: QualityRating) -> f64 {
    let q = quality.as_i64() as f64;
    let updated = easiness + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02));
    updated.clamp(MIN_EASINESS, MAX_EASINESS)
}

fn round_half_away(value: f64) -> i64 {
    // f64::round 即 half-away-from-zero; 饱和转换防御极端间隔
    value.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_EASINESS;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_success_gives_one_day() {
        let outcome = compute_next_schedule(
            &SchedulingState::default(),
            QualityRating::Hesitant,
            day(2024, 3, 1),
        );
        assert!(outcome.was_successful);
        assert_eq!(outcome.next.repetitions, 1);
        assert_eq!(outcome.next.interval, 1);
        assert_eq!(outcome.next.easiness_factor, DEFAULT_EASINESS);
        assert_eq!(outcome.next_review_date, day(2024, 3, 2));
    }

    #[test]
    fn test_second_success_gives_six_days() {
        let state = SchedulingState {
            easiness_factor: 2.5,
            interval: 1,
            repetitions: 1,
        };
        let outcome = compute_next_schedule(&state, QualityRating::Hesitant, day(2024, 3, 2));
        assert_eq!(outcome.next.repetitions, 2);
        assert_eq!(outcome.next.interval, 6);
        assert_eq!(outcome.next_review_date, day(2024, 3, 8));
    }

    #[test]
    fn test_third_success_multiplies_previous_interval() {
        let state = SchedulingState {
            easiness_factor: 2.5,
            interval: 6,
            repetitions: 2,
        };
        let outcome = compute_next_schedule(&state, QualityRating::Perfect, day(2024, 3, 8));
        assert_eq!(outcome.next.repetitions, 3);
        assert_eq!(outcome.next.interval, 15); // round(6 * 2.5)
        assert_eq!(outcome.next.easiness_factor, 2.5);
    }

    #[test]
    fn test_failure_resets_interval_and_repetitions() {
        let state = SchedulingState {
            easiness_factor: 2.5,
            interval: 6,
            repetitions: 2,
        };
        let outcome =
            compute_next_schedule(&state, QualityRating::AlmostRecalled, day(2024, 3, 8));
        assert!(!outcome.was_successful);
        assert_eq!(outcome.next.interval, 0);
        assert_eq!(outcome.next.repetitions, 0);
        assert_eq!(outcome.next_review_date, day(2024, 3, 8));
    }

    #[test]
    fn test_failure_still_lowers_easiness() {
        // 失败复习依然压低 EF, 这是被刻意保留的既有行为
        let state = SchedulingState {
            easiness_factor: 2.5,
            interval: 6,
            repetitions: 2,
        };
        let outcome =
            compute_next_schedule(&state, QualityRating::AlmostRecalled, day(2024, 3, 8));
        let expected = 2.5 + (0.1 - 3.0 * (0.08 + 3.0 * 0.02));
        assert!((outcome.next.easiness_factor - expected).abs() < 1e-9);
        assert!(outcome.next.easiness_factor < 2.5);
    }

    #[test]
    fn test_repeated_blackout_pins_easiness_at_floor() {
        let mut state = SchedulingState::default();
        for _ in 0..10 {
            state = compute_next_schedule(&state, QualityRating::Blackout, day(2024, 1, 1)).next;
        }
        assert_eq!(state.easiness_factor, MIN_EASINESS);
        assert_eq!(state.interval, 0);
        assert_eq!(state.repetitions, 0);
    }

    #[test]
    fn test_easiness_stays_in_bounds_for_all_qualities() {
        for quality in QualityRating::ALL {
            for start in [1.3, 1.7, 2.0, 2.5] {
                let state = SchedulingState {
                    easiness_factor: start,
                    interval: 10,
                    repetitions: 5,
                };
                let next = compute_next_schedule(&state, quality, day(2024, 6, 1)).next;
                assert!(
                    (MIN_EASINESS..=MAX_EASINESS).contains(&next.easiness_factor),
                    "EF {} escaped bounds for q={:?} start={}",
                    next.easiness_factor,
                    quality,
                    start
                );
            }
        }
    }

    #[test]
    fn test_perfect_quality_keeps_easiness_at_cap() {
        let state = SchedulingState::default();
        let next = compute_next_schedule(&state, QualityRating::Perfect, day(2024, 6, 1)).next;
        assert_eq!(next.easiness_factor, MAX_EASINESS);
    }

    #[test]
    fn test_long_review_chain_does_not_overflow() {
        let mut state = SchedulingState::default();
        let reference = day(2024, 1, 1);
        for _ in 0..60 {
            let outcome = compute_next_schedule(&state, QualityRating::Perfect, reference);
            assert!(outcome.next.interval >= 0);
            assert!(outcome.next.interval <= MAX_INTERVAL_DAYS);
            state = outcome.next;
        }
        assert_eq!(state.repetitions, 60);
        assert_eq!(state.interval, MAX_INTERVAL_DAYS);
    }

    #[test]
    fn test_calendar_rollover_month_and_leap_year() {
        // 2024-02-28 + 1 天 = 闰日
        let state = SchedulingState::default();
        let outcome = compute_next_schedule(&state, QualityRating::Hesitant, day(2024, 2, 28));
        assert_eq!(outcome.next_review_date, day(2024, 2, 29));

        // 2023-12-30 + 6 天跨年
        let state = SchedulingState {
            easiness_factor: 2.5,
            interval: 1,
            repetitions: 1,
        };
        let outcome = compute_next_schedule(&state, QualityRating::Hesitant, day(2023, 12, 30));
        assert_eq!(outcome.next_review_date, day(2024, 1, 5));
    }

    #[test]
    fn test_interval_rounding_half_away_from_zero() {
        // interval=5, EF=1.3 -> 6.5 -> 7
        let state = SchedulingState {
            easiness_factor: 1.3,
            interval: 5,
            repetitions: 2,
        };
        let outcome = compute_next_schedule(&state, QualityRating::Difficult, day(2024, 3, 1));
        // q=3: EF' = 1.3 + (0.1 - 2*(0.08+2*0.02)) = 1.3 -> 夹在下界
        assert_eq!(outcome.next.easiness_factor, MIN_EASINESS);
        assert_eq!(outcome.next.interval, 7);
    }
}
