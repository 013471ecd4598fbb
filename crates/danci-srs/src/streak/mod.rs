//! Study streak state machine
//!
//! Day-gap rules over g = days_between(last_study_date, current_date):
//! - first-ever study -> streak 1
//! - g == 0 (same day)  -> pass-through, nothing changes
//! - g == 1             -> increment, no freeze needed
//! - g == 2 with a freeze available -> increment and consume one token
//! - anything else (g == 2 without tokens, g >= 3, clock skew) -> reset
//!   to 1; the longest streak is never reset
//!
//! 冻结令牌只能桥接恰好一个缺勤日。缺勤 3 天以上无论余额多少都会断签,
//! 令牌不会叠加使用。
//!
//! The shell decrements the token balance when `freeze_used` comes back
//! true; the pure core never touches the balance itself.

use chrono::{Datelike, NaiveDate};

use crate::types::{MAX_FREEZES, MONTHLY_FREEZES};

/// 连续天数计算结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakOutcome {
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_study_date: NaiveDate,
    pub freeze_used: bool,
}

/// 连续天数状态机 (纯计算)
pub fn calculate_streak(
    last_study_date: Option<NaiveDate>,
    current_date: NaiveDate,
    current_streak: i64,
    longest_streak: i64,
    freezes_remaining: i64,
) -> StreakOutcome {
    let Some(last) = last_study_date else {
        // 首次学习
        return StreakOutcome {
            current_streak: 1,
            longest_streak: longest_streak.max(1),
            last_study_date: current_date,
            freeze_used: false,
        };
    };

    let gap = (current_date - last).num_days();

    match gap {
        0 => StreakOutcome {
            current_streak,
            longest_streak,
            last_study_date: current_date,
            freeze_used: false,
        },
        1 => incremented(current_streak, longest_streak, current_date, false),
        2 if freezes_remaining > 0 => {
            incremented(current_streak, longest_streak, current_date, true)
        }
        _ => StreakOutcome {
            current_streak: 1,
            longest_streak,
            last_study_date: current_date,
            freeze_used: false,
        },
    }
}

fn incremented(
    current_streak: i64,
    longest_streak: i64,
    current_date: NaiveDate,
    freeze_used: bool,
) -> StreakOutcome {
    let current_streak = current_streak + 1;
    StreakOutcome {
        current_streak,
        longest_streak: longest_streak.max(current_streak),
        last_study_date: current_date,
        freeze_used,
    }
}

/// 月度补充判定: 从未补充过, 或上次补充的 (年,月) 严格早于当前 (年,月)
pub fn monthly_reset_due(last_reset: Option<NaiveDate>, today: NaiveDate) -> bool {
    match last_reset {
        None => true,
        Some(last) => (last.year(), last.month()) < (today.year(), today.month()),
    }
}

/// 补充后的冻结余额, 封顶 MAX_FREEZES
pub fn replenished_freezes(freezes_remaining: i64) -> i64 {
    (freezes_remaining + MONTHLY_FREEZES).min(MAX_FREEZES)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_ever_study_starts_at_one() {
        let outcome = calculate_streak(None, day(2024, 3, 10), 0, 0, 0);
        assert_eq!(outcome.current_streak, 1);
        assert_eq!(outcome.longest_streak, 1);
        assert_eq!(outcome.last_study_date, day(2024, 3, 10));
        assert!(!outcome.freeze_used);
    }

    #[test]
    fn test_same_day_repeat_is_noop() {
        let outcome = calculate_streak(Some(day(2024, 3, 10)), day(2024, 3, 10), 7, 12, 3);
        assert_eq!(outcome.current_streak, 7);
        assert_eq!(outcome.longest_streak, 12);
        assert!(!outcome.freeze_used);
    }

    #[test]
    fn test_consecutive_day_increments_without_freeze() {
        // 余额为零也不影响连续日递增
        for freezes in [0, 3, 5] {
            let outcome =
                calculate_streak(Some(day(2024, 3, 10)), day(2024, 3, 11), 4, 4, freezes);
            assert_eq!(outcome.current_streak, 5);
            assert_eq!(outcome.longest_streak, 5);
            assert!(!outcome.freeze_used);
        }
    }

    #[test]
    fn test_longest_streak_tracks_new_peak() {
        let outcome = calculate_streak(Some(day(2024, 3, 10)), day(2024, 3, 11), 12, 12, 0);
        assert_eq!(outcome.longest_streak, 13);

        let outcome = calculate_streak(Some(day(2024, 3, 10)), day(2024, 3, 11), 3, 20, 0);
        assert_eq!(outcome.longest_streak, 20);
    }

    #[test]
    fn test_one_missed_day_with_freeze_bridges() {
        let outcome = calculate_streak(Some(day(2024, 3, 10)), day(2024, 3, 12), 10, 10, 2);
        assert_eq!(outcome.current_streak, 11);
        assert_eq!(outcome.longest_streak, 11);
        assert!(outcome.freeze_used);
    }

    #[test]
    fn test_one_missed_day_without_freeze_resets() {
        let outcome = calculate_streak(Some(day(2024, 3, 10)), day(2024, 3, 12), 10, 10, 0);
        assert_eq!(outcome.current_streak, 1);
        assert_eq!(outcome.longest_streak, 10);
        assert!(!outcome.freeze_used);
    }

    #[test]
    fn test_multi_day_gap_resets_even_with_full_balance() {
        // 令牌不叠加: 3 天缺勤直接断签
        let outcome = calculate_streak(Some(day(2024, 3, 10)), day(2024, 3, 13), 10, 10, 5);
        assert_eq!(outcome.current_streak, 1);
        assert_eq!(outcome.longest_streak, 10);
        assert!(!outcome.freeze_used);
    }

    #[test]
    fn test_backwards_date_resets() {
        // 时钟回拨按断签处理
        let outcome = calculate_streak(Some(day(2024, 3, 10)), day(2024, 3, 8), 6, 9, 5);
        assert_eq!(outcome.current_streak, 1);
        assert_eq!(outcome.longest_streak, 9);
        assert!(!outcome.freeze_used);
    }

    #[test]
    fn test_gap_across_month_boundary() {
        let outcome = calculate_streak(Some(day(2024, 2, 29)), day(2024, 3, 1), 5, 5, 0);
        assert_eq!(outcome.current_streak, 6);
    }

    #[test]
    fn test_monthly_reset_due() {
        assert!(monthly_reset_due(None, day(2024, 3, 15)));
        assert!(monthly_reset_due(Some(day(2024, 2, 29)), day(2024, 3, 1)));
        assert!(monthly_reset_due(Some(day(2023, 12, 31)), day(2024, 1, 1)));
        // 本月已补充过: 幂等
        assert!(!monthly_reset_due(Some(day(2024, 3, 1)), day(2024, 3, 31)));
        // 未来的标记不触发补充
        assert!(!monthly_reset_due(Some(day(2024, 4, 1)), day(2024, 3, 31)));
    }

    #[test]
    fn test_replenished_freezes_caps_at_max() {
        assert_eq!(replenished_freezes(0), 2);
        assert_eq!(replenished_freezes(2), 4);
        assert_eq!(replenished_freezes(4), MAX_FREEZES);
        assert_eq!(replenished_freezes(5), MAX_FREEZES);
    }
}
