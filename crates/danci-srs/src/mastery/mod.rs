//! Mastery level classification
//!
//! 掌握度是调度状态的纯派生视图: 永不落库, 读取时重算。
//! MASTERED 同时要求 repetitions 与 interval 越过阈值 (均为严格大于),
//! 不能并入单独的 repetitions 阶梯 —— interval 未达标的高重复条目
//! 仍然停留在 LEARNED。

use crate::types::{
    MasteryLevel, SchedulingState, FAMILIAR_MIN_REPETITIONS, LEARNED_MIN_REPETITIONS,
    MASTERED_MIN_INTERVAL_DAYS, MASTERED_MIN_REPETITIONS,
};

/// 调度状态 -> 掌握度; 无状态 (从未复习) 即 NEW
pub fn classify(state: Option<&SchedulingState>) -> MasteryLevel {
    let Some(state) = state else {
        return MasteryLevel::New;
    };

    if state.repetitions > MASTERED_MIN_REPETITIONS
        && state.interval > MASTERED_MIN_INTERVAL_DAYS
    {
        MasteryLevel::Mastered
    } else if state.repetitions >= LEARNED_MIN_REPETITIONS {
        MasteryLevel::Learned
    } else if state.repetitions >= FAMILIAR_MIN_REPETITIONS {
        MasteryLevel::Familiar
    } else {
        MasteryLevel::Learning
    }
}
