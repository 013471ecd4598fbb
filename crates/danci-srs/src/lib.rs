//! # danci-srs - 间隔重复与学习连续性核心算法库
//!
//! 本 crate 提供纯 Rust 实现的调度算法:
//!
//! - **SM-2 Scheduler** - SuperMemo-2 间隔重复调度
//! - **Mastery Classifier** - 由调度状态派生的掌握度分级
//! - **Streak** - 连续学习天数状态机与冻结令牌
//! - **Progress** - 每日学习计数器的纯合并逻辑
//!
//! ## 设计理念
//!
//! - **纯函数** - 无 I/O、无内部可变状态，输入输出均为显式记录
//! - **封闭值集** - 质量评分与掌握度均为枚举，非法值在构造时即被拒绝
//! - **UTC 日历日** - 所有日期运算基于 UTC 零点归一化的日历日
//! - **充分测试** - 所有算法都有完整的单元测试
//!
//! ## 模块结构
//!
//! - [`sm2`] - SM-2 调度 (间隔、易度因子)
//! - [`mastery`] - 掌握度分级
//! - [`streak`] - 连续天数状态机与月度冻结补充
//! - [`progress`] - 每日进度计数器增量
//! - [`types`] - 公共类型和常量
//!
//! ## 使用示例
//!
//! ```rust
//! use chrono::NaiveDate;
//! use danci_srs::{compute_next_schedule, QualityRating, SchedulingState};
//!
//! let state = SchedulingState::default();
//! let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let outcome = compute_next_schedule(&state, QualityRating::Hesitant, today);
//! assert_eq!(outcome.next.interval, 1);
//! ```

// ============================================================================
// 模块声明
// ============================================================================

pub mod mastery;
pub mod progress;
pub mod sm2;
pub mod streak;
pub mod types;

// ============================================================================
// 重导出
// ============================================================================

pub use mastery::classify;
pub use progress::{normalize_to_day, ProgressCounters, ProgressDelta};
pub use sm2::{compute_next_schedule, ReviewOutcome};
pub use streak::{calculate_streak, monthly_reset_due, replenished_freezes, StreakOutcome};
pub use types::{
    DifficultyRating, InvalidQuality, MasteryLevel, QualityRating, SchedulingState,
    DEFAULT_EASINESS, MAX_EASINESS, MAX_FREEZES, MIN_EASINESS, MONTHLY_FREEZES,
};
