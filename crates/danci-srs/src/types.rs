use std::fmt;

use serde::{Deserialize, Serialize};

// 常量定义 (与既有调度数据对齐)

/// 易度因子下界
pub const MIN_EASINESS: f64 = 1.3;
/// 易度因子上界
pub const MAX_EASINESS: f64 = 2.5;
/// 新条目的初始易度因子
pub const DEFAULT_EASINESS: f64 = 2.5;
/// 首次答对后的间隔 (天)
pub const FIRST_INTERVAL_DAYS: i64 = 1;
/// 第二次答对后的间隔 (天)
pub const SECOND_INTERVAL_DAYS: i64 = 6;
/// 间隔封顶 (100 年)，防止极长复习链溢出日期运算
pub const MAX_INTERVAL_DAYS: i64 = 36500;

/// MASTERED 阈值，两项均为严格大于
pub const MASTERED_MIN_REPETITIONS: i64 = 8;
pub const MASTERED_MIN_INTERVAL_DAYS: i64 = 21;
/// LEARNED / FAMILIAR 阈值 (>=)
pub const LEARNED_MIN_REPETITIONS: i64 = 6;
pub const FAMILIAR_MIN_REPETITIONS: i64 = 3;

/// 冻结令牌持有上限
pub const MAX_FREEZES: i64 = 5;
/// 每月补充的冻结令牌数
pub const MONTHLY_FREEZES: i64 = 2;

/// 质量评分 (0-5), SM-2 的置信度标度
///
/// 0 = 完全遗忘 ("blackout"), 5 = 毫不费力地回忆 ("perfect")。
/// 原始整数在系统边界经 `TryFrom<i64>` 校验后才会进入调度函数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityRating {
    Blackout = 0,
    Wrong = 1,
    AlmostRecalled = 2,
    Difficult = 3,
    Hesitant = 4,
    Perfect = 5,
}

impl QualityRating {
    pub const ALL: [QualityRating; 6] = [
        QualityRating::Blackout,
        QualityRating::Wrong,
        QualityRating::AlmostRecalled,
        QualityRating::Difficult,
        QualityRating::Hesitant,
        QualityRating::Perfect,
    ];

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// q >= 3 视为成功复习
    pub fn is_successful(self) -> bool {
        self.as_i64() >= 3
    }
}

/// 非法质量评分 (边界校验错误)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidQuality(pub i64);

impl fmt::Display for InvalidQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quality rating out of range 0-5: {}", self.0)
    }
}

impl std::error::Error for InvalidQuality {}

impl TryFrom<i64> for QualityRating {
    type Error = InvalidQuality;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QualityRating::Blackout),
            1 => Ok(QualityRating::Wrong),
            2 => Ok(QualityRating::AlmostRecalled),
            3 => Ok(QualityRating::Difficult),
            4 => Ok(QualityRating::Hesitant),
            5 => Ok(QualityRating::Perfect),
            other => Err(InvalidQuality(other)),
        }
    }
}

/// 三键难度反馈, 确定性映射到质量评分 3/4/5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifficultyRating {
    Hard,
    Good,
    Easy,
}

impl DifficultyRating {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hard" => Some(DifficultyRating::Hard),
            "good" => Some(DifficultyRating::Good),
            "easy" => Some(DifficultyRating::Easy),
            _ => None,
        }
    }

    pub fn to_quality(self) -> QualityRating {
        match self {
            DifficultyRating::Hard => QualityRating::Difficult,
            DifficultyRating::Good => QualityRating::Hesitant,
            DifficultyRating::Easy => QualityRating::Perfect,
        }
    }
}

/// 掌握度分级, 由调度状态派生, 永不落库
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MasteryLevel {
    New,
    Learning,
    Familiar,
    Learned,
    Mastered,
}

impl MasteryLevel {
    pub const ALL: [MasteryLevel; 5] = [
        MasteryLevel::New,
        MasteryLevel::Learning,
        MasteryLevel::Familiar,
        MasteryLevel::Learned,
        MasteryLevel::Mastered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MasteryLevel::New => "NEW",
            MasteryLevel::Learning => "LEARNING",
            MasteryLevel::Familiar => "FAMILIAR",
            MasteryLevel::Learned => "LEARNED",
            MasteryLevel::Mastered => "MASTERED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "NEW" | "new" => Some(MasteryLevel::New),
            "LEARNING" | "learning" => Some(MasteryLevel::Learning),
            "FAMILIAR" | "familiar" => Some(MasteryLevel::Familiar),
            "LEARNED" | "learned" => Some(MasteryLevel::Learned),
            "MASTERED" | "mastered" => Some(MasteryLevel::Mastered),
            _ => None,
        }
    }

    pub fn to_index(&self) -> usize {
        match self {
            MasteryLevel::New => 0,
            MasteryLevel::Learning => 1,
            MasteryLevel::Familiar => 2,
            MasteryLevel::Learned => 3,
            MasteryLevel::Mastered => 4,
        }
    }
}

/// 单词级调度状态 (每个 user x word 一条, 首次复习时惰性创建)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingState {
    /// 易度因子, 始终处于 [1.3, 2.5]
    pub easiness_factor: f64,
    /// 距下次复习的天数
    pub interval: i64,
    /// 自上次失败以来的连续成功次数
    pub repetitions: i64,
}

impl Default for SchedulingState {
    fn default() -> Self {
        Self {
            easiness_factor: DEFAULT_EASINESS,
            interval: 0,
            repetitions: 0,
        }
    }
}

impl SchedulingState {
    pub fn is_new(&self) -> bool {
        self.repetitions == 0 && self.interval == 0
    }
}
