//! Daily progress counters
//!
//! 每 user x 日历日 一条累计记录。update 永远是增量合并, 不覆盖:
//! 同一天两次 `words_studied: 5` 的增量最终落库为 10。
//! 计数器只增不减, 负增量在边界即被拒绝。

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 单日计数器增量; 缺省字段即零增量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressDelta {
    pub words_studied: i64,
    pub new_words: i64,
    pub review_words: i64,
    pub time_spent_minutes: i64,
    pub sessions_completed: i64,
    pub correct_answers: i64,
    pub total_answers: i64,
}

/// 负增量 (边界校验错误)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegativeDelta {
    pub field: &'static str,
    pub value: i64,
}

impl fmt::Display for NegativeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "counter delta must be non-negative: {} = {}", self.field, self.value)
    }
}

impl std::error::Error for NegativeDelta {}

impl ProgressDelta {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 所有字段均须非负
    pub fn validate(&self) -> Result<(), NegativeDelta> {
        for (field, value) in self.fields() {
            if value < 0 {
                return Err(NegativeDelta { field, value });
            }
        }
        Ok(())
    }

    fn fields(&self) -> [(&'static str, i64); 7] {
        [
            ("wordsStudied", self.words_studied),
            ("newWords", self.new_words),
            ("reviewWords", self.review_words),
            ("timeSpentMinutes", self.time_spent_minutes),
            ("sessionsCompleted", self.sessions_completed),
            ("correctAnswers", self.correct_answers),
            ("totalAnswers", self.total_answers),
        ]
    }
}

/// 单日累计计数器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressCounters {
    pub words_studied: i64,
    pub new_words: i64,
    pub review_words: i64,
    pub time_spent_minutes: i64,
    pub sessions_completed: i64,
    pub correct_answers: i64,
    pub total_answers: i64,
}

impl ProgressCounters {
    /// 增量合并
    pub fn apply(&mut self, delta: &ProgressDelta) {
        self.words_studied += delta.words_studied;
        self.new_words += delta.new_words;
        self.review_words += delta.review_words;
        self.time_spent_minutes += delta.time_spent_minutes;
        self.sessions_completed += delta.sessions_completed;
        self.correct_answers += delta.correct_answers;
        self.total_answers += delta.total_answers;
    }

    /// 当日正确率; 无作答时为 0
    pub fn accuracy(&self) -> f64 {
        if self.total_answers > 0 {
            self.correct_answers as f64 / self.total_answers as f64
        } else {
            0.0
        }
    }
}

/// UTC 零点归一化: 时间戳 -> 日历日
///
/// 全部日期比较都先经过这里, 避免本地时区和 UTC 混用。
pub fn normalize_to_day(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}
