//! 存储抽象层
//!
//! 引擎核心把持久化视作外部协作方: 这里只定义记录形状与 [`LearningStore`]
//! 接口, 以及两个实现 —— 生产用的 Postgres 存储与测试用的内存存储。
//! 并发约束见各方法注释: 增量更新必须在存储层原子完成, 丢失更新不可接受。

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use danci_srs::types::SchedulingState;
use danci_srs::{ProgressCounters, ProgressDelta};

/// 调度状态行, (userId, wordId) 唯一
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingRow {
    pub id: String,
    pub user_id: String,
    pub word_id: String,
    pub easiness_factor: f64,
    pub interval_days: i64,
    pub repetitions: i64,
    pub last_review_date: Option<NaiveDate>,
    pub next_review_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SchedulingRow {
    pub fn state(&self) -> SchedulingState {
        SchedulingState {
            easiness_factor: self.easiness_factor,
            interval: self.interval_days,
            repetitions: self.repetitions,
        }
    }
}

/// 用户连续学习状态行, userId 唯一, 首次访问时以全零默认值创建
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakRow {
    pub user_id: String,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_study_date: Option<NaiveDate>,
    pub freezes_remaining: i64,
    /// 上次消耗冻结令牌的时刻
    pub last_freeze_consumed_at: Option<DateTime<Utc>>,
    /// 上次月度补充的时刻; 与消耗时刻分开存, 两种行为互不干扰
    pub last_monthly_reset_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl StreakRow {
    pub fn empty(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            current_streak: 0,
            longest_streak: 0,
            last_study_date: None,
            freezes_remaining: 0,
            last_freeze_consumed_at: None,
            last_monthly_reset_at: None,
            updated_at: now,
        }
    }
}

/// 每日进度行, (userId, date) 唯一
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgressRow {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counters: ProgressCounters,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation error: {0}")]
    Validation(String),
    /// 并发写冲突; 调用方可重试
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error("db mutation failed: {0}")]
    Mutation(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// 学习引擎的持久化接口
///
/// 排序约束由调用方承担: 同一单词的复习必须按提交顺序串行应用,
/// 同一用户的打卡更新亦然。进度增量则由实现方保证原子性。
#[async_trait]
pub trait LearningStore: Send + Sync {
    async fn get_scheduling_row(
        &self,
        user_id: &str,
        word_id: &str,
    ) -> Result<Option<SchedulingRow>, StoreError>;

    async fn upsert_scheduling_row(&self, row: &SchedulingRow) -> Result<(), StoreError>;

    async fn list_scheduling_rows(&self, user_id: &str) -> Result<Vec<SchedulingRow>, StoreError>;

    /// nextReviewDate <= due_on 的行, 升序, 无日期的排最前
    async fn list_due_scheduling_rows(
        &self,
        user_id: &str,
        due_on: NaiveDate,
        limit: i64,
    ) -> Result<Vec<SchedulingRow>, StoreError>;

    async fn get_streak_row(&self, user_id: &str) -> Result<Option<StreakRow>, StoreError>;

    async fn put_streak_row(&self, row: &StreakRow) -> Result<(), StoreError>;

    async fn get_daily_progress(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyProgressRow>, StoreError>;

    /// 原子的 "存在则累加, 不存在则创建" 更新; 返回更新后的整行。
    /// 零增量等价于 get-or-create。
    async fn increment_daily_progress(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: &ProgressDelta,
    ) -> Result<DailyProgressRow, StoreError>;

    /// 按日期降序
    async fn list_daily_progress(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<DailyProgressRow>, StoreError>;

    /// [start, end] 双端含端点, 升序
    async fn range_daily_progress(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyProgressRow>, StoreError>;
}
