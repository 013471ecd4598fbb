//! 每日进度服务
//!
//! 所有写入都走存储层的原子增量 (`increment_daily_progress`):
//! 同一 (user, date) 的并发 update 不会互相覆盖。零增量即 get-or-create。

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use danci_srs::{normalize_to_day, ProgressDelta};

use crate::db::{DailyProgressRow, LearningStore, StoreError};

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 幂等读取: 已有则原样返回, 没有则创建全零记录
pub async fn get_or_create<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
    at: DateTime<Utc>,
) -> Result<DailyProgressRow, ProgressError> {
    validate_user(user_id)?;
    let day = normalize_to_day(at);

    if let Some(row) = store.get_daily_progress(user_id, day).await? {
        return Ok(row);
    }
    Ok(store
        .increment_daily_progress(user_id, day, &ProgressDelta::default())
        .await?)
}

/// 增量更新; 缺省字段是零增量, 永不覆盖既有计数
pub async fn update<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
    at: DateTime<Utc>,
    delta: ProgressDelta,
) -> Result<DailyProgressRow, ProgressError> {
    validate_user(user_id)?;
    delta
        .validate()
        .map_err(|err| ProgressError::Validation(err.to_string()))?;

    let day = normalize_to_day(at);
    let row = store.increment_daily_progress(user_id, day, &delta).await?;

    tracing::debug!(
        user_id,
        date = %day,
        words = row.counters.words_studied,
        "daily progress updated"
    );
    Ok(row)
}

/// 按日期降序的历史记录
pub async fn get_logs<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
    limit: Option<i64>,
) -> Result<Vec<DailyProgressRow>, ProgressError> {
    validate_user(user_id)?;
    if let Some(limit) = limit {
        if limit <= 0 {
            return Err(ProgressError::Validation(
                "limit 必须是正整数".to_string(),
            ));
        }
    }
    Ok(store.list_daily_progress(user_id, limit).await?)
}

/// [start, end] 双端含端点; 比较前归一化到日历日
pub async fn get_range<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyProgressRow>, ProgressError> {
    validate_user(user_id)?;
    if start > end {
        return Err(ProgressError::Validation(
            "开始日期不能晚于结束日期".to_string(),
        ));
    }
    Ok(store.range_daily_progress(user_id, start, end).await?)
}

fn validate_user(user_id: &str) -> Result<(), ProgressError> {
    if user_id.trim().is_empty() {
        return Err(ProgressError::Validation("用户ID不能为空".to_string()));
    }
    Ok(())
}
