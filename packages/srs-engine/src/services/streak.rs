//! 连续学习打卡服务
//!
//! 纯状态机在 danci-srs 的 streak 模块; 这里负责读写 `StreakRow`,
//! 并在 `freeze_used` 时扣减令牌余额。同一用户的打卡更新需要由调用方
//! 串行化, 两个并发的 "今日首次学习" 会在 freezesRemaining 上竞争。

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use danci_srs::{calculate_streak, monthly_reset_due, replenished_freezes};

use crate::db::{LearningStore, StoreError, StreakRow};

#[derive(Debug, Error)]
pub enum StreakError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 一次打卡的结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyStreakUpdate {
    #[serde(flatten)]
    pub streak: StreakRow,
    pub freeze_used: bool,
}

/// 当日学习事件: 读取或创建打卡状态, 跑纯状态机, 回写
pub async fn update_on_study<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<StudyStreakUpdate, StreakError> {
    validate_user(user_id)?;

    let today = now.date_naive();
    let mut row = store
        .get_streak_row(user_id)
        .await?
        .unwrap_or_else(|| StreakRow::empty(user_id, now));

    let outcome = calculate_streak(
        row.last_study_date,
        today,
        row.current_streak,
        row.longest_streak,
        row.freezes_remaining,
    );

    row.current_streak = outcome.current_streak;
    row.longest_streak = outcome.longest_streak;
    row.last_study_date = Some(outcome.last_study_date);
    if outcome.freeze_used {
        // 状态机只报告用了冻结; 扣减余额和记录时刻是这里的责任
        row.freezes_remaining -= 1;
        row.last_freeze_consumed_at = Some(now);
        tracing::debug!(
            user_id,
            remaining = row.freezes_remaining,
            "streak freeze consumed"
        );
    }
    row.updated_at = now;

    store.put_streak_row(&row).await?;

    Ok(StudyStreakUpdate {
        streak: row,
        freeze_used: outcome.freeze_used,
    })
}

/// 月度冻结补充; 同一个日历月内重复调用是无操作
pub async fn reset_monthly_freezes<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<StreakRow, StreakError> {
    validate_user(user_id)?;

    let today = now.date_naive();
    let mut row = store
        .get_streak_row(user_id)
        .await?
        .unwrap_or_else(|| StreakRow::empty(user_id, now));

    let last_reset = row.last_monthly_reset_at.map(|ts| ts.date_naive());
    if !monthly_reset_due(last_reset, today) {
        return Ok(row);
    }

    row.freezes_remaining = replenished_freezes(row.freezes_remaining);
    row.last_monthly_reset_at = Some(now);
    row.updated_at = now;
    store.put_streak_row(&row).await?;

    tracing::debug!(
        user_id,
        freezes = row.freezes_remaining,
        "monthly freezes replenished"
    );
    Ok(row)
}

/// 读路径: 首次访问即创建全零状态并落库
pub async fn get_streak<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<StreakRow, StreakError> {
    validate_user(user_id)?;

    if let Some(row) = store.get_streak_row(user_id).await? {
        return Ok(row);
    }

    let row = StreakRow::empty(user_id, now);
    store.put_streak_row(&row).await?;
    Ok(row)
}

fn validate_user(user_id: &str) -> Result<(), StreakError> {
    if user_id.trim().is_empty() {
        return Err(StreakError::Validation("用户ID不能为空".to_string()));
    }
    Ok(())
}
