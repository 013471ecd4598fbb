//! 复习调度服务
//!
//! 复习提交方先在边界把原始评分换成 [`QualityRating`], 再调用
//! [`apply_review`]。同一单词的复习必须按提交顺序串行应用 (按条目加锁
//! 或对存储行做乐观重试), 乱序应用会破坏 repetitions / interval。

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use danci_srs::types::SchedulingState;
use danci_srs::{classify, compute_next_schedule, DifficultyRating, MasteryLevel, QualityRating};

use crate::db::{LearningStore, SchedulingRow, StoreError};

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 边界校验: 原始整数 -> 质量评分
pub fn parse_quality(raw: i64) -> Result<QualityRating, SchedulingError> {
    QualityRating::try_from(raw)
        .map_err(|err| SchedulingError::Validation(err.to_string()))
}

/// 边界校验: 三键难度反馈 -> 质量评分
pub fn parse_difficulty(raw: &str) -> Result<QualityRating, SchedulingError> {
    DifficultyRating::from_str(raw)
        .map(DifficultyRating::to_quality)
        .ok_or_else(|| SchedulingError::Validation(format!("无效的难度反馈: {raw}")))
}

/// 一次复习的落库结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedReview {
    pub user_id: String,
    pub word_id: String,
    pub easiness_factor: f64,
    pub interval_days: i64,
    pub repetitions: i64,
    pub next_review_date: NaiveDate,
    pub was_successful: bool,
    pub mastery_level: MasteryLevel,
}

/// 应用一次复习: 读取或默认当前状态, 执行 SM-2, 回写状态与下次复习日期
pub async fn apply_review<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
    word_id: &str,
    quality: QualityRating,
    now: DateTime<Utc>,
) -> Result<AppliedReview, SchedulingError> {
    validate_id(user_id, "用户ID不能为空")?;
    validate_id(word_id, "单词ID不能为空")?;

    let today = now.date_naive();
    let existing = store.get_scheduling_row(user_id, word_id).await?;
    let current = existing
        .as_ref()
        .map(SchedulingRow::state)
        .unwrap_or_default();

    let outcome = compute_next_schedule(&current, quality, today);

    let row = SchedulingRow {
        id: existing
            .as_ref()
            .map(|r| r.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        user_id: user_id.to_string(),
        word_id: word_id.to_string(),
        easiness_factor: outcome.next.easiness_factor,
        interval_days: outcome.next.interval,
        repetitions: outcome.next.repetitions,
        last_review_date: Some(today),
        next_review_date: Some(outcome.next_review_date),
        created_at: existing.as_ref().map(|r| r.created_at).unwrap_or(now),
        updated_at: now,
    };
    store.upsert_scheduling_row(&row).await?;

    tracing::debug!(
        user_id,
        word_id,
        quality = quality.as_i64(),
        interval = outcome.next.interval,
        repetitions = outcome.next.repetitions,
        "review applied"
    );

    Ok(AppliedReview {
        user_id: row.user_id,
        word_id: row.word_id,
        easiness_factor: outcome.next.easiness_factor,
        interval_days: outcome.next.interval,
        repetitions: outcome.next.repetitions,
        next_review_date: outcome.next_review_date,
        was_successful: outcome.was_successful,
        mastery_level: classify(Some(&outcome.next)),
    })
}

/// 读路径: 缺失状态即 NEW, 不是错误
pub async fn get_mastery<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
    word_id: &str,
) -> Result<MasteryLevel, SchedulingError> {
    let row = store.get_scheduling_row(user_id, word_id).await?;
    let state = row.as_ref().map(SchedulingRow::state);
    Ok(classify(state.as_ref()))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryLevelCount {
    pub level: MasteryLevel,
    pub count: i64,
}

/// 用户全部条目的掌握度分布; 五个等级都会出现, 计数可以为零
pub async fn mastery_distribution<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<Vec<MasteryLevelCount>, SchedulingError> {
    let rows = store.list_scheduling_rows(user_id).await?;

    let mut counts = [0i64; 5];
    for row in &rows {
        let state = row.state();
        counts[classify(Some(&state)).to_index()] += 1;
    }

    Ok(MasteryLevel::ALL
        .iter()
        .map(|level| MasteryLevelCount {
            level: *level,
            count: counts[level.to_index()],
        })
        .collect())
}

/// 到期复习列表: nextReviewDate <= 今天
pub async fn list_due_words<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<SchedulingRow>, SchedulingError> {
    validate_id(user_id, "用户ID不能为空")?;
    let due_on = now.date_naive();
    Ok(store
        .list_due_scheduling_rows(user_id, due_on, limit.clamp(1, 500))
        .await?)
}

/// 重置进度: 回到全默认调度状态, 复习日期清空
pub async fn reset_schedule<S: LearningStore + ?Sized>(
    store: &S,
    user_id: &str,
    word_id: &str,
    now: DateTime<Utc>,
) -> Result<SchedulingRow, SchedulingError> {
    validate_id(user_id, "用户ID不能为空")?;
    validate_id(word_id, "单词ID不能为空")?;

    let existing = store.get_scheduling_row(user_id, word_id).await?;
    let defaults = SchedulingState::default();
    let row = SchedulingRow {
        id: existing
            .as_ref()
            .map(|r| r.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        user_id: user_id.to_string(),
        word_id: word_id.to_string(),
        easiness_factor: defaults.easiness_factor,
        interval_days: defaults.interval,
        repetitions: defaults.repetitions,
        last_review_date: None,
        next_review_date: None,
        created_at: existing.as_ref().map(|r| r.created_at).unwrap_or(now),
        updated_at: now,
    };
    store.upsert_scheduling_row(&row).await?;
    Ok(row)
}

fn validate_id(value: &str, message: &str) -> Result<(), SchedulingError> {
    if value.trim().is_empty() {
        return Err(SchedulingError::Validation(message.to_string()));
    }
    Ok(())
}
