//! 内存存储实现
//!
//! 单元/集成测试用; 锁粒度与生产存储的原子性语义保持一致:
//! `increment_daily_progress` 在写锁内完成读-改-写, 不会丢失并发增量。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use danci_srs::ProgressDelta;

use crate::db::{
    DailyProgressRow, LearningStore, SchedulingRow, StoreError, StreakRow,
};

#[derive(Default)]
pub struct MemoryStore {
    scheduling: RwLock<HashMap<(String, String), SchedulingRow>>,
    streaks: RwLock<HashMap<String, StreakRow>>,
    progress: RwLock<HashMap<(String, NaiveDate), DailyProgressRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LearningStore for MemoryStore {
    async fn get_scheduling_row(
        &self,
        user_id: &str,
        word_id: &str,
    ) -> Result<Option<SchedulingRow>, StoreError> {
        let map = self.scheduling.read();
        Ok(map.get(&(user_id.to_string(), word_id.to_string())).cloned())
    }

    async fn upsert_scheduling_row(&self, row: &SchedulingRow) -> Result<(), StoreError> {
        let mut map = self.scheduling.write();
        map.insert((row.user_id.clone(), row.word_id.clone()), row.clone());
        Ok(())
    }

    async fn list_scheduling_rows(&self, user_id: &str) -> Result<Vec<SchedulingRow>, StoreError> {
        let map = self.scheduling.read();
        let mut rows: Vec<SchedulingRow> = map
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.word_id.cmp(&b.word_id));
        Ok(rows)
    }

    async fn list_due_scheduling_rows(
        &self,
        user_id: &str,
        due_on: NaiveDate,
        limit: i64,
    ) -> Result<Vec<SchedulingRow>, StoreError> {
        let map = self.scheduling.read();
        let mut rows: Vec<SchedulingRow> = map
            .values()
            .filter(|row| row.user_id == user_id)
            .filter(|row| match row.next_review_date {
                Some(date) => date <= due_on,
                None => true,
            })
            .cloned()
            .collect();
        // 无日期的排最前, 与 NULLS FIRST 对齐
        rows.sort_by(|a, b| match (a.next_review_date, b.next_review_date) {
            (None, None) => a.word_id.cmp(&b.word_id),
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.word_id.cmp(&b.word_id)),
        });
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn get_streak_row(&self, user_id: &str) -> Result<Option<StreakRow>, StoreError> {
        let map = self.streaks.read();
        Ok(map.get(user_id).cloned())
    }

    async fn put_streak_row(&self, row: &StreakRow) -> Result<(), StoreError> {
        let mut map = self.streaks.write();
        map.insert(row.user_id.clone(), row.clone());
        Ok(())
    }

    async fn get_daily_progress(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyProgressRow>, StoreError> {
        let map = self.progress.read();
        Ok(map.get(&(user_id.to_string(), date)).cloned())
    }

    async fn increment_daily_progress(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: &ProgressDelta,
    ) -> Result<DailyProgressRow, StoreError> {
        let mut map = self.progress.write();
        let now = Utc::now();
        let row = map
            .entry((user_id.to_string(), date))
            .or_insert_with(|| DailyProgressRow {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                date,
                counters: Default::default(),
                updated_at: now,
            });
        row.counters.apply(delta);
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn list_daily_progress(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<DailyProgressRow>, StoreError> {
        let map = self.progress.read();
        let mut rows: Vec<DailyProgressRow> = map
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn range_daily_progress(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyProgressRow>, StoreError> {
        let map = self.progress.read();
        let mut rows: Vec<DailyProgressRow> = map
            .values()
            .filter(|row| row.user_id == user_id)
            .filter(|row| row.date >= start && row.date <= end)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(rows)
    }
}
