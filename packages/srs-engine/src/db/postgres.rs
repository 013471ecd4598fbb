//! Postgres 存储实现
//!
//! 进度增量依赖 `ON CONFLICT ... DO UPDATE SET x = x + EXCLUDED.x` 在
//! 数据库侧原子完成; 朴素的读-改-写在并发学习会话下会丢失更新。
//! 序列化失败 (SQLSTATE 40001) 映射为可重试的 [`StoreError::Conflict`]。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use danci_srs::{ProgressCounters, ProgressDelta};

use crate::config::EngineConfig;
use crate::db::{DailyProgressRow, LearningStore, SchedulingRow, StoreError, StreakRow};

#[derive(Clone)]
pub struct PgLearningStore {
    pool: PgPool,
}

impl PgLearningStore {
    pub async fn connect(config: &EngineConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(map_sql_err)?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS "_migrations" (
                "id" SERIAL PRIMARY KEY,
                "name" TEXT NOT NULL UNIQUE,
                "applied_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sql_err)?;

        let applied: Vec<String> =
            sqlx::query_scalar(r#"SELECT "name" FROM "_migrations" ORDER BY "id""#)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sql_err)?;

        let migrations = [(
            "001_init_schema",
            include_str!("../../sql/001_init_schema.sql"),
        )];

        for (name, sql) in migrations {
            if applied.iter().any(|m| m == name) {
                tracing::debug!(migration = name, "already applied, skipping");
                continue;
            }

            tracing::info!(migration = name, "applying migration");
            sqlx::raw_sql(sql)
                .execute(&self.pool)
                .await
                .map_err(map_sql_err)?;
            sqlx::query(r#"INSERT INTO "_migrations" ("name") VALUES ($1)"#)
                .bind(name)
                .execute(&self.pool)
                .await
                .map_err(map_sql_err)?;
        }

        Ok(())
    }
}

#[async_trait]
impl LearningStore for PgLearningStore {
    async fn get_scheduling_row(
        &self,
        user_id: &str,
        word_id: &str,
    ) -> Result<Option<SchedulingRow>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
              "id","userId","wordId","easinessFactor","intervalDays","repetitions",
              "lastReviewDate","nextReviewDate","createdAt","updatedAt"
            FROM "word_scheduling_states"
            WHERE "userId" = $1
              AND "wordId" = $2
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(word_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sql_err)?;
        Ok(row.map(|row| map_scheduling_row(&row)))
    }

    async fn upsert_scheduling_row(&self, row: &SchedulingRow) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "word_scheduling_states" (
                "id","userId","wordId","easinessFactor","intervalDays","repetitions",
                "lastReviewDate","nextReviewDate","createdAt","updatedAt"
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
            ON CONFLICT ("userId","wordId") DO UPDATE SET
                "easinessFactor" = EXCLUDED."easinessFactor",
                "intervalDays" = EXCLUDED."intervalDays",
                "repetitions" = EXCLUDED."repetitions",
                "lastReviewDate" = EXCLUDED."lastReviewDate",
                "nextReviewDate" = EXCLUDED."nextReviewDate",
                "updatedAt" = EXCLUDED."updatedAt"
            "#,
        )
        .bind(&row.id)
        .bind(&row.user_id)
        .bind(&row.word_id)
        .bind(row.easiness_factor)
        .bind(row.interval_days)
        .bind(row.repetitions)
        .bind(row.last_review_date)
        .bind(row.next_review_date)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sql_err)?;
        Ok(())
    }

    async fn list_scheduling_rows(&self, user_id: &str) -> Result<Vec<SchedulingRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
              "id","userId","wordId","easinessFactor","intervalDays","repetitions",
              "lastReviewDate","nextReviewDate","createdAt","updatedAt"
            FROM "word_scheduling_states"
            WHERE "userId" = $1
            ORDER BY "updatedAt" DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sql_err)?;
        Ok(rows.iter().map(map_scheduling_row).collect())
    }

    async fn list_due_scheduling_rows(
        &self,
        user_id: &str,
        due_on: NaiveDate,
        limit: i64,
    ) -> Result<Vec<SchedulingRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
              "id","userId","wordId","easinessFactor","intervalDays","repetitions",
              "lastReviewDate","nextReviewDate","createdAt","updatedAt"
            FROM "word_scheduling_states"
            WHERE "userId" = $1
              AND ("nextReviewDate" IS NULL OR "nextReviewDate" <= $2)
            ORDER BY "nextReviewDate" ASC NULLS FIRST
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(due_on)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sql_err)?;
        Ok(rows.iter().map(map_scheduling_row).collect())
    }

    async fn get_streak_row(&self, user_id: &str) -> Result<Option<StreakRow>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
              "userId","currentStreak","longestStreak","lastStudyDate",
              "freezesRemaining","lastFreezeConsumedAt","lastMonthlyResetAt","updatedAt"
            FROM "user_streaks"
            WHERE "userId" = $1
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sql_err)?;
        Ok(row.map(|row| map_streak_row(&row)))
    }

    async fn put_streak_row(&self, row: &StreakRow) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "user_streaks" (
                "userId","currentStreak","longestStreak","lastStudyDate",
                "freezesRemaining","lastFreezeConsumedAt","lastMonthlyResetAt","updatedAt"
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            ON CONFLICT ("userId") DO UPDATE SET
                "currentStreak" = EXCLUDED."currentStreak",
                "longestStreak" = EXCLUDED."longestStreak",
                "lastStudyDate" = EXCLUDED."lastStudyDate",
                "freezesRemaining" = EXCLUDED."freezesRemaining",
                "lastFreezeConsumedAt" = EXCLUDED."lastFreezeConsumedAt",
                "lastMonthlyResetAt" = EXCLUDED."lastMonthlyResetAt",
                "updatedAt" = EXCLUDED."updatedAt"
            "#,
        )
        .bind(&row.user_id)
        .bind(row.current_streak)
        .bind(row.longest_streak)
        .bind(row.last_study_date)
        .bind(row.freezes_remaining)
        .bind(row.last_freeze_consumed_at)
        .bind(row.last_monthly_reset_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sql_err)?;
        Ok(())
    }

    async fn get_daily_progress(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyProgressRow>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
              "id","userId","date","wordsStudied","newWords","reviewWords",
              "timeSpentMinutes","sessionsCompleted","correctAnswers","totalAnswers","updatedAt"
            FROM "daily_progress_logs"
            WHERE "userId" = $1
              AND "date" = $2
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sql_err)?;
        Ok(row.map(|row| map_progress_row(&row)))
    }

    async fn increment_daily_progress(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: &ProgressDelta,
    ) -> Result<DailyProgressRow, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO "daily_progress_logs" (
                "id","userId","date","wordsStudied","newWords","reviewWords",
                "timeSpentMinutes","sessionsCompleted","correctAnswers","totalAnswers","updatedAt"
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
            ON CONFLICT ("userId","date") DO UPDATE SET
                "wordsStudied" = "daily_progress_logs"."wordsStudied" + EXCLUDED."wordsStudied",
                "newWords" = "daily_progress_logs"."newWords" + EXCLUDED."newWords",
                "reviewWords" = "daily_progress_logs"."reviewWords" + EXCLUDED."reviewWords",
                "timeSpentMinutes" = "daily_progress_logs"."timeSpentMinutes" + EXCLUDED."timeSpentMinutes",
                "sessionsCompleted" = "daily_progress_logs"."sessionsCompleted" + EXCLUDED."sessionsCompleted",
                "correctAnswers" = "daily_progress_logs"."correctAnswers" + EXCLUDED."correctAnswers",
                "totalAnswers" = "daily_progress_logs"."totalAnswers" + EXCLUDED."totalAnswers",
                "updatedAt" = EXCLUDED."updatedAt"
            RETURNING
              "id","userId","date","wordsStudied","newWords","reviewWords",
              "timeSpentMinutes","sessionsCompleted","correctAnswers","totalAnswers","updatedAt"
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(date)
        .bind(delta.words_studied)
        .bind(delta.new_words)
        .bind(delta.review_words)
        .bind(delta.time_spent_minutes)
        .bind(delta.sessions_completed)
        .bind(delta.correct_answers)
        .bind(delta.total_answers)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sql_err)?;
        Ok(map_progress_row(&row))
    }

    async fn list_daily_progress(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<DailyProgressRow>, StoreError> {
        let mut qb = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            r#"
            SELECT
              "id","userId","date","wordsStudied","newWords","reviewWords",
              "timeSpentMinutes","sessionsCompleted","correctAnswers","totalAnswers","updatedAt"
            FROM "daily_progress_logs"
            WHERE "userId" =
            "#,
        );
        qb.push_bind(user_id);
        qb.push(r#" ORDER BY "date" DESC"#);
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        let rows = qb.build().fetch_all(&self.pool).await.map_err(map_sql_err)?;
        Ok(rows.iter().map(map_progress_row).collect())
    }

    async fn range_daily_progress(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyProgressRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
              "id","userId","date","wordsStudied","newWords","reviewWords",
              "timeSpentMinutes","sessionsCompleted","correctAnswers","totalAnswers","updatedAt"
            FROM "daily_progress_logs"
            WHERE "userId" = $1
              AND "date" >= $2
              AND "date" <= $3
            ORDER BY "date" ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sql_err)?;
        Ok(rows.iter().map(map_progress_row).collect())
    }
}

fn map_sql_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        // serialization_failure: 并发事务冲突, 调用方重试
        if db.code().as_deref() == Some("40001") {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Sql(err)
}

fn map_scheduling_row(row: &PgRow) -> SchedulingRow {
    let created_at: DateTime<Utc> = row.try_get("createdAt").unwrap_or_else(|_| Utc::now());
    let updated_at: DateTime<Utc> = row.try_get("updatedAt").unwrap_or_else(|_| Utc::now());
    SchedulingRow {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        word_id: row.try_get("wordId").unwrap_or_default(),
        easiness_factor: row.try_get("easinessFactor").unwrap_or(2.5),
        interval_days: row.try_get("intervalDays").unwrap_or(0),
        repetitions: row.try_get("repetitions").unwrap_or(0),
        last_review_date: row.try_get("lastReviewDate").ok(),
        next_review_date: row.try_get("nextReviewDate").ok(),
        created_at,
        updated_at,
    }
}

fn map_streak_row(row: &PgRow) -> StreakRow {
    StreakRow {
        user_id: row.try_get("userId").unwrap_or_default(),
        current_streak: row.try_get("currentStreak").unwrap_or(0),
        longest_streak: row.try_get("longestStreak").unwrap_or(0),
        last_study_date: row.try_get("lastStudyDate").ok(),
        freezes_remaining: row.try_get("freezesRemaining").unwrap_or(0),
        last_freeze_consumed_at: row.try_get("lastFreezeConsumedAt").ok(),
        last_monthly_reset_at: row.try_get("lastMonthlyResetAt").ok(),
        updated_at: row.try_get("updatedAt").unwrap_or_else(|_| Utc::now()),
    }
}

fn map_progress_row(row: &PgRow) -> DailyProgressRow {
    DailyProgressRow {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        date: row
            .try_get("date")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        counters: ProgressCounters {
            words_studied: row.try_get("wordsStudied").unwrap_or(0),
            new_words: row.try_get("newWords").unwrap_or(0),
            review_words: row.try_get("reviewWords").unwrap_or(0),
            time_spent_minutes: row.try_get("timeSpentMinutes").unwrap_or(0),
            sessions_completed: row.try_get("sessionsCompleted").unwrap_or(0),
            correct_answers: row.try_get("correctAnswers").unwrap_or(0),
            total_answers: row.try_get("totalAnswers").unwrap_or(0),
        },
        updated_at: row.try_get("updatedAt").unwrap_or_else(|_| Utc::now()),
    }
}
