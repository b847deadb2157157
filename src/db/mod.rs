//! Database Module
//!
//! # Interview Q&A
//!
//! Q: 왜 PostgreSQL을 선택했는가?
//! A: 진행(progression) 엔진에 적합한 이유
//!
//!    1. ACID 트랜잭션: 포인트 원장 무결성 보장
//!    2. JSONB 지원: 보상/요구사항 같은 폴리모픽 페이로드 저장
//!    3. 부분 유니크 인덱스: "열린 챌린지 인스턴스 1개" 같은 불변식을 DB가 강제
//!    4. 조건부 UPDATE + RETURNING: 완료 전환의 중복 지급 방지
//!    5. 생태계: SQLx, Diesel 등 Rust 라이브러리 지원
//!
//! Q: SQLx를 선택한 이유는?
//! A: async 네이티브 + 마이그레이션 내장
//!
//!    - `query_as::<_, T>`로 행을 모델 구조체에 타입 매핑
//!    - 런타임 쿼리 사용: 빌드 시 DATABASE_URL 불필요 (CI 단순화)
//!    - 커넥션 풀(PgPool) 내장
//!
//! Q: 잔액을 컬럼에 저장하지 않는 이유는?
//! A: 원장이 단일 진실 공급원
//!    - 잔액 = SUM(earned + adjusted - spent - expired) 파생값
//!    - 저장된 잔액과 원장의 불일치(drift) 원천 차단
//!    - 조회 비용은 user_id 인덱스로 해결

pub mod models;
pub mod repository;

#[cfg(test)]
pub mod memory;

pub use models::*;
pub use repository::{GamificationRepository, NewPointsTransaction};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

/// 데이터베이스 연결 및 쿼리 담당
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10 (트래픽에 따라 조정)
    /// - min_connections: 1 (idle 시 최소 유지)
    /// - acquire_timeout: 3초 (커넥션 획득 대기)
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// 마이그레이션 실행
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl GamificationRepository for Database {
    // ============ Activity Log ============

    async fn insert_activity_event(
        &self,
        user_id: Uuid,
        action: &str,
        target_id: Option<&str>,
        metadata: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<ActivityEvent> {
        let event = sqlx::query_as::<_, ActivityEvent>(
            r#"
            INSERT INTO activity_events (user_id, action, target_id, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, action, target_id, metadata, created_at
            "#,
        )
        .bind(user_id)
        .bind(action)
        .bind(target_id)
        .bind(metadata)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    async fn count_activities(&self, user_id: Uuid, action: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM activity_events WHERE user_id = $1 AND action = $2",
        )
        .bind(user_id)
        .bind(action)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn recent_activities(&self, user_id: Uuid, limit: i64) -> Result<Vec<ActivityEvent>> {
        let events = sqlx::query_as::<_, ActivityEvent>(
            r#"
            SELECT id, user_id, action, target_id, metadata, created_at
            FROM activity_events
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    // ============ Achievements ============

    async fn list_achievements(&self, include_hidden: bool) -> Result<Vec<Achievement>> {
        let achievements = sqlx::query_as::<_, Achievement>(
            r#"
            SELECT id, name, description, badge_icon, trigger_type, trigger_value,
                   points, is_active, is_hidden, created_at
            FROM achievements
            WHERE is_active = true AND ($1 OR is_hidden = false)
            ORDER BY trigger_value ASC
            "#,
        )
        .bind(include_hidden)
        .fetch_all(&self.pool)
        .await?;

        Ok(achievements)
    }

    async fn achievements_by_trigger(&self, trigger_type: &str) -> Result<Vec<Achievement>> {
        let achievements = sqlx::query_as::<_, Achievement>(
            r#"
            SELECT id, name, description, badge_icon, trigger_type, trigger_value,
                   points, is_active, is_hidden, created_at
            FROM achievements
            WHERE is_active = true AND trigger_type = $1
            ORDER BY trigger_value ASC
            "#,
        )
        .bind(trigger_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(achievements)
    }

    async fn get_achievement(&self, id: Uuid) -> Result<Option<Achievement>> {
        let achievement = sqlx::query_as::<_, Achievement>(
            r#"
            SELECT id, name, description, badge_icon, trigger_type, trigger_value,
                   points, is_active, is_hidden, created_at
            FROM achievements
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(achievement)
    }

    async fn list_user_achievements(&self, user_id: Uuid) -> Result<Vec<UserAchievement>> {
        let rows = sqlx::query_as::<_, UserAchievement>(
            r#"
            SELECT id, user_id, achievement_id, earned_at
            FROM user_achievements
            WHERE user_id = $1
            ORDER BY earned_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// 업적 부여 (이미 보유 시 None)
    async fn insert_user_achievement(
        &self,
        user_id: Uuid,
        achievement_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<UserAchievement>> {
        let row = sqlx::query_as::<_, UserAchievement>(
            r#"
            INSERT INTO user_achievements (user_id, achievement_id, earned_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, achievement_id) DO NOTHING
            RETURNING id, user_id, achievement_id, earned_at
            "#,
        )
        .bind(user_id)
        .bind(achievement_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ============ Challenges ============

    async fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>> {
        let challenge = sqlx::query_as::<_, Challenge>(
            r#"
            SELECT id, title, description, category, requirements, rewards,
                   is_repeatable, cooldown_days, is_active, created_at
            FROM challenges
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(challenge)
    }

    async fn get_challenges_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Challenge>> {
        let challenges = sqlx::query_as::<_, Challenge>(
            r#"
            SELECT id, title, description, category, requirements, rewards,
                   is_repeatable, cooldown_days, is_active, created_at
            FROM challenges
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(challenges)
    }

    async fn list_active_challenges(&self) -> Result<Vec<Challenge>> {
        let challenges = sqlx::query_as::<_, Challenge>(
            r#"
            SELECT id, title, description, category, requirements, rewards,
                   is_repeatable, cooldown_days, is_active, created_at
            FROM challenges
            WHERE is_active = true
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(challenges)
    }

    async fn find_open_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<UserChallenge>> {
        let row = sqlx::query_as::<_, UserChallenge>(
            r#"
            SELECT id, user_id, challenge_id, progress, is_completed,
                   joined_at, last_progress_at, completed_at
            FROM user_challenges
            WHERE user_id = $1 AND challenge_id = $2 AND is_completed = false
            "#,
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_latest_completed_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<UserChallenge>> {
        let row = sqlx::query_as::<_, UserChallenge>(
            r#"
            SELECT id, user_id, challenge_id, progress, is_completed,
                   joined_at, last_progress_at, completed_at
            FROM user_challenges
            WHERE user_id = $1 AND challenge_id = $2 AND is_completed = true
            ORDER BY completed_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_open_user_challenges(&self, user_id: Uuid) -> Result<Vec<UserChallenge>> {
        let rows = sqlx::query_as::<_, UserChallenge>(
            r#"
            SELECT id, user_id, challenge_id, progress, is_completed,
                   joined_at, last_progress_at, completed_at
            FROM user_challenges
            WHERE user_id = $1 AND is_completed = false
            ORDER BY joined_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_user_challenges(&self, user_id: Uuid) -> Result<Vec<UserChallenge>> {
        let rows = sqlx::query_as::<_, UserChallenge>(
            r#"
            SELECT id, user_id, challenge_id, progress, is_completed,
                   joined_at, last_progress_at, completed_at
            FROM user_challenges
            WHERE user_id = $1
            ORDER BY joined_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// 참여 인스턴스 생성
    ///
    /// 부분 유니크 인덱스(열린 인스턴스 1개)와 ON CONFLICT로 동시 join을 멱등 처리
    async fn insert_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<UserChallenge> {
        let inserted = sqlx::query_as::<_, UserChallenge>(
            r#"
            INSERT INTO user_challenges (user_id, challenge_id, progress, is_completed, joined_at)
            VALUES ($1, $2, 0, false, $3)
            ON CONFLICT (user_id, challenge_id) WHERE (is_completed = false) DO NOTHING
            RETURNING id, user_id, challenge_id, progress, is_completed,
                      joined_at, last_progress_at, completed_at
            "#,
        )
        .bind(user_id)
        .bind(challenge_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(row),
            // 경합에서 진 쪽은 이미 존재하는 열린 인스턴스를 돌려줌
            None => self
                .find_open_user_challenge(user_id, challenge_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("open user challenge vanished after conflict")),
        }
    }

    async fn insert_challenge_activity(
        &self,
        user_challenge_id: Uuid,
        requirement_type: &str,
        action: &str,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<ChallengeActivity> {
        let row = sqlx::query_as::<_, ChallengeActivity>(
            r#"
            INSERT INTO challenge_activities (user_challenge_id, requirement_type, action, delta, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_challenge_id, requirement_type, action, delta, created_at
            "#,
        )
        .bind(user_challenge_id)
        .bind(requirement_type)
        .bind(action)
        .bind(delta)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_challenge_activities(
        &self,
        user_challenge_id: Uuid,
    ) -> Result<Vec<ChallengeActivity>> {
        let rows = sqlx::query_as::<_, ChallengeActivity>(
            r#"
            SELECT id, user_challenge_id, requirement_type, action, delta, created_at
            FROM challenge_activities
            WHERE user_challenge_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_challenge_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn update_challenge_progress(
        &self,
        user_challenge_id: Uuid,
        progress: i32,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE user_challenges
            SET progress = $2, last_progress_at = $3
            WHERE id = $1
            "#,
        )
        .bind(user_challenge_id)
        .bind(progress)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 조건부 완료 전환 (미완료 행만)
    async fn complete_user_challenge(
        &self,
        user_challenge_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_challenges
            SET is_completed = true, progress = 100, completed_at = $2
            WHERE id = $1 AND is_completed = false
            "#,
        )
        .bind(user_challenge_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============ Daily Tasks ============

    async fn list_active_daily_tasks(&self) -> Result<Vec<DailyTask>> {
        let tasks = sqlx::query_as::<_, DailyTask>(
            r#"
            SELECT id, title, description, action, target_count, points, is_active, created_at
            FROM daily_tasks
            WHERE is_active = true
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    async fn get_daily_task(&self, id: Uuid) -> Result<Option<DailyTask>> {
        let task = sqlx::query_as::<_, DailyTask>(
            r#"
            SELECT id, title, description, action, target_count, points, is_active, created_at
            FROM daily_tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn ensure_user_daily_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        date: NaiveDate,
    ) -> Result<UserDailyTask> {
        let inserted = sqlx::query_as::<_, UserDailyTask>(
            r#"
            INSERT INTO user_daily_tasks (user_id, task_id, task_date, progress_count, is_completed)
            VALUES ($1, $2, $3, 0, false)
            ON CONFLICT (user_id, task_id, task_date) DO NOTHING
            RETURNING id, user_id, task_id, task_date, progress_count, is_completed, completed_at
            "#,
        )
        .bind(user_id)
        .bind(task_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(row),
            None => {
                let existing = sqlx::query_as::<_, UserDailyTask>(
                    r#"
                    SELECT id, user_id, task_id, task_date, progress_count, is_completed, completed_at
                    FROM user_daily_tasks
                    WHERE user_id = $1 AND task_id = $2 AND task_date = $3
                    "#,
                )
                .bind(user_id)
                .bind(task_id)
                .bind(date)
                .fetch_one(&self.pool)
                .await?;
                Ok(existing)
            }
        }
    }

    async fn list_user_daily_tasks(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<UserDailyTask>> {
        let rows = sqlx::query_as::<_, UserDailyTask>(
            r#"
            SELECT id, user_id, task_id, task_date, progress_count, is_completed, completed_at
            FROM user_daily_tasks
            WHERE user_id = $1 AND task_date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// 목표 미만에서만 증가 (목표 도달 후 추가 활동은 no-op)
    async fn increment_daily_task(
        &self,
        id: Uuid,
        target_count: i64,
    ) -> Result<Option<UserDailyTask>> {
        let row = sqlx::query_as::<_, UserDailyTask>(
            r#"
            UPDATE user_daily_tasks
            SET progress_count = progress_count + 1
            WHERE id = $1 AND is_completed = false AND progress_count < $2
            RETURNING id, user_id, task_id, task_date, progress_count, is_completed, completed_at
            "#,
        )
        .bind(id)
        .bind(target_count)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn complete_user_daily_task(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_daily_tasks
            SET is_completed = true, completed_at = $2
            WHERE id = $1 AND is_completed = false
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============ Streaks ============

    async fn find_streak(&self, user_id: Uuid, streak_type: &str) -> Result<Option<UserStreak>> {
        let row = sqlx::query_as::<_, UserStreak>(
            r#"
            SELECT id, user_id, streak_type, current_count, longest_count,
                   last_activity_date, updated_at
            FROM user_streaks
            WHERE user_id = $1 AND streak_type = $2
            "#,
        )
        .bind(user_id)
        .bind(streak_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_user_streaks(&self, user_id: Uuid) -> Result<Vec<UserStreak>> {
        let rows = sqlx::query_as::<_, UserStreak>(
            r#"
            SELECT id, user_id, streak_type, current_count, longest_count,
                   last_activity_date, updated_at
            FROM user_streaks
            WHERE user_id = $1
            ORDER BY streak_type ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_streak(
        &self,
        user_id: Uuid,
        streak_type: &str,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<UserStreak> {
        let inserted = sqlx::query_as::<_, UserStreak>(
            r#"
            INSERT INTO user_streaks (user_id, streak_type, current_count, longest_count, last_activity_date, updated_at)
            VALUES ($1, $2, 1, 1, $3, $4)
            ON CONFLICT (user_id, streak_type) DO NOTHING
            RETURNING id, user_id, streak_type, current_count, longest_count,
                      last_activity_date, updated_at
            "#,
        )
        .bind(user_id)
        .bind(streak_type)
        .bind(date)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(row),
            None => self
                .find_streak(user_id, streak_type)
                .await?
                .ok_or_else(|| anyhow::anyhow!("streak vanished after conflict")),
        }
    }

    /// 관찰한 last_activity_date와 일치할 때만 갱신 (동시 집계 방지)
    async fn touch_streak(
        &self,
        id: Uuid,
        observed_date: Option<NaiveDate>,
        current: i64,
        longest: i64,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_streaks
            SET current_count = $3, longest_count = $4, last_activity_date = $5, updated_at = $6
            WHERE id = $1 AND last_activity_date IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(id)
        .bind(observed_date)
        .bind(current)
        .bind(longest)
        .bind(date)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============ Levels ============

    async fn list_level_definitions(&self) -> Result<Vec<LevelDefinition>> {
        let levels = sqlx::query_as::<_, LevelDefinition>(
            r#"
            SELECT level, name, points_required, rewards
            FROM level_definitions
            ORDER BY level ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(levels)
    }

    async fn get_user_level(&self, user_id: Uuid) -> Result<Option<UserLevel>> {
        let row = sqlx::query_as::<_, UserLevel>(
            r#"
            SELECT user_id, current_level, current_points, points_to_next_level,
                   progress_percentage, level_unlocked_at, updated_at
            FROM user_levels
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn init_user_level(&self, state: &UserLevel) -> Result<UserLevel> {
        let inserted = sqlx::query_as::<_, UserLevel>(
            r#"
            INSERT INTO user_levels (user_id, current_level, current_points, points_to_next_level,
                                     progress_percentage, level_unlocked_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING user_id, current_level, current_points, points_to_next_level,
                      progress_percentage, level_unlocked_at, updated_at
            "#,
        )
        .bind(state.user_id)
        .bind(state.current_level)
        .bind(state.current_points)
        .bind(state.points_to_next_level)
        .bind(state.progress_percentage)
        .bind(state.level_unlocked_at)
        .bind(state.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(row),
            None => self
                .get_user_level(state.user_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("user level vanished after conflict")),
        }
    }

    async fn update_user_level_progress(
        &self,
        user_id: Uuid,
        current_points: i64,
        points_to_next_level: i64,
        progress_percentage: i32,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE user_levels
            SET current_points = $2, points_to_next_level = $3,
                progress_percentage = $4, updated_at = $5
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(current_points)
        .bind(points_to_next_level)
        .bind(progress_percentage)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 저장된 레벨이 관찰값과 같을 때만 전진 (한 번에 한 레벨)
    async fn advance_user_level(
        &self,
        user_id: Uuid,
        from_level: i32,
        to_level: i32,
        current_points: i64,
        points_to_next_level: i64,
        progress_percentage: i32,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_levels
            SET current_level = $3, current_points = $4, points_to_next_level = $5,
                progress_percentage = $6, level_unlocked_at = $7, updated_at = $7
            WHERE user_id = $1 AND current_level = $2
            "#,
        )
        .bind(user_id)
        .bind(from_level)
        .bind(to_level)
        .bind(current_points)
        .bind(points_to_next_level)
        .bind(progress_percentage)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn lifetime_earned_points(&self, user_id: Uuid) -> Result<i64> {
        let sum: (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT
            FROM points_transactions
            WHERE user_id = $1
              AND status = 'completed'
              AND transaction_type IN ('earned', 'adjusted')
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.0)
    }

    // ============ Points Ledger ============

    async fn insert_points_transaction(
        &self,
        tx: &NewPointsTransaction,
    ) -> Result<PointsTransaction> {
        let row = sqlx::query_as::<_, PointsTransaction>(
            r#"
            INSERT INTO points_transactions
                (user_id, amount, transaction_type, status, source, source_id,
                 description, created_at, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, amount, transaction_type, status, source, source_id,
                      description, created_at, processed_at
            "#,
        )
        .bind(tx.user_id)
        .bind(tx.amount)
        .bind(&tx.transaction_type)
        .bind(&tx.status)
        .bind(&tx.source)
        .bind(&tx.source_id)
        .bind(&tx.description)
        .bind(tx.created_at)
        .bind(tx.processed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// 원장 롤업 (FILTER 집계 한 번으로 전체 합산)
    async fn points_summary(&self, user_id: Uuid) -> Result<PointsBalance> {
        let sums: (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'earned'   AND status = 'completed'), 0)::BIGINT,
                COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'spent'    AND status = 'completed'), 0)::BIGINT,
                COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'expired'  AND status = 'completed'), 0)::BIGINT,
                COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'adjusted' AND status = 'completed'), 0)::BIGINT,
                COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'earned'   AND status = 'pending'), 0)::BIGINT
            FROM points_transactions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let (total_earned, total_spent, total_expired, total_adjusted, pending_points) = sums;

        Ok(PointsBalance {
            total_earned,
            total_spent,
            total_expired,
            total_adjusted,
            current_balance: total_earned + total_adjusted - total_spent - total_expired,
            pending_points,
        })
    }

    async fn list_points_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PointsTransaction>, i64)> {
        let rows = sqlx::query_as::<_, PointsTransaction>(
            r#"
            SELECT id, user_id, amount, transaction_type, status, source, source_id,
                   description, created_at, processed_at
            FROM points_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM points_transactions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((rows, count.0))
    }

    async fn get_points_config(&self) -> Result<Option<PointsConfig>> {
        let config = sqlx::query_as::<_, PointsConfig>(
            r#"
            SELECT welcome_points, referral_points, verification_points, daily_login_points,
                   booking_completion_points, review_points, profile_completion_points,
                   min_points_for_redemption, points_expiration_days
            FROM points_config
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    // ============ Redeemable Rewards ============

    async fn list_reward_items(&self) -> Result<Vec<RewardItem>> {
        let items = sqlx::query_as::<_, RewardItem>(
            r#"
            SELECT id, name, description, points_cost, is_active, created_at
            FROM reward_items
            WHERE is_active = true
            ORDER BY points_cost ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn get_reward_item(&self, id: Uuid) -> Result<Option<RewardItem>> {
        let item = sqlx::query_as::<_, RewardItem>(
            r#"
            SELECT id, name, description, points_cost, is_active, created_at
            FROM reward_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn insert_redemption(
        &self,
        user_id: Uuid,
        reward_id: Uuid,
        points_spent: i64,
        at: DateTime<Utc>,
    ) -> Result<Redemption> {
        let row = sqlx::query_as::<_, Redemption>(
            r#"
            INSERT INTO redemptions (user_id, reward_id, points_spent, redeemed_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, reward_id, points_spent, redeemed_at
            "#,
        )
        .bind(user_id)
        .bind(reward_id)
        .bind(points_spent)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_user_redemptions(&self, user_id: Uuid) -> Result<Vec<Redemption>> {
        let rows = sqlx::query_as::<_, Redemption>(
            r#"
            SELECT id, user_id, reward_id, points_spent, redeemed_at
            FROM redemptions
            WHERE user_id = $1
            ORDER BY redeemed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============ Reward Grants ============

    async fn insert_user_title(
        &self,
        user_id: Uuid,
        title: &str,
        source: &str,
        at: DateTime<Utc>,
    ) -> Result<UserTitle> {
        let row = sqlx::query_as::<_, UserTitle>(
            r#"
            INSERT INTO user_titles (user_id, title, source, is_active, earned_at)
            VALUES ($1, $2, $3, false, $4)
            RETURNING id, user_id, title, source, is_active, earned_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(source)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_user_titles(&self, user_id: Uuid) -> Result<Vec<UserTitle>> {
        let rows = sqlx::query_as::<_, UserTitle>(
            r#"
            SELECT id, user_id, title, source, is_active, earned_at
            FROM user_titles
            WHERE user_id = $1
            ORDER BY earned_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn deactivate_user_titles(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE user_titles SET is_active = false WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn activate_user_title(&self, user_id: Uuid, title_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE user_titles SET is_active = true WHERE id = $1 AND user_id = $2",
        )
        .bind(title_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_user_feature(
        &self,
        user_id: Uuid,
        feature_key: &str,
        metadata: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<UserFeature> {
        let row = sqlx::query_as::<_, UserFeature>(
            r#"
            INSERT INTO user_features (user_id, feature_key, metadata, granted_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, feature_key, metadata, granted_at
            "#,
        )
        .bind(user_id)
        .bind(feature_key)
        .bind(metadata)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_user_features(&self, user_id: Uuid) -> Result<Vec<UserFeature>> {
        let rows = sqlx::query_as::<_, UserFeature>(
            r#"
            SELECT id, user_id, feature_key, metadata, granted_at
            FROM user_features
            WHERE user_id = $1
            ORDER BY granted_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_user_discount(
        &self,
        user_id: Uuid,
        percentage: i32,
        code: &str,
        expires_at: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<UserDiscount> {
        let row = sqlx::query_as::<_, UserDiscount>(
            r#"
            INSERT INTO user_discounts (user_id, percentage, code, expires_at, is_used, created_at)
            VALUES ($1, $2, $3, $4, false, $5)
            RETURNING id, user_id, percentage, code, expires_at, is_used, created_at
            "#,
        )
        .bind(user_id)
        .bind(percentage)
        .bind(code)
        .bind(expires_at)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_user_discounts(&self, user_id: Uuid) -> Result<Vec<UserDiscount>> {
        let rows = sqlx::query_as::<_, UserDiscount>(
            r#"
            SELECT id, user_id, percentage, code, expires_at, is_used, created_at
            FROM user_discounts
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============ Events ============

    async fn list_active_events(&self, now: DateTime<Utc>) -> Result<Vec<GameEvent>> {
        let events = sqlx::query_as::<_, GameEvent>(
            r#"
            SELECT id, title, description, start_date, end_date, challenge_ids,
                   rewards, is_active, created_at
            FROM game_events
            WHERE is_active = true AND start_date <= $1 AND end_date >= $1
            ORDER BY end_date ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn list_upcoming_events(&self, now: DateTime<Utc>) -> Result<Vec<GameEvent>> {
        let events = sqlx::query_as::<_, GameEvent>(
            r#"
            SELECT id, title, description, start_date, end_date, challenge_ids,
                   rewards, is_active, created_at
            FROM game_events
            WHERE is_active = true AND start_date > $1
            ORDER BY start_date ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<GameEvent>> {
        let event = sqlx::query_as::<_, GameEvent>(
            r#"
            SELECT id, title, description, start_date, end_date, challenge_ids,
                   rewards, is_active, created_at
            FROM game_events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn find_event_participation(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<EventParticipation>> {
        let row = sqlx::query_as::<_, EventParticipation>(
            r#"
            SELECT id, user_id, event_id, points_earned, challenges_completed,
                   rewards_claimed, joined_at
            FROM event_participations
            WHERE user_id = $1 AND event_id = $2
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_user_participations(&self, user_id: Uuid) -> Result<Vec<EventParticipation>> {
        let rows = sqlx::query_as::<_, EventParticipation>(
            r#"
            SELECT id, user_id, event_id, points_earned, challenges_completed,
                   rewards_claimed, joined_at
            FROM event_participations
            WHERE user_id = $1
            ORDER BY joined_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_event_participation(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<EventParticipation> {
        let inserted = sqlx::query_as::<_, EventParticipation>(
            r#"
            INSERT INTO event_participations
                (user_id, event_id, points_earned, challenges_completed, rewards_claimed, joined_at)
            VALUES ($1, $2, 0, 0, false, $3)
            ON CONFLICT (user_id, event_id) DO NOTHING
            RETURNING id, user_id, event_id, points_earned, challenges_completed,
                      rewards_claimed, joined_at
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(row),
            None => self
                .find_event_participation(user_id, event_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("event participation vanished after conflict")),
        }
    }

    async fn add_event_progress(
        &self,
        participation_id: Uuid,
        points_delta: i64,
        challenges_delta: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE event_participations
            SET points_earned = points_earned + $2,
                challenges_completed = challenges_completed + $3
            WHERE id = $1
            "#,
        )
        .bind(participation_id)
        .bind(points_delta)
        .bind(challenges_delta)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 조건부 보상 수령 (미수령 행만 전환)
    async fn claim_event_rewards(&self, participation_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE event_participations
            SET rewards_claimed = true
            WHERE id = $1 AND rewards_claimed = false
            "#,
        )
        .bind(participation_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============ Leaderboards ============

    async fn list_leaderboards(&self) -> Result<Vec<Leaderboard>> {
        let boards = sqlx::query_as::<_, Leaderboard>(
            r#"
            SELECT id, name, leaderboard_type, period, category, start_date, end_date,
                   is_active, created_at
            FROM leaderboards
            WHERE is_active = true
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(boards)
    }

    async fn get_leaderboard(&self, id: Uuid) -> Result<Option<Leaderboard>> {
        let board = sqlx::query_as::<_, Leaderboard>(
            r#"
            SELECT id, name, leaderboard_type, period, category, start_date, end_date,
                   is_active, created_at
            FROM leaderboards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(board)
    }

    /// NULL 가드 바인딩으로 옵션 필터를 단일 정적 쿼리로 처리 (SQL 조립 없음)
    async fn points_scores(
        &self,
        category: Option<&str>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScoreRow>> {
        let rows = sqlx::query_as::<_, ScoreRow>(
            r#"
            SELECT user_id, COALESCE(SUM(amount), 0)::BIGINT AS score
            FROM points_transactions
            WHERE status = 'completed'
              AND transaction_type IN ('earned', 'adjusted')
              AND ($1::text IS NULL OR source = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at <= $3)
            GROUP BY user_id
            ORDER BY score DESC, user_id ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(category)
        .bind(since)
        .bind(until)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn achievement_scores(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScoreRow>> {
        let rows = sqlx::query_as::<_, ScoreRow>(
            r#"
            SELECT user_id, COUNT(*) AS score
            FROM user_achievements
            WHERE ($1::timestamptz IS NULL OR earned_at >= $1)
              AND ($2::timestamptz IS NULL OR earned_at <= $2)
            GROUP BY user_id
            ORDER BY score DESC, user_id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(since)
        .bind(until)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn challenge_scores(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScoreRow>> {
        let rows = sqlx::query_as::<_, ScoreRow>(
            r#"
            SELECT user_id, COUNT(*) AS score
            FROM user_challenges
            WHERE is_completed = true
              AND ($1::timestamptz IS NULL OR completed_at >= $1)
              AND ($2::timestamptz IS NULL OR completed_at <= $2)
            GROUP BY user_id
            ORDER BY score DESC, user_id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(since)
        .bind(until)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
