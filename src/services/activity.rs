//! Activity Dispatcher Service
//!
//! 진행 엔진의 단일 진입점. 활동 이벤트를 감사 로그에 먼저 남기고,
//! 다섯 트래커(업적 → 챌린지 → 일일 과제 → 스트릭 → 레벨)에 고정 순서로 전파.
//!
//! 트래커 하나의 실패는 경고 로그 후 다음 트래커로 넘어감 —
//! false는 오직 이벤트 로그 기록 실패일 때만.
//!
//! # Interview Q&A
//!
//! **Q: 왜 팬아웃을 트랜잭션 하나로 묶지 않았는가?**
//! A: 트래커마다 쓰는 테이블이 다르고 실패 허용 정책도 다르다. 로그는
//!    진실의 원천이고 보상은 최선 노력(best-effort)이므로, 부분 적용을
//!    허용하고 각 단계의 중복 지급만 저장소의 조건부 쓰기로 막는다.
//!    "완료 표시됐지만 보상 유실"은 로그로 복구 가능한 불일치로 받아들인다.
//!
//! **Q: 업적 트리거 값은 어디서 오는가?**
//! A: 호출자는 원시 액션만 보내므로 디스패처가 유도한다. 1회성 액션은 1,
//!    횟수형 액션은 활동 로그 누적 횟수(방금 기록한 이벤트 포함), 로그인은
//!    저장된 로그인 스트릭 카운트. metadata의 "count" 필드가 있으면 그 값이
//!    우선한다 (백필/마이그레이션 경로).

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::GamificationRepository;
use crate::error::ApiError;
use crate::types::ActionName;

use super::achievements::AchievementTracker;
use super::challenges::ChallengeTracker;
use super::daily_tasks::DailyTaskTracker;
use super::events::EventService;
use super::levels::LevelTracker;
use super::streaks::StreakTracker;

/// 활동 디스패처
pub struct ActivityDispatcher {
    repo: Arc<dyn GamificationRepository>,
    achievements: Arc<AchievementTracker>,
    challenges: Arc<ChallengeTracker>,
    daily_tasks: Arc<DailyTaskTracker>,
    streaks: Arc<StreakTracker>,
    levels: Arc<LevelTracker>,
    events: Arc<EventService>,
    clock: Arc<dyn Clock>,
}

impl ActivityDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn GamificationRepository>,
        achievements: Arc<AchievementTracker>,
        challenges: Arc<ChallengeTracker>,
        daily_tasks: Arc<DailyTaskTracker>,
        streaks: Arc<StreakTracker>,
        levels: Arc<LevelTracker>,
        events: Arc<EventService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            achievements,
            challenges,
            daily_tasks,
            streaks,
            levels,
            events,
            clock,
        }
    }

    /// 활동 1건 기록 + 전 트래커 팬아웃
    ///
    /// 반환값은 이벤트 로그 기록 성공 여부. 트래커 실패는 반환값에
    /// 영향을 주지 않음
    pub async fn record_activity(
        &self,
        user_id: Uuid,
        action: &ActionName,
        target_id: Option<&str>,
        metadata: Value,
    ) -> bool {
        let action = action.as_str();

        // 1. 감사 로그 — 유일한 false 경로
        if let Err(e) = self
            .repo
            .insert_activity_event(user_id, action, target_id, metadata.clone(), self.clock.now())
            .await
        {
            tracing::error!(
                user_id = %user_id,
                action = %action,
                error = %e,
                "Failed to persist activity event"
            );
            return false;
        }

        // 2. 업적
        if let Err(e) = self.check_achievements(user_id, action, &metadata).await {
            tracing::warn!(
                user_id = %user_id,
                action = %action,
                error = %e,
                "Achievement check failed"
            );
        }

        // 3. 챌린지 — 완료분은 이벤트 집계로 전달
        match self
            .challenges
            .on_activity(user_id, action, target_id, &metadata)
            .await
        {
            Ok(completions) => {
                for completion in &completions {
                    if let Err(e) = self.events.on_challenge_completed(user_id, completion).await
                    {
                        tracing::warn!(
                            user_id = %user_id,
                            challenge = %completion.challenge.title,
                            error = %e,
                            "Event aggregation failed"
                        );
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    action = %action,
                    error = %e,
                    "Challenge progress update failed"
                );
            }
        }

        // 4. 일일 과제 — 오늘 슬레이트 제공 후 진행
        if let Err(e) = self.run_daily_tasks(user_id, action).await {
            tracing::warn!(
                user_id = %user_id,
                action = %action,
                error = %e,
                "Daily task update failed"
            );
        }

        // 5. 스트릭
        if let Err(e) = self.streaks.record_activity(user_id, action).await {
            tracing::warn!(
                user_id = %user_id,
                action = %action,
                error = %e,
                "Streak update failed"
            );
        }

        // 6. 레벨
        if let Err(e) = self.levels.check_progress(user_id).await {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Level check failed"
            );
        }

        // 7. 팬아웃으로 적립이 늘었을 수 있으므로 생애 포인트 업적을 마지막에 점검
        if let Err(e) = self.check_points_earned(user_id).await {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Points-earned achievement check failed"
            );
        }

        true
    }

    async fn run_daily_tasks(&self, user_id: Uuid, action: &str) -> Result<(), ApiError> {
        self.daily_tasks.ensure_todays_tasks(user_id).await?;
        self.daily_tasks.on_activity(user_id, action).await?;
        Ok(())
    }

    async fn check_achievements(
        &self,
        user_id: Uuid,
        action: &str,
        metadata: &Value,
    ) -> Result<(), ApiError> {
        let Some(trigger) = achievement_trigger(action) else {
            return Ok(());
        };

        let value = match metadata.get("count").and_then(Value::as_i64) {
            Some(explicit) => explicit,
            None => self.derive_trigger_value(user_id, action, trigger).await?,
        };

        self.achievements
            .check_and_award(user_id, trigger, value)
            .await?;
        Ok(())
    }

    async fn derive_trigger_value(
        &self,
        user_id: Uuid,
        action: &str,
        trigger: &str,
    ) -> Result<i64, ApiError> {
        let value = match trigger {
            // 이번 로그인의 스트릭 갱신은 뒤 단계에서 일어나므로
            // 여기서 읽는 값은 갱신 전 카운트
            "login_streak" => self
                .repo
                .find_streak(user_id, "login")
                .await?
                .map(|s| s.current_count)
                .unwrap_or(0),
            "booking_count" | "review_count" | "referral_count" | "forum_posts" => {
                self.repo.count_activities(user_id, action).await?
            }
            _ => 1,
        };
        Ok(value)
    }

    async fn check_points_earned(&self, user_id: Uuid) -> Result<(), ApiError> {
        let lifetime = self.repo.lifetime_earned_points(user_id).await?;
        if lifetime > 0 {
            self.achievements
                .check_and_award(user_id, "points_earned", lifetime)
                .await?;
        }
        Ok(())
    }
}

/// 액션 → 업적 트리거 종류
fn achievement_trigger(action: &str) -> Option<&'static str> {
    match action {
        "signup" => Some("signup"),
        "profile_completed" => Some("profile_completion"),
        "verification_completed" => Some("verification"),
        "booking_completed" => Some("booking_count"),
        "review_submitted" => Some("review_count"),
        "referral_completed" => Some("referral_count"),
        "forum_post_created" => Some("forum_posts"),
        "login" => Some("login_streak"),
        _ => None,
    }
}
