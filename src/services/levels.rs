//! Level Tracker Service
//!
//! 생애 적립 포인트(earned + adjusted) 기준의 누적 레벨.
//! 진행률은 다음 레벨 임계값 대비 누적 포인트 비율.
//!
//! 한 번의 체크는 최대 한 레벨만 올림 — 임계값을 한꺼번에 여러 개 넘어도
//! 활동이 이어지는 한 다음 체크들이 순서대로 따라잡고, 레벨별 보상도
//! 단계마다 정확히 1회씩 지급됨

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{GamificationRepository, LevelDefinition, UserLevel};
use crate::error::ApiError;
use crate::types::ProgressPercent;

use super::rewards::{RewardContext, RewardDispatcher};

/// 레벨 트래커
pub struct LevelTracker {
    repo: Arc<dyn GamificationRepository>,
    rewards: Arc<RewardDispatcher>,
    clock: Arc<dyn Clock>,
}

impl LevelTracker {
    pub fn new(
        repo: Arc<dyn GamificationRepository>,
        rewards: Arc<RewardDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            rewards,
            clock,
        }
    }

    /// 현재 레벨 상태 조회. 첫 조회면 레벨 1로 생성
    pub async fn user_level(&self, user_id: Uuid) -> Result<UserLevel, ApiError> {
        let definitions = self.repo.list_level_definitions().await?;
        self.load_or_init(user_id, &definitions).await
    }

    pub async fn definitions(&self) -> Result<Vec<LevelDefinition>, ApiError> {
        Ok(self.repo.list_level_definitions().await?)
    }

    /// 생애 포인트를 다시 합산해 진행률을 갱신하고, 임계값에 도달했으면
    /// 정확히 한 레벨 올림
    pub async fn check_progress(&self, user_id: Uuid) -> Result<UserLevel, ApiError> {
        let definitions = self.repo.list_level_definitions().await?;
        let state = self.load_or_init(user_id, &definitions).await?;
        let lifetime = self.repo.lifetime_earned_points(user_id).await?;
        let now = self.clock.now();

        let next = definitions
            .iter()
            .find(|d| d.level == state.current_level + 1);

        match next {
            // 임계값 도달: 한 레벨만 전진
            Some(next_def) if lifetime >= next_def.points_required => {
                let to_level = next_def.level;
                let following = definitions.iter().find(|d| d.level == to_level + 1);
                let required = following
                    .map(|d| d.points_required)
                    .unwrap_or(next_def.points_required);
                let progress = ProgressPercent::from_parts(lifetime, required);

                let advanced = self
                    .repo
                    .advance_user_level(
                        user_id,
                        state.current_level,
                        to_level,
                        lifetime,
                        required,
                        progress.value(),
                        now,
                    )
                    .await?;

                // 조건부 전진에 이긴 호출만 레벨 보상을 지급
                if advanced {
                    let ctx = RewardContext::new(
                        "level_up",
                        Some(to_level.to_string()),
                        format!("Reached Level {}: {}", to_level, next_def.name),
                    );
                    let applied = self
                        .rewards
                        .dispatch_all(user_id, &next_def.rewards, &ctx)
                        .await;

                    tracing::info!(
                        user_id = %user_id,
                        level = to_level,
                        name = %next_def.name,
                        rewards_applied = applied,
                        "User leveled up"
                    );
                }
            }

            // 임계값 미달: 진행률만 갱신
            Some(next_def) => {
                let progress = ProgressPercent::from_parts(lifetime, next_def.points_required);
                self.repo
                    .update_user_level_progress(
                        user_id,
                        lifetime,
                        next_def.points_required,
                        progress.value(),
                        now,
                    )
                    .await?;
            }

            // 최고 레벨: 필요치는 자기 임계값으로 고정, 진행률은 100에서 캡
            None => {
                let required = definitions
                    .iter()
                    .find(|d| d.level == state.current_level)
                    .map(|d| d.points_required)
                    .unwrap_or(0);
                let progress = ProgressPercent::from_parts(lifetime, required);
                self.repo
                    .update_user_level_progress(user_id, lifetime, required, progress.value(), now)
                    .await?;
            }
        }

        self.repo
            .get_user_level(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User level".to_string()))
    }

    async fn load_or_init(
        &self,
        user_id: Uuid,
        definitions: &[LevelDefinition],
    ) -> Result<UserLevel, ApiError> {
        if let Some(existing) = self.repo.get_user_level(user_id).await? {
            return Ok(existing);
        }

        let Some(first) = definitions.first() else {
            tracing::error!("Level catalog is empty, cannot initialize user level");
            return Err(ApiError::InternalError);
        };
        let next_required = definitions
            .get(1)
            .map(|d| d.points_required)
            .unwrap_or(first.points_required);

        let now = self.clock.now();
        let state = UserLevel {
            user_id,
            current_level: first.level,
            current_points: 0,
            points_to_next_level: next_required,
            progress_percentage: 0,
            level_unlocked_at: Some(now),
            updated_at: now,
        };
        // 경합 시 저장소가 기존 행을 돌려줌
        Ok(self.repo.init_user_level(&state).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::fixed::FixedClock;
    use crate::db::memory::MemoryRepository;
    use crate::db::{NewPointsTransaction, Reward};
    use crate::services::points::PointsLedger;

    fn setup() -> (
        Arc<MemoryRepository>,
        Arc<PointsLedger>,
        LevelTracker,
    ) {
        let repo = Arc::new(MemoryRepository::new());
        let clock = Arc::new(FixedClock::at_str("2024-06-01T09:00:00Z"));
        let points = Arc::new(PointsLedger::new(repo.clone(), clock.clone()));
        let rewards = Arc::new(RewardDispatcher::new(
            repo.clone(),
            points.clone(),
            clock.clone(),
        ));
        let tracker = LevelTracker::new(repo.clone(), rewards, clock);
        (repo, points, tracker)
    }

    fn seed_three_levels(repo: &MemoryRepository) {
        repo.seed_level(1, "Newcomer", 0, vec![]);
        repo.seed_level(2, "Explorer", 500, vec![]);
        repo.seed_level(3, "Adventurer", 1500, vec![]);
    }

    #[tokio::test]
    async fn test_first_read_initializes_level_one() {
        let (repo, _points, tracker) = setup();
        seed_three_levels(&repo);
        let user = Uuid::new_v4();

        let state = tracker.user_level(user).await.unwrap();
        assert_eq!(state.current_level, 1);
        assert_eq!(state.current_points, 0);
        assert_eq!(state.points_to_next_level, 500);
        assert_eq!(state.progress_percentage, 0);
    }

    #[tokio::test]
    async fn test_progress_updates_below_threshold() {
        let (repo, points, tracker) = setup();
        seed_three_levels(&repo);
        let user = Uuid::new_v4();

        points
            .credit(user, 250, "Welcome bonus", "welcome", None)
            .await
            .unwrap();

        let state = tracker.check_progress(user).await.unwrap();
        assert_eq!(state.current_level, 1);
        assert_eq!(state.current_points, 250);
        assert_eq!(state.progress_percentage, 50);
    }

    #[tokio::test]
    async fn test_advances_exactly_one_level_per_check() {
        let (repo, points, tracker) = setup();
        seed_three_levels(&repo);
        let user = Uuid::new_v4();

        // 레벨 3 임계값(1500)도 넘는 적립이 한 번에 들어옴
        points
            .credit(user, 1600, "Bulk adjustment", "referral", None)
            .await
            .unwrap();

        let state = tracker.check_progress(user).await.unwrap();
        assert_eq!(state.current_level, 2);

        let state = tracker.check_progress(user).await.unwrap();
        assert_eq!(state.current_level, 3);
    }

    #[tokio::test]
    async fn test_level_rewards_dispatch_once() {
        let (repo, points, tracker) = setup();
        repo.seed_level(1, "Newcomer", 0, vec![]);
        repo.seed_level(
            2,
            "Explorer",
            500,
            vec![Reward::Title {
                name: "Rising Star".to_string(),
            }],
        );
        let user = Uuid::new_v4();

        points
            .credit(user, 500, "Welcome bonus", "welcome", None)
            .await
            .unwrap();

        tracker.check_progress(user).await.unwrap();
        tracker.check_progress(user).await.unwrap();

        let titles = repo.list_user_titles(user).await.unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].title, "Rising Star");
        assert_eq!(titles[0].source, "level_up");
    }

    #[tokio::test]
    async fn test_top_level_pins_requirement_and_caps_progress() {
        let (repo, points, tracker) = setup();
        repo.seed_level(1, "Newcomer", 0, vec![]);
        repo.seed_level(2, "Explorer", 500, vec![]);
        let user = Uuid::new_v4();

        points
            .credit(user, 800, "Welcome bonus", "welcome", None)
            .await
            .unwrap();

        let state = tracker.check_progress(user).await.unwrap();
        assert_eq!(state.current_level, 2);
        assert_eq!(state.points_to_next_level, 500);
        assert_eq!(state.progress_percentage, 100);

        // 최고 레벨에서 추가 체크는 상태를 유지
        let state = tracker.check_progress(user).await.unwrap();
        assert_eq!(state.current_level, 2);
        assert_eq!(state.progress_percentage, 100);
    }

    #[tokio::test]
    async fn test_adjusted_transactions_count_toward_lifetime() {
        let (repo, points, tracker) = setup();
        seed_three_levels(&repo);
        let user = Uuid::new_v4();

        points
            .credit(user, 400, "Welcome bonus", "welcome", None)
            .await
            .unwrap();
        repo.insert_points_transaction(&NewPointsTransaction {
            user_id: user,
            amount: 100,
            transaction_type: "adjusted".to_string(),
            status: "completed".to_string(),
            source: "support_adjustment".to_string(),
            source_id: None,
            description: "Support credit".to_string(),
            created_at: chrono::Utc::now(),
            processed_at: Some(chrono::Utc::now()),
        })
        .await
        .unwrap();

        let state = tracker.check_progress(user).await.unwrap();
        assert_eq!(state.current_level, 2);
        assert_eq!(state.current_points, 500);
    }
}
