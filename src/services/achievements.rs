//! Achievement Tracker Service
//!
//! 임계값 기반 업적: 트리거 종류(예약 수, 리뷰 수, 로그인 스트릭 등)의 현재 값이
//! 카탈로그의 trigger_value에 도달하면 1회 부여.
//!
//! 중복 방지는 저장소의 (user, achievement) 유니크 제약에 위임 —
//! insert가 None을 돌려주면 이미 보유한 것이므로 보상도 지급하지 않음

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{Achievement, GamificationRepository, UserAchievement};
use crate::error::ApiError;
use crate::types::ProgressPercent;

use super::points::PointsLedger;

/// 사용자 업적 통계
#[derive(Debug, Serialize)]
pub struct AchievementStats {
    pub total: i64,
    pub earned: i64,
    pub points_earned: i64,
    pub completion_percentage: i32,
}

/// 업적 트래커
pub struct AchievementTracker {
    repo: Arc<dyn GamificationRepository>,
    points: Arc<PointsLedger>,
    clock: Arc<dyn Clock>,
}

impl AchievementTracker {
    pub fn new(
        repo: Arc<dyn GamificationRepository>,
        points: Arc<PointsLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            points,
            clock,
        }
    }

    /// 트리거 값 기준으로 도달한 업적을 전부 부여
    ///
    /// 값이 여러 임계값을 한 번에 넘으면 (예: 예약 1회 → 10회 업적이 함께 조회될 때)
    /// 도달한 모든 단계가 각각 부여됨
    pub async fn check_and_award(
        &self,
        user_id: Uuid,
        trigger_type: &str,
        value: i64,
    ) -> Result<Vec<UserAchievement>, ApiError> {
        let candidates = self.repo.achievements_by_trigger(trigger_type).await?;
        let now = self.clock.now();

        let mut awarded = Vec::new();
        for achievement in candidates.iter().filter(|a| a.trigger_value <= value) {
            let granted = self
                .repo
                .insert_user_achievement(user_id, achievement.id, now)
                .await?;

            // None이면 이미 보유 → 포인트 재지급 없음
            let Some(user_achievement) = granted else {
                continue;
            };

            if achievement.points > 0 {
                self.points
                    .credit(
                        user_id,
                        achievement.points,
                        &format!("Achievement unlocked: {}", achievement.name),
                        "achievement",
                        Some(achievement.id.to_string()),
                    )
                    .await?;
            }

            tracing::info!(
                user_id = %user_id,
                achievement = %achievement.name,
                "Achievement unlocked"
            );
            awarded.push(user_achievement);
        }

        Ok(awarded)
    }

    /// 업적 카탈로그 (숨김 업적은 요청 시에만 포함)
    pub async fn catalog(&self, include_hidden: bool) -> Result<Vec<Achievement>, ApiError> {
        Ok(self.repo.list_achievements(include_hidden).await?)
    }

    pub async fn user_achievements(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserAchievement>, ApiError> {
        Ok(self.repo.list_user_achievements(user_id).await?)
    }

    /// 달성 현황 요약 (숨김 업적 포함 기준)
    pub async fn stats(&self, user_id: Uuid) -> Result<AchievementStats, ApiError> {
        let catalog = self.repo.list_achievements(true).await?;
        let earned = self.repo.list_user_achievements(user_id).await?;

        let points_earned: i64 = earned
            .iter()
            .filter_map(|ua| {
                catalog
                    .iter()
                    .find(|a| a.id == ua.achievement_id)
                    .map(|a| a.points)
            })
            .sum();

        let total = catalog.len() as i64;
        let earned_count = earned.len() as i64;

        Ok(AchievementStats {
            total,
            earned: earned_count,
            points_earned,
            completion_percentage: ProgressPercent::from_parts(earned_count, total).value(),
        })
    }
}
