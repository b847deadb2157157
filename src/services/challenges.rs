//! Challenge Tracker Service
//!
//! 참여형 챌린지: join으로 인스턴스를 열고, 활동이 요구사항에 매칭될 때마다
//! 기여 로그(ChallengeActivity)를 쌓아 진행률을 재집계.
//!
//! 진행률 = 요구사항별 충족률(최대 1.0)의 평균 × 100, 반올림.
//! 100 도달 시 저장소의 조건부 완료 전환이 이긴 호출만 보상을 지급하므로
//! 동시 활동이 몰려도 중복 지급이 없음

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{
    Challenge, ChallengeActivity, ChallengeRequirement, GamificationRepository, UserChallenge,
};
use crate::error::ApiError;
use crate::types::ProgressPercent;

use super::rewards::{RewardContext, RewardDispatcher};

/// 완료된 챌린지 한 건 (이벤트 집계로 전달됨)
#[derive(Debug, Serialize)]
pub struct ChallengeCompletion {
    pub user_challenge: UserChallenge,
    pub challenge: Challenge,
}

/// 챌린지 트래커
pub struct ChallengeTracker {
    repo: Arc<dyn GamificationRepository>,
    rewards: Arc<RewardDispatcher>,
    clock: Arc<dyn Clock>,
}

impl ChallengeTracker {
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

    pub async fn active_challenges(&self) -> Result<Vec<Challenge>, ApiError> {
        Ok(self.repo.list_active_challenges().await?)
    }

    pub async fn user_challenges(&self, user_id: Uuid) -> Result<Vec<UserChallenge>, ApiError> {
        Ok(self.repo.list_user_challenges(user_id).await?)
    }

    /// 챌린지 참여
    ///
    /// - 열린 인스턴스가 이미 있으면 그대로 반환 (멱등)
    /// - 1회성 챌린지를 완료한 적이 있으면 `AlreadyCompleted`
    /// - 반복 챌린지는 마지막 완료 + cooldown_days 이전이면 `CooldownActive`
    pub async fn join(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<UserChallenge, ApiError> {
        let challenge = self
            .repo
            .get_challenge(challenge_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| ApiError::NotFound("Challenge".to_string()))?;

        if let Some(open) = self
            .repo
            .find_open_user_challenge(user_id, challenge_id)
            .await?
        {
            return Ok(open);
        }

        if let Some(last) = self
            .repo
            .find_latest_completed_challenge(user_id, challenge_id)
            .await?
        {
            if !challenge.is_repeatable {
                return Err(ApiError::AlreadyCompleted);
            }
            if let (Some(cooldown), Some(completed_at)) =
                (challenge.cooldown_days, last.completed_at)
            {
                let eligible_at = completed_at + Duration::days(cooldown);
                let now = self.clock.now();
                if now < eligible_at {
                    // 잔여 일수는 올림 (하루 미만이 남아도 1일로 안내)
                    let days_remaining = ((eligible_at - now).num_seconds() + 86_399) / 86_400;
                    return Err(ApiError::CooldownActive { days_remaining });
                }
            }
        }

        let instance = self
            .repo
            .insert_user_challenge(user_id, challenge_id, self.clock.now())
            .await?;

        tracing::info!(
            user_id = %user_id,
            challenge = %challenge.title,
            "User joined challenge"
        );
        Ok(instance)
    }

    /// 활동 1건을 열린 챌린지들에 반영
    ///
    /// 반환값은 이번 호출로 완료 전환에 성공한 챌린지 목록
    pub async fn on_activity(
        &self,
        user_id: Uuid,
        action: &str,
        target_id: Option<&str>,
        _metadata: &Value,
    ) -> Result<Vec<ChallengeCompletion>, ApiError> {
        let open = self.repo.list_open_user_challenges(user_id).await?;
        if open.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = open.iter().map(|uc| uc.challenge_id).collect();
        let catalog = self.repo.get_challenges_by_ids(&ids).await?;
        let now = self.clock.now();

        let mut completions = Vec::new();
        for instance in open {
            let Some(challenge) = catalog.iter().find(|c| c.id == instance.challenge_id) else {
                continue;
            };

            let mut matched = false;
            for requirement in challenge.requirements.iter() {
                if requirement.action != action {
                    continue;
                }
                // 요구사항이 대상까지 지정하면 해당 대상 활동만 인정
                if let Some(pinned) = &requirement.target_id {
                    if target_id != Some(pinned.as_str()) {
                        continue;
                    }
                }
                self.repo
                    .insert_challenge_activity(
                        instance.id,
                        &requirement.requirement_type,
                        &requirement.action,
                        1,
                        now,
                    )
                    .await?;
                matched = true;
            }
            if !matched {
                continue;
            }

            let activities = self.repo.list_challenge_activities(instance.id).await?;
            let progress = aggregate_progress(&challenge.requirements, &activities);
            self.repo
                .update_challenge_progress(instance.id, progress.value(), now)
                .await?;

            if !progress.is_complete() {
                continue;
            }

            // 조건부 전환에 이긴 호출만 보상 지급
            if self.repo.complete_user_challenge(instance.id, now).await? {
                let ctx = RewardContext::new(
                    "challenge_completion",
                    Some(challenge.id.to_string()),
                    format!("Completed challenge: {}", challenge.title),
                );
                let applied = self
                    .rewards
                    .dispatch_all(user_id, &challenge.rewards, &ctx)
                    .await;

                tracing::info!(
                    user_id = %user_id,
                    challenge = %challenge.title,
                    rewards_applied = applied,
                    "Challenge completed"
                );

                let mut completed = instance.clone();
                completed.progress = 100;
                completed.is_completed = true;
                completed.completed_at = Some(now);
                completions.push(ChallengeCompletion {
                    user_challenge: completed,
                    challenge: challenge.clone(),
                });
            }
        }

        Ok(completions)
    }
}

/// 기여 로그를 요구사항별로 합산해 전체 진행률 산출
fn aggregate_progress(
    requirements: &[ChallengeRequirement],
    activities: &[ChallengeActivity],
) -> ProgressPercent {
    if requirements.is_empty() {
        // 요구사항 없는 챌린지는 진행 불가
        return ProgressPercent::from_ratio(0.0);
    }

    let mut total = 0.0;
    for requirement in requirements {
        if requirement.count <= 0 {
            total += 1.0;
            continue;
        }
        let contributed: i64 = activities
            .iter()
            .filter(|a| {
                a.requirement_type == requirement.requirement_type
                    && a.action == requirement.action
            })
            .map(|a| a.delta)
            .sum();
        total += (contributed as f64 / requirement.count as f64).min(1.0);
    }

    ProgressPercent::from_ratio(total / requirements.len() as f64)
}
