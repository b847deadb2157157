//! Event Service
//!
//! 기간 한정 이벤트: 참여하면 이벤트에 묶인 챌린지에 자동 참여되고,
//! 묶인 챌린지가 완료될 때마다 참여 집계(포인트/완료 수)가 올라감.
//!
//! 이벤트 자체 보상은 묶인 챌린지를 전부 완료했을 때 1회 지급 —
//! rewards_claimed 플래그의 조건부 전환이 중복 지급을 막음

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{EventParticipation, GameEvent, GamificationRepository};
use crate::error::ApiError;

use super::challenges::{ChallengeCompletion, ChallengeTracker};
use super::rewards::{RewardContext, RewardDispatcher};

/// 이벤트 서비스
pub struct EventService {
    repo: Arc<dyn GamificationRepository>,
    challenges: Arc<ChallengeTracker>,
    rewards: Arc<RewardDispatcher>,
    clock: Arc<dyn Clock>,
}

impl EventService {
    pub fn new(
        repo: Arc<dyn GamificationRepository>,
        challenges: Arc<ChallengeTracker>,
        rewards: Arc<RewardDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            challenges,
            rewards,
            clock,
        }
    }

    /// 진행 중인 이벤트 (기간 내 + 활성)
    pub async fn active_events(&self) -> Result<Vec<GameEvent>, ApiError> {
        Ok(self.repo.list_active_events(self.clock.now()).await?)
    }

    /// 시작 전 이벤트
    pub async fn upcoming_events(&self) -> Result<Vec<GameEvent>, ApiError> {
        Ok(self.repo.list_upcoming_events(self.clock.now()).await?)
    }

    pub async fn user_participations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<EventParticipation>, ApiError> {
        Ok(self.repo.list_user_participations(user_id).await?)
    }

    /// 이벤트 참여
    ///
    /// - 이미 참여 중이면 기존 참여를 반환 (멱등)
    /// - 기간 밖이면 `ValidationError`
    /// - 묶인 챌린지는 자동 참여되며, 개별 실패(쿨다운 등)는 참여를 막지 않음
    pub async fn join_event(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<EventParticipation, ApiError> {
        let event = self
            .repo
            .get_event(event_id)
            .await?
            .filter(|e| e.is_active)
            .ok_or_else(|| ApiError::NotFound("Event".to_string()))?;

        let now = self.clock.now();
        if now < event.start_date {
            return Err(ApiError::ValidationError(
                "Event has not started yet".to_string(),
            ));
        }
        if now > event.end_date {
            return Err(ApiError::ValidationError(
                "Event has already ended".to_string(),
            ));
        }

        if let Some(existing) = self.repo.find_event_participation(user_id, event_id).await? {
            return Ok(existing);
        }

        let participation = self
            .repo
            .insert_event_participation(user_id, event_id, now)
            .await?;

        for challenge_id in event.challenge_ids.iter() {
            if let Err(e) = self.challenges.join(user_id, *challenge_id).await {
                // 쿨다운/완료 이력 등으로 일부 챌린지에 못 들어가도 이벤트 참여는 유지
                tracing::warn!(
                    user_id = %user_id,
                    event = %event.title,
                    challenge_id = %challenge_id,
                    error = %e,
                    "Could not auto-join event challenge"
                );
            }
        }

        self.repo
            .insert_activity_event(
                user_id,
                "event_joined",
                Some(&event_id.to_string()),
                json!({ "event_title": event.title }),
                now,
            )
            .await?;

        tracing::info!(
            user_id = %user_id,
            event = %event.title,
            "User joined event"
        );
        Ok(participation)
    }

    /// 챌린지 완료를 이벤트 집계에 반영
    ///
    /// 완료된 챌린지가 묶인 모든 진행 중 이벤트에 대해 집계를 올리고,
    /// 전 챌린지 완료 시 이벤트 보상을 지급
    pub async fn on_challenge_completed(
        &self,
        user_id: Uuid,
        completion: &ChallengeCompletion,
    ) -> Result<(), ApiError> {
        let challenge_id = completion.challenge.id;
        let events = self.repo.list_active_events(self.clock.now()).await?;

        for event in events
            .iter()
            .filter(|e| e.challenge_ids.contains(&challenge_id))
        {
            let Some(participation) =
                self.repo.find_event_participation(user_id, event.id).await?
            else {
                continue;
            };

            self.repo
                .add_event_progress(participation.id, completion.challenge.points_value(), 1)
                .await?;

            if participation.rewards_claimed {
                continue;
            }
            if !self.all_challenges_completed(user_id, event).await? {
                continue;
            }

            // 조건부 플래그 전환에 이긴 호출만 이벤트 보상을 지급
            if self.repo.claim_event_rewards(participation.id).await? {
                let ctx = RewardContext::new(
                    "event_completion",
                    Some(event.id.to_string()),
                    format!("Completed event: {}", event.title),
                );
                let applied = self.rewards.dispatch_all(user_id, &event.rewards, &ctx).await;

                let now = self.clock.now();
                self.repo
                    .insert_activity_event(
                        user_id,
                        "event_completed",
                        Some(&event.id.to_string()),
                        json!({ "event_title": event.title }),
                        now,
                    )
                    .await?;

                tracing::info!(
                    user_id = %user_id,
                    event = %event.title,
                    rewards_applied = applied,
                    "Event completed"
                );
            }
        }

        Ok(())
    }

    async fn all_challenges_completed(
        &self,
        user_id: Uuid,
        event: &GameEvent,
    ) -> Result<bool, ApiError> {
        for challenge_id in event.challenge_ids.iter() {
            if self
                .repo
                .find_latest_completed_challenge(user_id, *challenge_id)
                .await?
                .is_none()
            {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
