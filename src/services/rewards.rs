//! Reward Dispatcher Service
//!
//! 챌린지/레벨/이벤트 완료가 만드는 폴리모픽 보상(`Reward`)을 종류별 저장소 기록으로
//! 변환하는 단일 지점. 트래커들은 보상의 내부 표현을 모르고 dispatch만 호출함.
//!
//! 실패 격리: 보상 목록 중 하나가 실패해도 나머지는 계속 지급 (각 실패는 로그로 남김)

use std::sync::Arc;

use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{GamificationRepository, Reward};
use crate::error::ApiError;

use super::points::PointsLedger;

/// 보상 지급의 출처 정보
///
/// 포인트 원장의 source/source_id/description과 칭호의 source로 기록됨
pub struct RewardContext {
    pub source: String,
    pub source_id: Option<String>,
    pub description: String,
}

impl RewardContext {
    pub fn new(source: &str, source_id: Option<String>, description: String) -> Self {
        Self {
            source: source.to_string(),
            source_id,
            description,
        }
    }
}

/// 보상 디스패처
pub struct RewardDispatcher {
    repo: Arc<dyn GamificationRepository>,
    points: Arc<PointsLedger>,
    clock: Arc<dyn Clock>,
}

impl RewardDispatcher {
    /// 할인 쿠폰 유효 기간 (일)
    const DISCOUNT_VALIDITY_DAYS: i64 = 30;

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

    /// 단일 보상 지급
    pub async fn dispatch(
        &self,
        user_id: Uuid,
        reward: &Reward,
        ctx: &RewardContext,
    ) -> Result<(), ApiError> {
        let now = self.clock.now();

        match reward {
            Reward::Points { amount } => {
                self.points
                    .credit(
                        user_id,
                        *amount,
                        &ctx.description,
                        &ctx.source,
                        ctx.source_id.clone(),
                    )
                    .await?;
            }
            Reward::Badge { achievement_id } => {
                // 이미 보유한 배지는 조용히 무시 (멱등)
                let granted = self
                    .repo
                    .insert_user_achievement(user_id, *achievement_id, now)
                    .await?;
                if granted.is_none() {
                    tracing::debug!(user_id = %user_id, achievement_id = %achievement_id,
                        "Badge already held, skipping");
                }
            }
            Reward::Title { name } => {
                self.repo
                    .insert_user_title(user_id, name, &ctx.source, now)
                    .await?;
            }
            Reward::FeatureUnlock { key, metadata } => {
                self.repo
                    .insert_user_feature(user_id, key, metadata.clone(), now)
                    .await?;
            }
            Reward::Discount { percentage } => {
                if !(1..=100).contains(percentage) {
                    return Err(ApiError::ValidationError(format!(
                        "Discount percentage {} out of range",
                        percentage
                    )));
                }
                let code = generate_discount_code(user_id);
                let expires_at = now + chrono::Duration::days(Self::DISCOUNT_VALIDITY_DAYS);
                self.repo
                    .insert_user_discount(user_id, *percentage, &code, expires_at, now)
                    .await?;
            }
        }

        Ok(())
    }

    /// 보상 목록 지급, 개별 실패는 격리
    ///
    /// 성공적으로 지급된 보상 수를 반환
    pub async fn dispatch_all(
        &self,
        user_id: Uuid,
        rewards: &[Reward],
        ctx: &RewardContext,
    ) -> usize {
        let mut applied = 0;
        for reward in rewards {
            match self.dispatch(user_id, reward, ctx).await {
                Ok(()) => applied += 1,
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        source = %ctx.source,
                        error = %e,
                        "Reward dispatch failed, continuing with remaining rewards"
                    );
                }
            }
        }
        applied
    }
}

/// 할인 코드 생성
///
/// 형식: 사용자 UUID 앞 8자 + '-' + 랜덤 영숫자 6자 (대문자)
fn generate_discount_code(user_id: Uuid) -> String {
    let prefix: String = user_id.to_string().chars().take(8).collect();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("{}-{}", prefix, suffix)
}
