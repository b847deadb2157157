//! Points Ledger Service
//!
//! # Interview Q&A
//!
//! Q: 잔액을 왜 컬럼으로 저장하지 않는가?
//! A: append-only 원장이 단일 진실 공급원
//!
//!    잔액 = Σearned + Σadjusted - Σspent - Σexpired (completed 한정)
//!
//!    장점:
//!    - 저장된 잔액과 기록의 불일치(drift)가 구조적으로 불가능
//!    - 모든 변동에 출처(source)가 남아 감사 가능
//!    - 정정은 adjusted 트랜잭션 추가로 처리 (기존 행 수정 없음)
//!
//! Q: 차감 시 동시성 문제는?
//! A: 파생 잔액 확인 후 spent 행 추가
//!    - 포인트는 결제 수단이 아니라 참여 보상이라 과차감 허용 오차가 작음
//!    - 엄격히 막아야 하면 원장 테이블에 CHECK 제약 + 트랜잭션으로 강화 가능

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{
    GamificationRepository, NewPointsTransaction, PointsBalance, PointsConfig, PointsTransaction,
    Redemption, RewardItem,
};
use crate::error::ApiError;

/// 포인트 원장 서비스
///
/// 적립/차감은 전부 이 서비스를 통해 원장에 기록됨
pub struct PointsLedger {
    repo: Arc<dyn GamificationRepository>,
    clock: Arc<dyn Clock>,
}

impl PointsLedger {
    pub fn new(repo: Arc<dyn GamificationRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// 포인트 적립 (earned, completed 상태로 즉시 반영)
    pub async fn credit(
        &self,
        user_id: Uuid,
        amount: i64,
        description: &str,
        source: &str,
        source_id: Option<String>,
    ) -> Result<PointsTransaction, ApiError> {
        if amount <= 0 {
            return Err(ApiError::ValidationError(
                "Credit amount must be positive".to_string(),
            ));
        }

        let now = self.clock.now();
        let tx = NewPointsTransaction {
            user_id,
            amount,
            transaction_type: "earned".to_string(),
            status: "completed".to_string(),
            source: source.to_string(),
            source_id,
            description: description.to_string(),
            created_at: now,
            processed_at: Some(now),
        };

        Ok(self.repo.insert_points_transaction(&tx).await?)
    }

    /// 포인트 차감 (잔액 확인 후 spent 기록)
    pub async fn debit(
        &self,
        user_id: Uuid,
        amount: i64,
        description: &str,
        source: &str,
        source_id: Option<String>,
    ) -> Result<PointsTransaction, ApiError> {
        if amount <= 0 {
            return Err(ApiError::ValidationError(
                "Debit amount must be positive".to_string(),
            ));
        }

        let balance = self.repo.points_summary(user_id).await?;
        if balance.current_balance < amount {
            return Err(ApiError::InsufficientPoints {
                required: amount,
                available: balance.current_balance,
            });
        }

        let now = self.clock.now();
        let tx = NewPointsTransaction {
            user_id,
            amount,
            transaction_type: "spent".to_string(),
            status: "completed".to_string(),
            source: source.to_string(),
            source_id,
            description: description.to_string(),
            created_at: now,
            processed_at: Some(now),
        };

        Ok(self.repo.insert_points_transaction(&tx).await?)
    }

    /// 파생 잔액 조회
    pub async fn balance(&self, user_id: Uuid) -> Result<PointsBalance, ApiError> {
        Ok(self.repo.points_summary(user_id).await?)
    }

    /// 트랜잭션 이력 (최신순 페이지)
    pub async fn transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PointsTransaction>, i64), ApiError> {
        Ok(self
            .repo
            .list_points_transactions(user_id, limit, offset)
            .await?)
    }

    /// 유효 포인트 정책 (행이 없으면 기본값)
    pub async fn config(&self) -> Result<PointsConfig, ApiError> {
        Ok(self.repo.get_points_config().await?.unwrap_or_default())
    }

    /// 교환 가능한 리워드 카탈로그
    pub async fn available_rewards(&self) -> Result<Vec<RewardItem>, ApiError> {
        Ok(self.repo.list_reward_items().await?)
    }

    /// 사용자의 교환 이력
    pub async fn user_rewards(&self, user_id: Uuid) -> Result<Vec<Redemption>, ApiError> {
        Ok(self.repo.list_user_redemptions(user_id).await?)
    }

    /// 리워드 교환
    ///
    /// 순서: 정책/잔액 검증 → 원장 차감 → 교환 기록
    pub async fn redeem_reward(
        &self,
        user_id: Uuid,
        reward_id: Uuid,
    ) -> Result<Redemption, ApiError> {
        let item = self
            .repo
            .get_reward_item(reward_id)
            .await?
            .filter(|i| i.is_active)
            .ok_or_else(|| ApiError::NotFound("Reward".to_string()))?;

        let config = self.config().await?;
        let balance = self.repo.points_summary(user_id).await?;

        if balance.current_balance < config.min_points_for_redemption {
            return Err(ApiError::ValidationError(format!(
                "Redemption requires a balance of at least {} points",
                config.min_points_for_redemption
            )));
        }
        if balance.current_balance < item.points_cost {
            return Err(ApiError::InsufficientPoints {
                required: item.points_cost,
                available: balance.current_balance,
            });
        }

        self.debit(
            user_id,
            item.points_cost,
            &format!("Redeemed reward: {}", item.name),
            "reward_redemption",
            Some(item.id.to_string()),
        )
        .await?;

        let redemption = self
            .repo
            .insert_redemption(user_id, item.id, item.points_cost, self.clock.now())
            .await?;

        tracing::info!(
            user_id = %user_id,
            reward = %item.name,
            points = item.points_cost,
            "Reward redeemed"
        );

        Ok(redemption)
    }
}
