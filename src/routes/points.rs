//! Points Endpoints
//!
//! Balance, transaction history, redemption catalog and redeems.
//! The ledger itself is append-only; every response here is derived
//! from transaction rows.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{
        models::{
            PointsBalance, PointsConfig, PointsTransaction, Redemption, RewardItem, UserDiscount,
            UserFeature,
        },
        GamificationRepository,
    },
    error::ApiError,
    types::{ApiResponse, Pagination},
    AppState,
};

// ============ Request/Response Types ============

/// 트랜잭션 이력 쿼리 파라미터
#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    /// 페이지 크기 (기본 50, 최대 100)
    pub limit: Option<i64>,
    /// 시작 오프셋 (기본 0)
    pub offset: Option<i64>,
}

/// 트랜잭션 이력 응답
#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<PointsTransaction>,
    pub pagination: Pagination,
}

/// 사용자가 받은 리워드 전체 (교환 이력 + 팬아웃으로 지급된 혜택)
#[derive(Debug, Serialize)]
pub struct UserRewardsResponse {
    /// 포인트로 직접 교환한 리워드
    pub redemptions: Vec<Redemption>,
    /// 챌린지/이벤트 보상으로 발급된 할인 코드
    pub discounts: Vec<UserDiscount>,
    /// 잠금 해제된 기능
    pub features: Vec<UserFeature>,
}

// ============ Handlers ============

/// GET /users/:user_id/points/balance
///
/// 파생 잔액 (earned − spent − expired + adjusted, pending 별도)
pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<ApiResponse<PointsBalance>> {
    match state.points.balance(user_id).await {
        Ok(balance) => Json(ApiResponse::success(balance)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to compute points balance");
            Json(ApiResponse::error(e.to_string()))
        }
    }
}

/// GET /users/:user_id/points/transactions
///
/// 트랜잭션 이력 (최신순, 페이지네이션)
pub async fn get_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<TransactionsQuery>,
) -> Json<ApiResponse<TransactionsResponse>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    match state.points.transactions(user_id, limit, offset).await {
        Ok((transactions, total)) => Json(ApiResponse::success(TransactionsResponse {
            transactions,
            pagination: Pagination::new(limit, offset, total),
        })),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load points transactions");
            Json(ApiResponse::success(TransactionsResponse {
                transactions: Vec::new(),
                pagination: Pagination::new(limit, offset, 0),
            }))
        }
    }
}

/// GET /points/config
///
/// 유효 포인트 정책 (행이 없으면 기본값)
pub async fn get_points_config(
    State(state): State<AppState>,
) -> Json<ApiResponse<PointsConfig>> {
    match state.points.config().await {
        Ok(config) => Json(ApiResponse::success(config)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load points config");
            Json(ApiResponse::error(e.to_string()))
        }
    }
}

/// GET /rewards
///
/// 교환 가능한 리워드 카탈로그
pub async fn list_rewards(State(state): State<AppState>) -> Json<ApiResponse<Vec<RewardItem>>> {
    match state.points.available_rewards().await {
        Ok(rewards) => Json(ApiResponse::success(rewards)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list reward items");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /users/:user_id/rewards
///
/// 교환 이력 + 보상으로 받은 할인 코드/기능 잠금 해제
pub async fn get_user_rewards(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<ApiResponse<UserRewardsResponse>> {
    match load_user_rewards(&state, user_id).await {
        Ok(rewards) => Json(ApiResponse::success(rewards)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load user rewards");
            Json(ApiResponse::success(UserRewardsResponse {
                redemptions: Vec::new(),
                discounts: Vec::new(),
                features: Vec::new(),
            }))
        }
    }
}

/// POST /users/:user_id/rewards/:reward_id/redeem
///
/// 리워드 교환
///
/// 정책 최소 잔액 미달이면 400, 잔액 부족이면 400 INSUFFICIENT_POINTS
pub async fn redeem_reward(
    State(state): State<AppState>,
    Path((user_id, reward_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Redemption>>, ApiError> {
    tracing::info!(user_id = %user_id, reward_id = %reward_id, "Redeeming reward");

    let redemption = state.points.redeem_reward(user_id, reward_id).await?;
    Ok(Json(ApiResponse::success(redemption)))
}

// ============ Helpers ============

async fn load_user_rewards(
    state: &AppState,
    user_id: Uuid,
) -> Result<UserRewardsResponse, ApiError> {
    let redemptions = state.points.user_rewards(user_id).await?;
    let discounts = state.db.list_user_discounts(user_id).await?;
    let features = state.db.list_user_features(user_id).await?;

    Ok(UserRewardsResponse {
        redemptions,
        discounts,
        features,
    })
}
