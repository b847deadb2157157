//! Challenge Endpoints
//!
//! Catalog, per-user instances and explicit opt-in joins.
//!
//! # Interview Q&A
//!
//! Q: 조회는 성공 응답으로 비우는데 join은 왜 4xx를 던지나?
//! A: 조회 실패는 클라이언트가 할 수 있는 일이 없어 빈 목록으로
//!    화면을 유지한다. join은 사용자의 의도적 행동이라 반복 불가,
//!    쿨다운 같은 규칙 위반을 코드로 구분해 돌려줘야 UI가 이유를
//!    보여줄 수 있다 (409 ALREADY_COMPLETED / COOLDOWN_ACTIVE).

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    db::models::{Challenge, UserChallenge},
    error::ApiError,
    types::ApiResponse,
    AppState,
};

// ============ Handlers ============

/// GET /challenges
///
/// 활성 챌린지 카탈로그
pub async fn list_challenges(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<Challenge>>> {
    match state.challenges.active_challenges().await {
        Ok(challenges) => Json(ApiResponse::success(challenges)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list challenges");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /users/:user_id/challenges
///
/// 사용자의 챌린지 인스턴스 목록 (진행 중 + 완료)
pub async fn get_user_challenges(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<ApiResponse<Vec<UserChallenge>>> {
    match state.challenges.user_challenges(user_id).await {
        Ok(instances) => Json(ApiResponse::success(instances)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load user challenges");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// POST /users/:user_id/challenges/:challenge_id/join
///
/// 챌린지 참여
///
/// 이미 열린 인스턴스가 있으면 그대로 반환 (멱등).
/// 반복 불가 챌린지 재참여는 409, 쿨다운 중이면 남은 일수와 함께 409
pub async fn join_challenge(
    State(state): State<AppState>,
    Path((user_id, challenge_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<UserChallenge>>, ApiError> {
    tracing::info!(
        user_id = %user_id,
        challenge_id = %challenge_id,
        "Joining challenge"
    );

    let instance = state.challenges.join(user_id, challenge_id).await?;
    Ok(Json(ApiResponse::success(instance)))
}
