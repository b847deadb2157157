//! Leaderboard Endpoints
//!
//! Definitions, windowed entries and a single user's rank.
//! Rankings are computed on demand from the underlying tables,
//! never materialized.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::models::{Leaderboard, LeaderboardEntry},
    types::ApiResponse,
    AppState,
};

// ============ Request/Response Types ============

/// 엔트리 조회 쿼리 파라미터
#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    /// 반환 개수 (기본 10, 최대 100)
    pub limit: Option<i64>,
    /// 시작 오프셋 (기본 0)
    pub offset: Option<i64>,
}

// ============ Handlers ============

/// GET /leaderboards
///
/// 활성 리더보드 정의 목록
pub async fn list_leaderboards(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<Leaderboard>>> {
    match state.leaderboards.list().await {
        Ok(boards) => Json(ApiResponse::success(boards)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list leaderboards");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /leaderboards/:leaderboard_id/entries
///
/// 기간 윈도우 적용된 랭킹 (rank는 offset 반영)
pub async fn get_leaderboard_entries(
    State(state): State<AppState>,
    Path(leaderboard_id): Path<Uuid>,
    Query(query): Query<EntriesQuery>,
) -> Json<ApiResponse<Vec<LeaderboardEntry>>> {
    let limit = query.limit.unwrap_or(10);
    let offset = query.offset.unwrap_or(0);

    match state
        .leaderboards
        .entries(leaderboard_id, limit, offset)
        .await
    {
        Ok(entries) => Json(ApiResponse::success(entries)),
        Err(e) => {
            tracing::error!(
                leaderboard_id = %leaderboard_id,
                error = %e,
                "Failed to load leaderboard entries"
            );
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /leaderboards/:leaderboard_id/rank/:user_id
///
/// 특정 사용자의 순위 (스캔 한도 밖이거나 점수 없으면 null)
pub async fn get_user_rank(
    State(state): State<AppState>,
    Path((leaderboard_id, user_id)): Path<(Uuid, Uuid)>,
) -> Json<ApiResponse<Option<LeaderboardEntry>>> {
    match state.leaderboards.user_rank(leaderboard_id, user_id).await {
        Ok(rank) => Json(ApiResponse::success(rank)),
        Err(e) => {
            tracing::error!(
                leaderboard_id = %leaderboard_id,
                user_id = %user_id,
                error = %e,
                "Failed to resolve user rank"
            );
            Json(ApiResponse::error(e.to_string()))
        }
    }
}
