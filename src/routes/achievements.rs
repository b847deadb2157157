//! Achievement Endpoints
//!
//! Catalog browsing and per-user achievement queries.
//! Awarding itself happens inside the activity fan-out, not here.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::models::{Achievement, UserAchievement},
    services::AchievementStats,
    types::ApiResponse,
    AppState,
};

// ============ Request/Response Types ============

/// 업적 카탈로그 쿼리 파라미터
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    /// 히든 업적 포함 여부 (기본 false)
    pub include_hidden: Option<bool>,
}

// ============ Handlers ============

/// GET /achievements
///
/// 활성 업적 카탈로그 (기본은 히든 업적 제외)
pub async fn list_achievements(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Json<ApiResponse<Vec<Achievement>>> {
    let include_hidden = query.include_hidden.unwrap_or(false);

    match state.achievements.catalog(include_hidden).await {
        Ok(achievements) => Json(ApiResponse::success(achievements)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list achievements");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /users/:user_id/achievements
///
/// 사용자가 획득한 업적 목록
pub async fn get_user_achievements(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<ApiResponse<Vec<UserAchievement>>> {
    match state.achievements.user_achievements(user_id).await {
        Ok(earned) => Json(ApiResponse::success(earned)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load user achievements");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /users/:user_id/achievements/stats
///
/// 업적 통계 (전체/획득 수, 획득 포인트, 완료율)
pub async fn get_achievement_stats(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<ApiResponse<AchievementStats>> {
    match state.achievements.stats(user_id).await {
        Ok(stats) => Json(ApiResponse::success(stats)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to compute achievement stats");
            Json(ApiResponse::error(e.to_string()))
        }
    }
}
