//! Profile Endpoints
//!
//! Per-user progression snapshot: level, streaks, today's tasks,
//! titles and the recent activity feed. These back the profile and
//! progress screens, so read failures degrade instead of erroring.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::{
        models::{ActivityEvent, LevelDefinition, UserLevel, UserStreak, UserTitle},
        GamificationRepository,
    },
    error::ApiError,
    services::DailyTaskStatus,
    types::ApiResponse,
    AppState,
};

// ============ Request/Response Types ============

/// 활동 피드 쿼리 파라미터
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// 반환 개수 (기본 20, 최대 100)
    pub limit: Option<i64>,
}

// ============ Handlers ============

/// GET /levels
///
/// 레벨 정의 카탈로그 (임계값 오름차순)
pub async fn list_level_definitions(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<LevelDefinition>>> {
    match state.levels.definitions().await {
        Ok(definitions) => Json(ApiResponse::success(definitions)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list level definitions");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /users/:user_id/level
///
/// 사용자 레벨 상태 (첫 조회 시 레벨 1로 초기화)
pub async fn get_user_level(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<ApiResponse<UserLevel>> {
    match state.levels.user_level(user_id).await {
        Ok(level) => Json(ApiResponse::success(level)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load user level");
            Json(ApiResponse::error(e.to_string()))
        }
    }
}

/// GET /users/:user_id/streaks
///
/// 사용자의 스트릭 상태 (타입별 1행)
pub async fn get_user_streaks(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<ApiResponse<Vec<UserStreak>>> {
    match state.streaks.user_streaks(user_id).await {
        Ok(streaks) => Json(ApiResponse::success(streaks)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load user streaks");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /users/:user_id/daily-tasks
///
/// 오늘의 과제 현황 (없으면 오늘 슬레이트를 먼저 생성)
pub async fn get_daily_tasks(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<ApiResponse<Vec<DailyTaskStatus>>> {
    match state.daily_tasks.todays_tasks(user_id).await {
        Ok(tasks) => Json(ApiResponse::success(tasks)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load daily tasks");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /users/:user_id/activity
///
/// 최근 활동 피드 (최신순)
pub async fn get_activity_feed(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<FeedQuery>,
) -> Json<ApiResponse<Vec<ActivityEvent>>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    match state.db.recent_activities(user_id, limit).await {
        Ok(events) => Json(ApiResponse::success(events)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load activity feed");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /users/:user_id/titles
///
/// 획득한 칭호 목록 (활성 칭호 포함)
pub async fn get_user_titles(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<ApiResponse<Vec<UserTitle>>> {
    match state.titles.user_titles(user_id).await {
        Ok(titles) => Json(ApiResponse::success(titles)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load user titles");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// POST /users/:user_id/titles/:title_id/activate
///
/// 칭호 활성화 (기존 활성 칭호는 해제, 동시에 하나만)
///
/// 남의 칭호이거나 없는 id면 404
pub async fn activate_title(
    State(state): State<AppState>,
    Path((user_id, title_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<UserTitle>>, ApiError> {
    tracing::info!(user_id = %user_id, title_id = %title_id, "Activating title");

    let title = state.titles.set_active_title(user_id, title_id).await?;
    Ok(Json(ApiResponse::success(title)))
}
