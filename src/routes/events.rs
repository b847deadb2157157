//! Event Endpoints
//!
//! Time-boxed events that bundle challenges. Joining an event
//! auto-enrolls the user into the bundled challenges.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    db::models::{EventParticipation, GameEvent},
    error::ApiError,
    types::ApiResponse,
    AppState,
};

// ============ Handlers ============

/// GET /events/active
///
/// 현재 진행 중인 이벤트
pub async fn list_active_events(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<GameEvent>>> {
    match state.events.active_events().await {
        Ok(events) => Json(ApiResponse::success(events)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list active events");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /events/upcoming
///
/// 시작 전 이벤트 (미리보기)
pub async fn list_upcoming_events(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<GameEvent>>> {
    match state.events.upcoming_events().await {
        Ok(events) => Json(ApiResponse::success(events)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list upcoming events");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// GET /users/:user_id/events
///
/// 사용자의 이벤트 참여 목록
pub async fn get_user_participations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<ApiResponse<Vec<EventParticipation>>> {
    match state.events.user_participations(user_id).await {
        Ok(participations) => Json(ApiResponse::success(participations)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load event participations");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}

/// POST /users/:user_id/events/:event_id/join
///
/// 이벤트 참여
///
/// 이벤트 기간 밖이면 400, 이미 참여 중이면 기존 참여 반환 (멱등).
/// 번들 챌린지 자동 참여 실패는 경고 로그만 남기고 계속 진행
pub async fn join_event(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<EventParticipation>>, ApiError> {
    tracing::info!(user_id = %user_id, event_id = %event_id, "Joining event");

    let participation = state.events.join_event(user_id, event_id).await?;
    Ok(Json(ApiResponse::success(participation)))
}
