//! Activity Ingestion Endpoint
//!
//! Single entry point for every user action the engine tracks.
//! One POST fans out to achievements, challenges, daily tasks,
//! streaks and levels.
//!
//! # Interview Q&A
//!
//! Q: 왜 응답이 에러 대신 `{ "recorded": bool }`인가?
//! A: 클라이언트(앱/웹 훅)는 활동 보고를 fire-and-forget으로
//!    호출한다. 트래커 하나가 실패했다고 4xx/5xx를 돌려주면
//!    클라이언트가 재시도하면서 이벤트 로그가 중복된다.
//!    계약은 "이벤트 로그에 적혔는가" 하나뿐이고, 나머지는
//!    서버 로그로 추적한다.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{error::ApiError, types::ActionName, AppState};

// ============ Request/Response Types ============

/// 활동 기록 요청
#[derive(Debug, Deserialize)]
pub struct RecordActivityRequest {
    /// 활동 주체
    pub user_id: Uuid,
    /// 액션 식별자 (`login`, `booking_completed`, `forum_post_created` 등)
    pub action: String,
    /// 액션 대상 (챌린지 요구사항의 target 매칭에 사용)
    pub target_id: Option<String>,
    /// 자유 형식 컨텍스트 (`{"count": n}`은 업적 트리거 값으로 해석됨)
    pub metadata: Option<Value>,
}

/// 활동 기록 응답
#[derive(Debug, Serialize)]
pub struct RecordActivityResponse {
    /// 이벤트 로그 기록 성공 여부
    pub recorded: bool,
}

// ============ Handlers ============

/// POST /activity
///
/// 활동 1건 기록 + 전체 트래커 팬아웃
///
/// # Flow
///
/// 1. 액션 이름 정규화/검증
/// 2. 이벤트 로그 기록 (여기 실패만 recorded=false)
/// 3. 업적 → 챌린지 → 일일 과제 → 스트릭 → 레벨 순서로 전파
pub async fn record_activity(
    State(state): State<AppState>,
    Json(req): Json<RecordActivityRequest>,
) -> Result<Json<RecordActivityResponse>, ApiError> {
    let action = ActionName::new(&req.action).map_err(ApiError::ValidationError)?;

    tracing::info!(
        user_id = %req.user_id,
        action = %action.as_str(),
        "Recording activity"
    );

    let recorded = state
        .dispatcher
        .record_activity(
            req.user_id,
            &action,
            req.target_id.as_deref(),
            req.metadata.unwrap_or_else(|| Value::Object(Default::default())),
        )
        .await;

    Ok(Json(RecordActivityResponse { recorded }))
}
