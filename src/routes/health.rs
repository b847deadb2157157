//! Health Check Endpoint
//!
//! # Interview Q&A
//!
//! Q: 진행 엔진에 깊은(deep) 헬스체크가 왜 필요한가?
//! A: 이 서비스의 쓰기 경로는 전부 PostgreSQL에 수렴한다.
//!    프로세스는 떠 있는데 DB가 죽어 있으면 모든 활동 이벤트가
//!    recorded=false로 떨어지므로, 로드밸런서가 트래픽을 미리
//!    차단할 수 있게 DB 왕복까지 확인해 상태를 구분한다
//!    (healthy / degraded).

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Health check 응답
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseStatus,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct DatabaseStatus {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// GET /health
///
/// 서버 및 DB 연결 상태 확인
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_start = std::time::Instant::now();
    let db_status = match state.db.health_check().await {
        Ok(_) => DatabaseStatus {
            connected: true,
            latency_ms: Some(db_start.elapsed().as_millis() as u64),
        },
        Err(_) => DatabaseStatus {
            connected: false,
            latency_ms: None,
        },
    };

    Json(HealthResponse {
        status: if db_status.connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
