//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 타입 정의

use serde::{Deserialize, Serialize};

/// API 응답 래퍼
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// limit/offset 페이지네이션 메타데이터
#[derive(Debug, Serialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
    pub has_next: bool,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64, total: i64) -> Self {
        Self {
            limit,
            offset,
            total,
            has_next: offset + limit < total,
        }
    }
}

/// 활동 액션 이름 타입
///
/// 클라이언트가 보고하는 액션 식별자 (`login`, `booking_completed` 등).
/// snake_case 소문자로 정규화해서 트래커들의 문자열 매칭을 일관되게 유지
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionName(String);

impl ActionName {
    pub fn new(raw: &str) -> Result<Self, String> {
        let action = raw.trim().to_lowercase();
        if action.is_empty() {
            return Err("Action must not be empty".to_string());
        }
        if action.len() > 64 {
            return Err("Action must be at most 64 characters".to_string());
        }
        if !action.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err("Action must contain only letters, digits and underscores".to_string());
        }
        Ok(Self(action))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 진행률 타입 (0..=100 클램프)
///
/// 챌린지 진행률과 레벨 진행률이 같은 반올림/상한 규칙을 공유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPercent(i32);

impl ProgressPercent {
    /// 0.0~1.0 비율에서 백분율 생성 (반올림 후 0..=100 클램프)
    pub fn from_ratio(ratio: f64) -> Self {
        let percent = (ratio * 100.0).round() as i32;
        Self(percent.clamp(0, 100))
    }

    /// 분자/분모에서 백분율 생성 (분모 0이면 0%)
    pub fn from_parts(current: i64, required: i64) -> Self {
        if required <= 0 {
            return Self(0);
        }
        Self::from_ratio(current as f64 / required as f64)
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0 >= 100
    }
}
