//! Gamification API Library
//!
//! # Overview
//!
//! 이 라이브러리는 게이미피케이션 진행(progression) 엔진의 백엔드 API를 제공합니다.
//!
//! 활동 이벤트 하나가 업적, 챌린지, 일일 과제, 스트릭, 레벨의 다섯 트래커로
//! 팬아웃되고, 각 트래커의 보상은 포인트 원장과 보상 디스패처를 통해 지급됩니다.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            API                                │
//! │                                                               │
//! │  POST /activity                                               │
//! │       │                                                       │
//! │       ▼                                                       │
//! │  ┌────────────────────┐      ┌──────────────────────┐        │
//! │  │ ActivityDispatcher │─────▶│ Achievements          │        │
//! │  │  (activity log)    │─────▶│ Challenges ──▶ Events │        │
//! │  └────────────────────┘─────▶│ DailyTasks            │        │
//! │       │              ─────▶  │ Streaks               │        │
//! │       │              ─────▶  │ Levels                │        │
//! │       │                      └──────────┬───────────┘        │
//! │       │                                 ▼                     │
//! │       │                      ┌──────────────────────┐        │
//! │       │                      │ RewardDispatcher      │        │
//! │       │                      │   └─▶ PointsLedger    │        │
//! │       │                      └──────────┬───────────┘        │
//! │       ▼                                 ▼                     │
//! │  ┌──────────────────────────────────────────────────┐        │
//! │  │        GamificationRepository (PostgreSQL)        │        │
//! │  └──────────────────────────────────────────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `clock`: 시간 포트 (스트릭/이벤트 윈도우의 날짜 연산용)
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 비즈니스 로직 (트래커, 원장, 디스패처)
//! - `db`: 데이터베이스 연동 및 영속성 포트
//! - `types`: 공통 타입 정의
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gamification_api::{config::Config, db::Database};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let db = Database::connect(&config.database_url).await?;
//!
//!     // ... 서비스 조립 후 서버 시작
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod clock;
pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod db;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::ApiError;
pub use db::Database;
pub use services::{ActivityDispatcher, PointsLedger, RewardDispatcher};

use services::{
    AchievementTracker, ChallengeTracker, DailyTaskTracker, EventService, LeaderboardQuery,
    LevelTracker, StreakTracker, TitleService,
};

/// 애플리케이션 전역 상태
///
/// 트래커들은 생성 시점에 의존 순서대로 조립됨 (main.rs 참고)
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub dispatcher: Arc<ActivityDispatcher>,
    pub achievements: Arc<AchievementTracker>,
    pub challenges: Arc<ChallengeTracker>,
    pub daily_tasks: Arc<DailyTaskTracker>,
    pub streaks: Arc<StreakTracker>,
    pub levels: Arc<LevelTracker>,
    pub points: Arc<PointsLedger>,
    pub events: Arc<EventService>,
    pub titles: Arc<TitleService>,
    pub leaderboards: Arc<LeaderboardQuery>,
    pub config: Arc<Config>,
}
