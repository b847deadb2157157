//! Gamification API Server
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Client (App / Web)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum Web Server                         │
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                      Routes Layer                        ││
//! │  │  /health  /activity  /achievements/*  /challenges/*     ││
//! │  │  /events/*  /points/*  /users/*  /leaderboards/*        ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Services Layer                        ││
//! │  │  ActivityDispatcher → 5 Trackers → RewardDispatcher     ││
//! │  │                        PointsLedger                      ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Data Layer                            ││
//! │  │  PostgreSQL (GamificationRepository)                     ││
//! │  └─────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// 라이브러리에서 가져오기
use gamification_api::{
    clock::{Clock, SystemClock},
    db::GamificationRepository,
    routes,
    services::{
        AchievementTracker, ActivityDispatcher, ChallengeTracker, DailyTaskTracker, EventService,
        LeaderboardQuery, LevelTracker, PointsLedger, RewardDispatcher, StreakTracker,
        TitleService,
    },
    AppState, Config, Database,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 환경변수 로드
    dotenvy::dotenv().ok();

    // 로깅 초기화
    // RUST_LOG=debug,sqlx=warn 형태로 레벨 제어 가능
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "gamification_api=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Starting Gamification API Server");

    // 설정 로드
    let config = Config::from_env()?;
    tracing::info!("📋 Configuration loaded");

    // 데이터베이스 연결
    let db = Arc::new(Database::connect(&config.database_url).await?);
    tracing::info!("🗄️  Database connected");

    // 마이그레이션 실행
    db.run_migrations().await?;
    tracing::info!("📦 Migrations completed");

    // 서비스 조립 (의존 순서: 원장 → 디스패처 → 트래커 → 진입점)
    let repo: Arc<dyn GamificationRepository> = db.clone();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let points = Arc::new(PointsLedger::new(repo.clone(), clock.clone()));
    let rewards = Arc::new(RewardDispatcher::new(
        repo.clone(),
        points.clone(),
        clock.clone(),
    ));
    let achievements = Arc::new(AchievementTracker::new(
        repo.clone(),
        points.clone(),
        clock.clone(),
    ));
    let challenges = Arc::new(ChallengeTracker::new(
        repo.clone(),
        rewards.clone(),
        clock.clone(),
    ));
    let daily_tasks = Arc::new(DailyTaskTracker::new(
        repo.clone(),
        points.clone(),
        clock.clone(),
    ));
    let streaks = Arc::new(StreakTracker::new(
        repo.clone(),
        points.clone(),
        clock.clone(),
    ));
    let levels = Arc::new(LevelTracker::new(
        repo.clone(),
        rewards.clone(),
        clock.clone(),
    ));
    let events = Arc::new(EventService::new(
        repo.clone(),
        challenges.clone(),
        rewards.clone(),
        clock.clone(),
    ));
    let dispatcher = Arc::new(ActivityDispatcher::new(
        repo.clone(),
        achievements.clone(),
        challenges.clone(),
        daily_tasks.clone(),
        streaks.clone(),
        levels.clone(),
        events.clone(),
        clock.clone(),
    ));
    let titles = Arc::new(TitleService::new(repo.clone()));
    let leaderboards = Arc::new(LeaderboardQuery::new(repo.clone(), clock.clone()));
    tracing::info!("🎮 Progression services assembled");

    // 앱 상태 구성
    let state = AppState {
        db,
        dispatcher,
        achievements,
        challenges,
        daily_tasks,
        streaks,
        levels,
        points,
        events,
        titles,
        leaderboards,
        config: Arc::new(config.clone()),
    };

    // 라우터 구성
    let app = create_router(state);

    // 서버 시작
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🌐 Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// 라우터 생성
///
/// # Route Structure
///
/// ```text
/// GET  /health                                      - 서버 상태 확인
///
/// POST /activity                                    - 활동 기록 (팬아웃 진입점)
///
/// GET  /achievements                                - 업적 카탈로그
/// GET  /users/:user_id/achievements                 - 획득 업적
/// GET  /users/:user_id/achievements/stats           - 업적 통계
///
/// GET  /challenges                                  - 챌린지 카탈로그
/// GET  /users/:user_id/challenges                   - 참여 챌린지
/// POST /users/:user_id/challenges/:challenge_id/join- 챌린지 참여
///
/// GET  /events/active                               - 진행 중 이벤트
/// GET  /events/upcoming                             - 예정 이벤트
/// GET  /users/:user_id/events                       - 이벤트 참여 목록
/// POST /users/:user_id/events/:event_id/join        - 이벤트 참여
///
/// GET  /levels                                      - 레벨 정의
/// GET  /users/:user_id/level                        - 레벨 상태
/// GET  /users/:user_id/streaks                      - 스트릭 상태
/// GET  /users/:user_id/daily-tasks                  - 오늘의 과제
/// GET  /users/:user_id/activity                     - 활동 피드
/// GET  /users/:user_id/titles                       - 획득 칭호
/// POST /users/:user_id/titles/:title_id/activate    - 칭호 활성화
///
/// GET  /points/config                               - 포인트 정책
/// GET  /users/:user_id/points/balance               - 잔액
/// GET  /users/:user_id/points/transactions          - 트랜잭션 이력
/// GET  /rewards                                     - 리워드 카탈로그
/// GET  /users/:user_id/rewards                      - 받은 리워드
/// POST /users/:user_id/rewards/:reward_id/redeem    - 리워드 교환
///
/// GET  /leaderboards                                - 리더보드 목록
/// GET  /leaderboards/:leaderboard_id/entries        - 랭킹
/// GET  /leaderboards/:leaderboard_id/rank/:user_id  - 내 순위
/// ```
fn create_router(state: AppState) -> Router {
    // CORS 설정
    // 프로덕션에서는 특정 도메인만 허용
    // 개발 환경에서는 localhost 허용

    let cors = if state.config.is_production() {
        // 프로덕션: 특정 도메인만 허용 (환경변수로 설정)
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "https://yourdomain.com".to_string());
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        // 개발: localhost 허용
        CorsLayer::new()
            .allow_origin([
                "http://localhost:5173".parse().unwrap(),  // Vite dev server
                "http://localhost:3000".parse().unwrap(),  // Alternative
                "http://127.0.0.1:5173".parse().unwrap(),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))

        // Activity ingestion
        .route("/activity", post(routes::activity::record_activity))

        // Achievements
        .route("/achievements", get(routes::achievements::list_achievements))
        .route("/users/:user_id/achievements", get(routes::achievements::get_user_achievements))
        .route("/users/:user_id/achievements/stats", get(routes::achievements::get_achievement_stats))

        // Challenges
        .route("/challenges", get(routes::challenges::list_challenges))
        .route("/users/:user_id/challenges", get(routes::challenges::get_user_challenges))
        .route("/users/:user_id/challenges/:challenge_id/join", post(routes::challenges::join_challenge))

        // Events
        .route("/events/active", get(routes::events::list_active_events))
        .route("/events/upcoming", get(routes::events::list_upcoming_events))
        .route("/users/:user_id/events", get(routes::events::get_user_participations))
        .route("/users/:user_id/events/:event_id/join", post(routes::events::join_event))

        // Profile (level / streaks / daily tasks / titles / feed)
        .route("/levels", get(routes::profile::list_level_definitions))
        .route("/users/:user_id/level", get(routes::profile::get_user_level))
        .route("/users/:user_id/streaks", get(routes::profile::get_user_streaks))
        .route("/users/:user_id/daily-tasks", get(routes::profile::get_daily_tasks))
        .route("/users/:user_id/activity", get(routes::profile::get_activity_feed))
        .route("/users/:user_id/titles", get(routes::profile::get_user_titles))
        .route("/users/:user_id/titles/:title_id/activate", post(routes::profile::activate_title))

        // Points & rewards
        .route("/points/config", get(routes::points::get_points_config))
        .route("/users/:user_id/points/balance", get(routes::points::get_balance))
        .route("/users/:user_id/points/transactions", get(routes::points::get_transactions))
        .route("/rewards", get(routes::points::list_rewards))
        .route("/users/:user_id/rewards", get(routes::points::get_user_rewards))
        .route("/users/:user_id/rewards/:reward_id/redeem", post(routes::points::redeem_reward))

        // Leaderboards
        .route("/leaderboards", get(routes::leaderboards::list_leaderboards))
        .route("/leaderboards/:leaderboard_id/entries", get(routes::leaderboards::get_leaderboard_entries))
        .route("/leaderboards/:leaderboard_id/rank/:user_id", get(routes::leaderboards::get_user_rank))

        // 미들웨어
        .layer(TraceLayer::new_for_http())
        .layer(cors)

        // 상태 주입
        .with_state(state)
}
