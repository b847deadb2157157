//! Database Models
//!
//! Data models for the progression engine: reward catalogs, per-user
//! progression state, the append-only points ledger and the activity log.
//!
//! JSONB 컬럼 (requirements, rewards, metadata)은 `sqlx::types::Json`으로 매핑

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

// ============ Reward Payloads (JSONB) ============

/// 보상 정의 (닫힌 합 타입)
///
/// 카탈로그 행(챌린지/레벨/이벤트)의 rewards JSONB 배열에 저장됨.
/// serde tag 방식은 웹소켓 메시지 같은 폴리모픽 페이로드의 표준 직렬화 방식
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reward {
    /// 포인트 적립
    Points { amount: i64 },
    /// 업적 배지 부여 (업적 카탈로그 참조)
    Badge { achievement_id: Uuid },
    /// 칭호 부여 (비활성 상태로 지급)
    Title { name: String },
    /// 기능 해금
    FeatureUnlock {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    /// 할인 쿠폰 (30일 유효)
    Discount { percentage: i32 },
}

/// 챌린지 요구사항 (requirements JSONB 배열의 원소)
///
/// 활동 매칭 규칙: action이 일치하고, target_id가 지정된 경우 그것까지 일치해야 함
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeRequirement {
    /// 요구사항 종류 (booking, review, forum_post 등 분류용)
    pub requirement_type: String,

    /// 매칭할 활동 액션
    pub action: String,

    /// 달성에 필요한 횟수
    pub count: i64,

    /// 특정 대상으로 제한 (예: 특정 카테고리 id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

// ============ Catalogs ============

/// 업적 카탈로그
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Achievement {
    pub id: Uuid,
    pub name: String,
    pub description: String,

    /// 배지 아이콘 식별자 (클라이언트 렌더링용)
    pub badge_icon: Option<String>,

    /// 트리거 종류
    /// - signup, profile_completion, verification
    /// - booking_count, referral_count, review_count, forum_posts
    /// - login_streak, points_earned
    pub trigger_type: String,

    /// 트리거 임계값 (예: booking_count 10 → 예약 10회)
    pub trigger_value: i64,

    /// 달성 시 지급 포인트
    pub points: i64,

    pub is_active: bool,

    /// 숨김 업적 (달성 전까지 목록에 노출 안 함)
    pub is_hidden: bool,

    pub created_at: DateTime<Utc>,
}

/// 챌린지 카탈로그
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Option<String>,

    /// 요구사항 목록 (순서 보존, 진행률은 요구사항별 충족률의 평균)
    pub requirements: Json<Vec<ChallengeRequirement>>,

    /// 완료 보상 목록
    pub rewards: Json<Vec<Reward>>,

    /// 반복 가능 여부 (false면 1회성)
    pub is_repeatable: bool,

    /// 반복 챌린지의 재참여 대기일
    pub cooldown_days: Option<i64>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    /// 이 챌린지의 포인트 보상 합계 (이벤트 참여 집계용)
    pub fn points_value(&self) -> i64 {
        self.rewards
            .iter()
            .map(|r| match r {
                Reward::Points { amount } => *amount,
                _ => 0,
            })
            .sum()
    }
}

/// 일일 과제 카탈로그
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyTask {
    pub id: Uuid,
    pub title: String,
    pub description: String,

    /// 매칭할 활동 액션
    pub action: String,

    /// 하루 목표 횟수
    pub target_count: i64,

    /// 완료 시 지급 포인트
    pub points: i64,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// 레벨 정의 카탈로그
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LevelDefinition {
    /// 레벨 번호 (1부터 시작, 연속)
    pub level: i32,

    pub name: String,

    /// 이 레벨 진입에 필요한 누적 포인트
    pub points_required: i64,

    /// 레벨 도달 보상
    pub rewards: Json<Vec<Reward>>,
}

/// 기간 한정 이벤트
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GameEvent {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    /// 이벤트에 묶인 챌린지 목록
    pub challenge_ids: Json<Vec<Uuid>>,

    /// 전 챌린지 완료 시 보상
    pub rewards: Json<Vec<Reward>>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// 포인트로 교환 가능한 리워드 카탈로그
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RewardItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub points_cost: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// 포인트 정책 설정 (단일 행)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PointsConfig {
    pub welcome_points: i64,
    pub referral_points: i64,
    pub verification_points: i64,
    pub daily_login_points: i64,
    pub booking_completion_points: i64,
    pub review_points: i64,
    pub profile_completion_points: i64,

    /// 리워드 교환 최소 보유 포인트
    pub min_points_for_redemption: i64,

    pub points_expiration_days: i64,
}

impl Default for PointsConfig {
    /// 설정 행이 없을 때 적용되는 기본 정책
    fn default() -> Self {
        Self {
            welcome_points: 100,
            referral_points: 100,
            verification_points: 200,
            daily_login_points: 5,
            booking_completion_points: 50,
            review_points: 25,
            profile_completion_points: 50,
            min_points_for_redemption: 100,
            points_expiration_days: 365,
        }
    }
}

// ============ Per-User Progression State ============

/// 사용자 업적 달성 기록
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserAchievement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub achievement_id: Uuid,
    pub earned_at: DateTime<Utc>,
}

/// 사용자 챌린지 참여 상태
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserChallenge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Uuid,

    /// 진행률 (0..=100)
    pub progress: i32,

    pub is_completed: bool,
    pub joined_at: DateTime<Utc>,
    pub last_progress_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 챌린지 활동 기록 (append-only)
///
/// 진행률은 이 기록의 롤업으로만 계산되고 직접 증가시키지 않음
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChallengeActivity {
    pub id: Uuid,
    pub user_challenge_id: Uuid,

    /// 매칭된 요구사항의 종류/액션 (롤업 시 같은 키로 합산)
    pub requirement_type: String,
    pub action: String,

    /// 기여량 (활동 1건당 1)
    pub delta: i64,

    pub created_at: DateTime<Utc>,
}

/// 사용자 일일 과제 인스턴스 (사용자 × 과제 × 날짜당 1행)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserDailyTask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,

    /// 과제 날짜 (UTC 달력일)
    pub task_date: NaiveDate,

    pub progress_count: i64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 사용자 스트릭 (사용자 × 종류당 1행)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserStreak {
    pub id: Uuid,
    pub user_id: Uuid,

    /// 스트릭 종류: login | forum | activity
    pub streak_type: String,

    pub current_count: i64,
    pub longest_count: i64,

    /// 마지막으로 집계된 활동 날짜 (UTC)
    pub last_activity_date: Option<NaiveDate>,

    pub updated_at: DateTime<Utc>,
}

/// 사용자 레벨 상태 (사용자당 1행)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserLevel {
    pub user_id: Uuid,
    pub current_level: i32,

    /// 생애 적립 포인트 (earned + adjusted)
    pub current_points: i64,

    /// 다음 레벨 진입에 필요한 누적 포인트
    pub points_to_next_level: i64,

    /// 다음 레벨 진행률 (0..=100)
    pub progress_percentage: i32,

    /// 현재 레벨 도달 시각
    pub level_unlocked_at: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

/// 사용자 칭호
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserTitle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,

    /// 획득 경로 (challenge_completion | streak_milestone | level_up | event_completion)
    pub source: String,

    /// 프로필에 표시 중인지 (사용자당 최대 1개 활성)
    pub is_active: bool,

    pub earned_at: DateTime<Utc>,
}

/// 사용자 기능 해금
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserFeature {
    pub id: Uuid,
    pub user_id: Uuid,
    pub feature_key: String,
    pub metadata: Option<Json<serde_json::Value>>,
    pub granted_at: DateTime<Utc>,
}

/// 사용자 할인 쿠폰
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserDiscount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub percentage: i32,

    /// 쿠폰 코드 (형식: 사용자ID 앞 8자 + '-' + 랜덤 6자)
    pub code: String,

    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

/// 이벤트 참여 상태
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventParticipation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub points_earned: i64,
    pub challenges_completed: i64,

    /// 이벤트 완주 보상 수령 여부 (중복 지급 방지 플래그)
    pub rewards_claimed: bool,

    pub joined_at: DateTime<Utc>,
}

// ============ Ledger & Activity Log ============

/// 포인트 원장 트랜잭션 (append-only)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PointsTransaction {
    pub id: Uuid,
    pub user_id: Uuid,

    /// 양수 금액 (방향은 transaction_type이 결정)
    pub amount: i64,

    /// 트랜잭션 종류: earned | spent | expired | adjusted
    pub transaction_type: String,

    /// 상태: pending | completed | cancelled
    pub status: String,

    /// 적립/차감 출처
    /// - achievement, challenge_completion, daily_task, streak_milestone, level_up
    /// - event_completion, reward_redemption, welcome, referral, ...
    pub source: String,

    /// 출처 엔티티 id (예: 챌린지 id)
    pub source_id: Option<String>,

    pub description: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// 파생 포인트 잔액 (원장 롤업, 저장되지 않음)
#[derive(Debug, Clone, Serialize)]
pub struct PointsBalance {
    pub total_earned: i64,
    pub total_spent: i64,
    pub total_expired: i64,
    pub total_adjusted: i64,

    /// earned + adjusted - spent - expired
    pub current_balance: i64,

    /// pending 상태의 적립 합계
    pub pending_points: i64,
}

/// 리워드 교환 기록
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Redemption {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reward_id: Uuid,
    pub points_spent: i64,
    pub redeemed_at: DateTime<Utc>,
}

/// 활동 이벤트 (모든 트래커의 단일 입력, append-only)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub user_id: Uuid,

    /// 활동 액션 (login, booking_completed, forum_post_created 등)
    pub action: String,

    /// 활동 대상 (옵션)
    pub target_id: Option<String>,

    pub metadata: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// ============ Leaderboards ============

/// 리더보드 정의
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Leaderboard {
    pub id: Uuid,
    pub name: String,

    /// 집계 차원: points | achievements | challenges
    pub leaderboard_type: String,

    /// 집계 기간: daily | weekly | monthly | all_time | custom
    pub period: String,

    /// 점수 출처 카테고리 필터 (points 차원에서 source 매칭)
    pub category: Option<String>,

    /// custom 기간의 범위
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// 집계 점수 행 (리더보드 쿼리 결과)
#[derive(Debug, Clone, FromRow)]
pub struct ScoreRow {
    pub user_id: Uuid,
    pub score: i64,
}

/// 순위가 매겨진 리더보드 엔트리
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Uuid,
    pub score: i64,
}
