//! Repository Pattern Implementation
//!
//! # Interview Q&A
//!
//! Q: Repository 패턴이란?
//! A: 데이터 접근 로직을 추상화하는 패턴
//!
//!    장점:
//!    - 비즈니스 로직과 데이터 접근 분리
//!    - 테스트 시 인메모리 구현으로 대체 쉬움
//!    - DB 교체 시 영향 최소화
//!
//! Q: 이 코드에서 trait 추상화를 선택한 이유는?
//! A: 진행 규칙(스트릭 날짜 경계, 챌린지 완료, 레벨업)이 엔진의 핵심이라
//!    DB 없이 검증 가능해야 함
//!    - 트래커들은 `Arc<dyn GamificationRepository>`만 의존
//!    - 프로덕션: PostgreSQL 구현 (db/mod.rs의 Database)
//!    - 테스트: 인메모리 구현 (db/memory.rs의 MemoryRepository)
//!
//! Q: 중복 완료(동시 요청) 방지는 어디서 하는가?
//! A: 조건부 쓰기 메서드가 저장소 계층에서 보장
//!    - complete_user_challenge: 미완료 행만 완료로 전환, 전환 여부 반환
//!    - advance_user_level: 관찰한 레벨과 일치할 때만 전진
//!    - touch_streak: 관찰한 last_activity_date와 일치할 때만 갱신
//!    - increment_daily_task: 목표 횟수에서 증가 중단
//!    보상 지급은 전환에 성공한 호출자만 수행

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::models::{
    Achievement, ActivityEvent, Challenge, ChallengeActivity, DailyTask, EventParticipation,
    GameEvent, Leaderboard, LevelDefinition, PointsBalance, PointsConfig, PointsTransaction,
    Redemption, RewardItem, ScoreRow, UserAchievement, UserChallenge, UserDailyTask, UserDiscount,
    UserFeature, UserLevel, UserStreak, UserTitle,
};

/// 포인트 원장 삽입 입력
///
/// id는 저장소가 생성, 나머지는 호출자(서비스 레이어의 시계 포함)가 결정
#[derive(Debug, Clone)]
pub struct NewPointsTransaction {
    pub user_id: Uuid,
    pub amount: i64,
    pub transaction_type: String,
    pub status: String,
    pub source: String,
    pub source_id: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// 진행 엔진의 단일 영속성 인터페이스
///
/// 모든 트래커/서비스가 이 trait만 통해 저장소에 접근
#[async_trait]
pub trait GamificationRepository: Send + Sync {
    // ============ Activity Log ============

    async fn insert_activity_event(
        &self,
        user_id: Uuid,
        action: &str,
        target_id: Option<&str>,
        metadata: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<ActivityEvent>;

    /// 특정 액션의 누적 발생 횟수 (업적 트리거 값 유도용)
    async fn count_activities(&self, user_id: Uuid, action: &str) -> Result<i64>;

    async fn recent_activities(&self, user_id: Uuid, limit: i64) -> Result<Vec<ActivityEvent>>;

    // ============ Achievements ============

    /// 업적 카탈로그 (trigger_value 오름차순)
    async fn list_achievements(&self, include_hidden: bool) -> Result<Vec<Achievement>>;

    /// 활성 업적 중 트리거 종류 일치 (trigger_value 오름차순)
    async fn achievements_by_trigger(&self, trigger_type: &str) -> Result<Vec<Achievement>>;

    async fn get_achievement(&self, id: Uuid) -> Result<Option<Achievement>>;

    async fn list_user_achievements(&self, user_id: Uuid) -> Result<Vec<UserAchievement>>;

    /// 업적 부여. 이미 보유한 경우 None (중복 지급 방지의 기준점)
    async fn insert_user_achievement(
        &self,
        user_id: Uuid,
        achievement_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<UserAchievement>>;

    // ============ Challenges ============

    async fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>>;

    async fn get_challenges_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Challenge>>;

    async fn list_active_challenges(&self) -> Result<Vec<Challenge>>;

    /// 미완료 참여 인스턴스 (반복 챌린지는 동시에 최대 1개 열려 있음)
    async fn find_open_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<UserChallenge>>;

    /// 가장 최근에 완료한 인스턴스 (쿨다운 판정용)
    async fn find_latest_completed_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<UserChallenge>>;

    async fn list_open_user_challenges(&self, user_id: Uuid) -> Result<Vec<UserChallenge>>;

    async fn list_user_challenges(&self, user_id: Uuid) -> Result<Vec<UserChallenge>>;

    async fn insert_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<UserChallenge>;

    async fn insert_challenge_activity(
        &self,
        user_challenge_id: Uuid,
        requirement_type: &str,
        action: &str,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<ChallengeActivity>;

    async fn list_challenge_activities(
        &self,
        user_challenge_id: Uuid,
    ) -> Result<Vec<ChallengeActivity>>;

    async fn update_challenge_progress(
        &self,
        user_challenge_id: Uuid,
        progress: i32,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// 조건부 완료 전환. 이 호출이 전환을 수행했으면 true
    async fn complete_user_challenge(
        &self,
        user_challenge_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    // ============ Daily Tasks ============

    async fn list_active_daily_tasks(&self) -> Result<Vec<DailyTask>>;

    async fn get_daily_task(&self, id: Uuid) -> Result<Option<DailyTask>>;

    /// (사용자, 과제, 날짜) 인스턴스 생성. 이미 있으면 기존 행 반환
    async fn ensure_user_daily_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        date: NaiveDate,
    ) -> Result<UserDailyTask>;

    async fn list_user_daily_tasks(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<UserDailyTask>>;

    /// 목표 횟수 미만에서만 1 증가. 증가가 적용됐으면 갱신된 행 반환
    async fn increment_daily_task(
        &self,
        id: Uuid,
        target_count: i64,
    ) -> Result<Option<UserDailyTask>>;

    /// 조건부 완료 전환. 이 호출이 전환을 수행했으면 true
    async fn complete_user_daily_task(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    // ============ Streaks ============

    async fn find_streak(&self, user_id: Uuid, streak_type: &str) -> Result<Option<UserStreak>>;

    async fn list_user_streaks(&self, user_id: Uuid) -> Result<Vec<UserStreak>>;

    /// 새 스트릭 생성 (count 1). 동시 생성 경합 시 기존 행 반환
    async fn insert_streak(
        &self,
        user_id: Uuid,
        streak_type: &str,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<UserStreak>;

    /// 조건부 스트릭 갱신: 저장된 last_activity_date가 관찰값과 같을 때만 적용.
    /// false면 동시 요청이 먼저 오늘을 집계한 것
    async fn touch_streak(
        &self,
        id: Uuid,
        observed_date: Option<NaiveDate>,
        current: i64,
        longest: i64,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    // ============ Levels ============

    /// 레벨 정의 (level 오름차순)
    async fn list_level_definitions(&self) -> Result<Vec<LevelDefinition>>;

    async fn get_user_level(&self, user_id: Uuid) -> Result<Option<UserLevel>>;

    /// 레벨 1 상태 생성. 동시 생성 경합 시 기존 행 반환
    async fn init_user_level(&self, state: &UserLevel) -> Result<UserLevel>;

    async fn update_user_level_progress(
        &self,
        user_id: Uuid,
        current_points: i64,
        points_to_next_level: i64,
        progress_percentage: i32,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// 조건부 레벨 전진: 저장된 레벨이 from_level일 때만 적용
    #[allow(clippy::too_many_arguments)]
    async fn advance_user_level(
        &self,
        user_id: Uuid,
        from_level: i32,
        to_level: i32,
        current_points: i64,
        points_to_next_level: i64,
        progress_percentage: i32,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// 생애 적립 포인트 (completed 상태의 earned + adjusted 합)
    async fn lifetime_earned_points(&self, user_id: Uuid) -> Result<i64>;

    // ============ Points Ledger ============

    async fn insert_points_transaction(
        &self,
        tx: &NewPointsTransaction,
    ) -> Result<PointsTransaction>;

    /// 원장 롤업 잔액 (저장된 잔액 없음, 매번 파생)
    async fn points_summary(&self, user_id: Uuid) -> Result<PointsBalance>;

    /// 최신순 페이지와 전체 건수
    async fn list_points_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PointsTransaction>, i64)>;

    async fn get_points_config(&self) -> Result<Option<PointsConfig>>;

    // ============ Redeemable Rewards ============

    async fn list_reward_items(&self) -> Result<Vec<RewardItem>>;

    async fn get_reward_item(&self, id: Uuid) -> Result<Option<RewardItem>>;

    async fn insert_redemption(
        &self,
        user_id: Uuid,
        reward_id: Uuid,
        points_spent: i64,
        at: DateTime<Utc>,
    ) -> Result<Redemption>;

    async fn list_user_redemptions(&self, user_id: Uuid) -> Result<Vec<Redemption>>;

    // ============ Reward Grants ============

    async fn insert_user_title(
        &self,
        user_id: Uuid,
        title: &str,
        source: &str,
        at: DateTime<Utc>,
    ) -> Result<UserTitle>;

    async fn list_user_titles(&self, user_id: Uuid) -> Result<Vec<UserTitle>>;

    async fn deactivate_user_titles(&self, user_id: Uuid) -> Result<()>;

    /// 지정 칭호 활성화. 칭호가 해당 사용자 소유가 아니면 false
    async fn activate_user_title(&self, user_id: Uuid, title_id: Uuid) -> Result<bool>;

    async fn insert_user_feature(
        &self,
        user_id: Uuid,
        feature_key: &str,
        metadata: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<UserFeature>;

    async fn list_user_features(&self, user_id: Uuid) -> Result<Vec<UserFeature>>;

    async fn insert_user_discount(
        &self,
        user_id: Uuid,
        percentage: i32,
        code: &str,
        expires_at: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<UserDiscount>;

    async fn list_user_discounts(&self, user_id: Uuid) -> Result<Vec<UserDiscount>>;

    // ============ Events ============

    /// 활성 플래그 + 기간 내 (start <= now <= end)
    async fn list_active_events(&self, now: DateTime<Utc>) -> Result<Vec<GameEvent>>;

    /// 시작 전 이벤트 (start 오름차순)
    async fn list_upcoming_events(&self, now: DateTime<Utc>) -> Result<Vec<GameEvent>>;

    async fn get_event(&self, id: Uuid) -> Result<Option<GameEvent>>;

    async fn find_event_participation(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<EventParticipation>>;

    async fn list_user_participations(&self, user_id: Uuid) -> Result<Vec<EventParticipation>>;

    async fn insert_event_participation(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<EventParticipation>;

    /// 참여 집계 증가 (완료한 챌린지 수, 획득 포인트)
    async fn add_event_progress(
        &self,
        participation_id: Uuid,
        points_delta: i64,
        challenges_delta: i64,
    ) -> Result<()>;

    /// 조건부 보상 수령 전환. 이 호출이 전환을 수행했으면 true
    async fn claim_event_rewards(&self, participation_id: Uuid) -> Result<bool>;

    // ============ Leaderboards ============

    async fn list_leaderboards(&self) -> Result<Vec<Leaderboard>>;

    async fn get_leaderboard(&self, id: Uuid) -> Result<Option<Leaderboard>>;

    /// 기간 내 completed 적립(earned/adjusted) 합계, 점수 내림차순 → user_id 오름차순
    async fn points_scores(
        &self,
        category: Option<&str>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScoreRow>>;

    /// 기간 내 업적 달성 수
    async fn achievement_scores(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScoreRow>>;

    /// 기간 내 챌린지 완료 수
    async fn challenge_scores(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScoreRow>>;
}

// PostgreSQL 구현은 db/mod.rs의 Database 구조체에 있음
// 인메모리 구현은 db/memory.rs의 MemoryRepository에 있음 (테스트 전용)
