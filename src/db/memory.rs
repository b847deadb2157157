//! In-Memory Repository (테스트 전용)
//!
//! PostgreSQL 구현과 동일한 계약을 단일 RwLock 아래의 HashMap/Vec으로 구현.
//! 조건부 쓰기(완료 전환, 스트릭 갱신)는 같은 락 안에서 check-and-set으로 처리하므로
//! Postgres의 조건부 UPDATE와 같은 가시적 동작을 가짐.
//!
//! `fail_on`으로 특정 메서드에 실패를 주입해 팬아웃 장애 격리를 검증할 수 있음

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::models::*;
use super::repository::{GamificationRepository, NewPointsTransaction};

#[derive(Default)]
struct Store {
    // 카탈로그
    achievements: Vec<Achievement>,
    challenges: Vec<Challenge>,
    daily_tasks: Vec<DailyTask>,
    level_definitions: Vec<LevelDefinition>,
    events: Vec<GameEvent>,
    reward_items: Vec<RewardItem>,
    points_config: Option<PointsConfig>,
    leaderboards: Vec<Leaderboard>,

    // 사용자 상태
    activity_events: Vec<ActivityEvent>,
    user_achievements: Vec<UserAchievement>,
    user_challenges: Vec<UserChallenge>,
    challenge_activities: Vec<ChallengeActivity>,
    user_daily_tasks: Vec<UserDailyTask>,
    user_streaks: Vec<UserStreak>,
    user_levels: HashMap<Uuid, UserLevel>,
    user_titles: Vec<UserTitle>,
    user_features: Vec<UserFeature>,
    user_discounts: Vec<UserDiscount>,
    event_participations: Vec<EventParticipation>,
    points_transactions: Vec<PointsTransaction>,
    redemptions: Vec<Redemption>,
}

pub struct MemoryRepository {
    store: RwLock<Store>,
    failing: RwLock<HashSet<&'static str>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// 지정한 메서드가 호출될 때 에러를 반환하도록 주입
    pub fn fail_on(&self, method: &'static str) {
        self.failing.write().unwrap().insert(method);
    }

    pub fn clear_failures(&self) {
        self.failing.write().unwrap().clear();
    }

    fn check_fail(&self, method: &'static str) -> Result<()> {
        if self.failing.read().unwrap().contains(method) {
            return Err(anyhow!("injected failure: {}", method));
        }
        Ok(())
    }

    // ============ 시드 헬퍼 ============

    pub fn push_achievement(&self, achievement: Achievement) {
        self.store.write().unwrap().achievements.push(achievement);
    }

    pub fn seed_achievement(
        &self,
        name: &str,
        trigger_type: &str,
        trigger_value: i64,
        points: i64,
    ) -> Achievement {
        let achievement = Achievement {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: format!("{} achievement", name),
            badge_icon: None,
            trigger_type: trigger_type.to_string(),
            trigger_value,
            points,
            is_active: true,
            is_hidden: false,
            created_at: Utc::now(),
        };
        self.push_achievement(achievement.clone());
        achievement
    }

    pub fn push_challenge(&self, challenge: Challenge) {
        self.store.write().unwrap().challenges.push(challenge);
    }

    pub fn seed_challenge(
        &self,
        title: &str,
        requirements: Vec<ChallengeRequirement>,
        rewards: Vec<Reward>,
        is_repeatable: bool,
        cooldown_days: Option<i64>,
    ) -> Challenge {
        let challenge = Challenge {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: format!("{} challenge", title),
            category: None,
            requirements: Json(requirements),
            rewards: Json(rewards),
            is_repeatable,
            cooldown_days,
            is_active: true,
            created_at: Utc::now(),
        };
        self.push_challenge(challenge.clone());
        challenge
    }

    pub fn seed_daily_task(
        &self,
        title: &str,
        action: &str,
        target_count: i64,
        points: i64,
    ) -> DailyTask {
        let task = DailyTask {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: format!("{} task", title),
            action: action.to_string(),
            target_count,
            points,
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.write().unwrap().daily_tasks.push(task.clone());
        task
    }

    pub fn seed_level(
        &self,
        level: i32,
        name: &str,
        points_required: i64,
        rewards: Vec<Reward>,
    ) -> LevelDefinition {
        let definition = LevelDefinition {
            level,
            name: name.to_string(),
            points_required,
            rewards: Json(rewards),
        };
        self.store
            .write()
            .unwrap()
            .level_definitions
            .push(definition.clone());
        definition
    }

    pub fn seed_event(
        &self,
        title: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        challenge_ids: Vec<Uuid>,
        rewards: Vec<Reward>,
    ) -> GameEvent {
        let event = GameEvent {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: format!("{} event", title),
            start_date,
            end_date,
            challenge_ids: Json(challenge_ids),
            rewards: Json(rewards),
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.write().unwrap().events.push(event.clone());
        event
    }

    /// 시드된 이벤트를 같은 id의 수정본으로 교체
    pub fn replace_event(&self, event: GameEvent) {
        let mut store = self.store.write().unwrap();
        if let Some(slot) = store.events.iter_mut().find(|e| e.id == event.id) {
            *slot = event;
        }
    }

    pub fn seed_reward_item(&self, name: &str, points_cost: i64) -> RewardItem {
        let item = RewardItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: format!("{} reward", name),
            points_cost,
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.write().unwrap().reward_items.push(item.clone());
        item
    }

    pub fn set_points_config(&self, config: PointsConfig) {
        self.store.write().unwrap().points_config = Some(config);
    }

    pub fn seed_leaderboard(
        &self,
        name: &str,
        leaderboard_type: &str,
        period: &str,
        category: Option<&str>,
    ) -> Leaderboard {
        let board = Leaderboard {
            id: Uuid::new_v4(),
            name: name.to_string(),
            leaderboard_type: leaderboard_type.to_string(),
            period: period.to_string(),
            category: category.map(|c| c.to_string()),
            start_date: None,
            end_date: None,
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.write().unwrap().leaderboards.push(board.clone());
        board
    }

    /// 시드된 리더보드를 같은 id의 수정본으로 교체 (custom 기간 설정용)
    pub fn replace_leaderboard(&self, board: Leaderboard) {
        let mut store = self.store.write().unwrap();
        if let Some(slot) = store.leaderboards.iter_mut().find(|b| b.id == board.id) {
            *slot = board;
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GamificationRepository for MemoryRepository {
    // ============ Activity Log ============

    async fn insert_activity_event(
        &self,
        user_id: Uuid,
        action: &str,
        target_id: Option<&str>,
        metadata: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<ActivityEvent> {
        self.check_fail("insert_activity_event")?;
        let event = ActivityEvent {
            id: Uuid::new_v4(),
            user_id,
            action: action.to_string(),
            target_id: target_id.map(|t| t.to_string()),
            metadata: Json(metadata),
            created_at: at,
        };
        self.store
            .write()
            .unwrap()
            .activity_events
            .push(event.clone());
        Ok(event)
    }

    async fn count_activities(&self, user_id: Uuid, action: &str) -> Result<i64> {
        let store = self.store.read().unwrap();
        Ok(store
            .activity_events
            .iter()
            .filter(|e| e.user_id == user_id && e.action == action)
            .count() as i64)
    }

    async fn recent_activities(&self, user_id: Uuid, limit: i64) -> Result<Vec<ActivityEvent>> {
        let store = self.store.read().unwrap();
        let mut events: Vec<ActivityEvent> = store
            .activity_events
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        events.reverse();
        events.truncate(limit.max(0) as usize);
        Ok(events)
    }

    // ============ Achievements ============

    async fn list_achievements(&self, include_hidden: bool) -> Result<Vec<Achievement>> {
        let store = self.store.read().unwrap();
        let mut achievements: Vec<Achievement> = store
            .achievements
            .iter()
            .filter(|a| a.is_active && (include_hidden || !a.is_hidden))
            .cloned()
            .collect();
        achievements.sort_by_key(|a| a.trigger_value);
        Ok(achievements)
    }

    async fn achievements_by_trigger(&self, trigger_type: &str) -> Result<Vec<Achievement>> {
        self.check_fail("achievements_by_trigger")?;
        let store = self.store.read().unwrap();
        let mut achievements: Vec<Achievement> = store
            .achievements
            .iter()
            .filter(|a| a.is_active && a.trigger_type == trigger_type)
            .cloned()
            .collect();
        achievements.sort_by_key(|a| a.trigger_value);
        Ok(achievements)
    }

    async fn get_achievement(&self, id: Uuid) -> Result<Option<Achievement>> {
        let store = self.store.read().unwrap();
        Ok(store.achievements.iter().find(|a| a.id == id).cloned())
    }

    async fn list_user_achievements(&self, user_id: Uuid) -> Result<Vec<UserAchievement>> {
        let store = self.store.read().unwrap();
        let mut rows: Vec<UserAchievement> = store
            .user_achievements
            .iter()
            .filter(|ua| ua.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));
        Ok(rows)
    }

    async fn insert_user_achievement(
        &self,
        user_id: Uuid,
        achievement_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<UserAchievement>> {
        let mut store = self.store.write().unwrap();
        let already_held = store
            .user_achievements
            .iter()
            .any(|ua| ua.user_id == user_id && ua.achievement_id == achievement_id);
        if already_held {
            return Ok(None);
        }
        let row = UserAchievement {
            id: Uuid::new_v4(),
            user_id,
            achievement_id,
            earned_at: at,
        };
        store.user_achievements.push(row.clone());
        Ok(Some(row))
    }

    // ============ Challenges ============

    async fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>> {
        let store = self.store.read().unwrap();
        Ok(store.challenges.iter().find(|c| c.id == id).cloned())
    }

    async fn get_challenges_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Challenge>> {
        let store = self.store.read().unwrap();
        Ok(store
            .challenges
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn list_active_challenges(&self) -> Result<Vec<Challenge>> {
        let store = self.store.read().unwrap();
        Ok(store
            .challenges
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect())
    }

    async fn find_open_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<UserChallenge>> {
        let store = self.store.read().unwrap();
        Ok(store
            .user_challenges
            .iter()
            .find(|uc| uc.user_id == user_id && uc.challenge_id == challenge_id && !uc.is_completed)
            .cloned())
    }

    async fn find_latest_completed_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<UserChallenge>> {
        let store = self.store.read().unwrap();
        Ok(store
            .user_challenges
            .iter()
            .filter(|uc| uc.user_id == user_id && uc.challenge_id == challenge_id && uc.is_completed)
            .max_by_key(|uc| uc.completed_at)
            .cloned())
    }

    async fn list_open_user_challenges(&self, user_id: Uuid) -> Result<Vec<UserChallenge>> {
        self.check_fail("list_open_user_challenges")?;
        let store = self.store.read().unwrap();
        Ok(store
            .user_challenges
            .iter()
            .filter(|uc| uc.user_id == user_id && !uc.is_completed)
            .cloned()
            .collect())
    }

    async fn list_user_challenges(&self, user_id: Uuid) -> Result<Vec<UserChallenge>> {
        let store = self.store.read().unwrap();
        let mut rows: Vec<UserChallenge> = store
            .user_challenges
            .iter()
            .filter(|uc| uc.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));
        Ok(rows)
    }

    async fn insert_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<UserChallenge> {
        let mut store = self.store.write().unwrap();
        if let Some(open) = store
            .user_challenges
            .iter()
            .find(|uc| uc.user_id == user_id && uc.challenge_id == challenge_id && !uc.is_completed)
        {
            return Ok(open.clone());
        }
        let row = UserChallenge {
            id: Uuid::new_v4(),
            user_id,
            challenge_id,
            progress: 0,
            is_completed: false,
            joined_at: at,
            last_progress_at: None,
            completed_at: None,
        };
        store.user_challenges.push(row.clone());
        Ok(row)
    }

    async fn insert_challenge_activity(
        &self,
        user_challenge_id: Uuid,
        requirement_type: &str,
        action: &str,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<ChallengeActivity> {
        let row = ChallengeActivity {
            id: Uuid::new_v4(),
            user_challenge_id,
            requirement_type: requirement_type.to_string(),
            action: action.to_string(),
            delta,
            created_at: at,
        };
        self.store
            .write()
            .unwrap()
            .challenge_activities
            .push(row.clone());
        Ok(row)
    }

    async fn list_challenge_activities(
        &self,
        user_challenge_id: Uuid,
    ) -> Result<Vec<ChallengeActivity>> {
        let store = self.store.read().unwrap();
        Ok(store
            .challenge_activities
            .iter()
            .filter(|ca| ca.user_challenge_id == user_challenge_id)
            .cloned()
            .collect())
    }

    async fn update_challenge_progress(
        &self,
        user_challenge_id: Uuid,
        progress: i32,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut store = self.store.write().unwrap();
        if let Some(uc) = store
            .user_challenges
            .iter_mut()
            .find(|uc| uc.id == user_challenge_id)
        {
            uc.progress = progress;
            uc.last_progress_at = Some(at);
        }
        Ok(())
    }

    async fn complete_user_challenge(
        &self,
        user_challenge_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut store = self.store.write().unwrap();
        match store
            .user_challenges
            .iter_mut()
            .find(|uc| uc.id == user_challenge_id && !uc.is_completed)
        {
            Some(uc) => {
                uc.is_completed = true;
                uc.progress = 100;
                uc.completed_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ============ Daily Tasks ============

    async fn list_active_daily_tasks(&self) -> Result<Vec<DailyTask>> {
        self.check_fail("list_active_daily_tasks")?;
        let store = self.store.read().unwrap();
        Ok(store
            .daily_tasks
            .iter()
            .filter(|t| t.is_active)
            .cloned()
            .collect())
    }

    async fn get_daily_task(&self, id: Uuid) -> Result<Option<DailyTask>> {
        let store = self.store.read().unwrap();
        Ok(store.daily_tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn ensure_user_daily_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        date: NaiveDate,
    ) -> Result<UserDailyTask> {
        let mut store = self.store.write().unwrap();
        if let Some(existing) = store
            .user_daily_tasks
            .iter()
            .find(|t| t.user_id == user_id && t.task_id == task_id && t.task_date == date)
        {
            return Ok(existing.clone());
        }
        let row = UserDailyTask {
            id: Uuid::new_v4(),
            user_id,
            task_id,
            task_date: date,
            progress_count: 0,
            is_completed: false,
            completed_at: None,
        };
        store.user_daily_tasks.push(row.clone());
        Ok(row)
    }

    async fn list_user_daily_tasks(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<UserDailyTask>> {
        let store = self.store.read().unwrap();
        Ok(store
            .user_daily_tasks
            .iter()
            .filter(|t| t.user_id == user_id && t.task_date == date)
            .cloned()
            .collect())
    }

    async fn increment_daily_task(
        &self,
        id: Uuid,
        target_count: i64,
    ) -> Result<Option<UserDailyTask>> {
        let mut store = self.store.write().unwrap();
        match store
            .user_daily_tasks
            .iter_mut()
            .find(|t| t.id == id && !t.is_completed && t.progress_count < target_count)
        {
            Some(t) => {
                t.progress_count += 1;
                Ok(Some(t.clone()))
            }
            None => Ok(None),
        }
    }

    async fn complete_user_daily_task(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut store = self.store.write().unwrap();
        match store
            .user_daily_tasks
            .iter_mut()
            .find(|t| t.id == id && !t.is_completed)
        {
            Some(t) => {
                t.is_completed = true;
                t.completed_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ============ Streaks ============

    async fn find_streak(&self, user_id: Uuid, streak_type: &str) -> Result<Option<UserStreak>> {
        self.check_fail("find_streak")?;
        let store = self.store.read().unwrap();
        Ok(store
            .user_streaks
            .iter()
            .find(|s| s.user_id == user_id && s.streak_type == streak_type)
            .cloned())
    }

    async fn list_user_streaks(&self, user_id: Uuid) -> Result<Vec<UserStreak>> {
        let store = self.store.read().unwrap();
        let mut rows: Vec<UserStreak> = store
            .user_streaks
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.streak_type.cmp(&b.streak_type));
        Ok(rows)
    }

    async fn insert_streak(
        &self,
        user_id: Uuid,
        streak_type: &str,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<UserStreak> {
        let mut store = self.store.write().unwrap();
        if let Some(existing) = store
            .user_streaks
            .iter()
            .find(|s| s.user_id == user_id && s.streak_type == streak_type)
        {
            return Ok(existing.clone());
        }
        let row = UserStreak {
            id: Uuid::new_v4(),
            user_id,
            streak_type: streak_type.to_string(),
            current_count: 1,
            longest_count: 1,
            last_activity_date: Some(date),
            updated_at: at,
        };
        store.user_streaks.push(row.clone());
        Ok(row)
    }

    async fn touch_streak(
        &self,
        id: Uuid,
        observed_date: Option<NaiveDate>,
        current: i64,
        longest: i64,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut store = self.store.write().unwrap();
        match store
            .user_streaks
            .iter_mut()
            .find(|s| s.id == id && s.last_activity_date == observed_date)
        {
            Some(s) => {
                s.current_count = current;
                s.longest_count = longest;
                s.last_activity_date = Some(date);
                s.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ============ Levels ============

    async fn list_level_definitions(&self) -> Result<Vec<LevelDefinition>> {
        self.check_fail("list_level_definitions")?;
        let store = self.store.read().unwrap();
        let mut levels = store.level_definitions.clone();
        levels.sort_by_key(|l| l.level);
        Ok(levels)
    }

    async fn get_user_level(&self, user_id: Uuid) -> Result<Option<UserLevel>> {
        let store = self.store.read().unwrap();
        Ok(store.user_levels.get(&user_id).cloned())
    }

    async fn init_user_level(&self, state: &UserLevel) -> Result<UserLevel> {
        let mut store = self.store.write().unwrap();
        let entry = store
            .user_levels
            .entry(state.user_id)
            .or_insert_with(|| state.clone());
        Ok(entry.clone())
    }

    async fn update_user_level_progress(
        &self,
        user_id: Uuid,
        current_points: i64,
        points_to_next_level: i64,
        progress_percentage: i32,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut store = self.store.write().unwrap();
        if let Some(level) = store.user_levels.get_mut(&user_id) {
            level.current_points = current_points;
            level.points_to_next_level = points_to_next_level;
            level.progress_percentage = progress_percentage;
            level.updated_at = at;
        }
        Ok(())
    }

    async fn advance_user_level(
        &self,
        user_id: Uuid,
        from_level: i32,
        to_level: i32,
        current_points: i64,
        points_to_next_level: i64,
        progress_percentage: i32,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut store = self.store.write().unwrap();
        match store.user_levels.get_mut(&user_id) {
            Some(level) if level.current_level == from_level => {
                level.current_level = to_level;
                level.current_points = current_points;
                level.points_to_next_level = points_to_next_level;
                level.progress_percentage = progress_percentage;
                level.level_unlocked_at = Some(at);
                level.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn lifetime_earned_points(&self, user_id: Uuid) -> Result<i64> {
        let store = self.store.read().unwrap();
        Ok(store
            .points_transactions
            .iter()
            .filter(|tx| {
                tx.user_id == user_id
                    && tx.status == "completed"
                    && (tx.transaction_type == "earned" || tx.transaction_type == "adjusted")
            })
            .map(|tx| tx.amount)
            .sum())
    }

    // ============ Points Ledger ============

    async fn insert_points_transaction(
        &self,
        tx: &NewPointsTransaction,
    ) -> Result<PointsTransaction> {
        self.check_fail("insert_points_transaction")?;
        let row = PointsTransaction {
            id: Uuid::new_v4(),
            user_id: tx.user_id,
            amount: tx.amount,
            transaction_type: tx.transaction_type.clone(),
            status: tx.status.clone(),
            source: tx.source.clone(),
            source_id: tx.source_id.clone(),
            description: tx.description.clone(),
            created_at: tx.created_at,
            processed_at: tx.processed_at,
        };
        self.store
            .write()
            .unwrap()
            .points_transactions
            .push(row.clone());
        Ok(row)
    }

    async fn points_summary(&self, user_id: Uuid) -> Result<PointsBalance> {
        let store = self.store.read().unwrap();
        let mut balance = PointsBalance {
            total_earned: 0,
            total_spent: 0,
            total_expired: 0,
            total_adjusted: 0,
            current_balance: 0,
            pending_points: 0,
        };
        for tx in store.points_transactions.iter().filter(|t| t.user_id == user_id) {
            match (tx.transaction_type.as_str(), tx.status.as_str()) {
                ("earned", "completed") => balance.total_earned += tx.amount,
                ("spent", "completed") => balance.total_spent += tx.amount,
                ("expired", "completed") => balance.total_expired += tx.amount,
                ("adjusted", "completed") => balance.total_adjusted += tx.amount,
                ("earned", "pending") => balance.pending_points += tx.amount,
                _ => {}
            }
        }
        balance.current_balance = balance.total_earned + balance.total_adjusted
            - balance.total_spent
            - balance.total_expired;
        Ok(balance)
    }

    async fn list_points_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PointsTransaction>, i64)> {
        let store = self.store.read().unwrap();
        let mut rows: Vec<PointsTransaction> = store
            .points_transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        let total = rows.len() as i64;
        rows.reverse();
        let page: Vec<PointsTransaction> = rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn get_points_config(&self) -> Result<Option<PointsConfig>> {
        let store = self.store.read().unwrap();
        Ok(store.points_config.clone())
    }

    // ============ Redeemable Rewards ============

    async fn list_reward_items(&self) -> Result<Vec<RewardItem>> {
        let store = self.store.read().unwrap();
        let mut items: Vec<RewardItem> = store
            .reward_items
            .iter()
            .filter(|i| i.is_active)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.points_cost);
        Ok(items)
    }

    async fn get_reward_item(&self, id: Uuid) -> Result<Option<RewardItem>> {
        let store = self.store.read().unwrap();
        Ok(store.reward_items.iter().find(|i| i.id == id).cloned())
    }

    async fn insert_redemption(
        &self,
        user_id: Uuid,
        reward_id: Uuid,
        points_spent: i64,
        at: DateTime<Utc>,
    ) -> Result<Redemption> {
        let row = Redemption {
            id: Uuid::new_v4(),
            user_id,
            reward_id,
            points_spent,
            redeemed_at: at,
        };
        self.store.write().unwrap().redemptions.push(row.clone());
        Ok(row)
    }

    async fn list_user_redemptions(&self, user_id: Uuid) -> Result<Vec<Redemption>> {
        let store = self.store.read().unwrap();
        Ok(store
            .redemptions
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    // ============ Reward Grants ============

    async fn insert_user_title(
        &self,
        user_id: Uuid,
        title: &str,
        source: &str,
        at: DateTime<Utc>,
    ) -> Result<UserTitle> {
        let row = UserTitle {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            source: source.to_string(),
            is_active: false,
            earned_at: at,
        };
        self.store.write().unwrap().user_titles.push(row.clone());
        Ok(row)
    }

    async fn list_user_titles(&self, user_id: Uuid) -> Result<Vec<UserTitle>> {
        let store = self.store.read().unwrap();
        Ok(store
            .user_titles
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn deactivate_user_titles(&self, user_id: Uuid) -> Result<()> {
        let mut store = self.store.write().unwrap();
        for title in store.user_titles.iter_mut().filter(|t| t.user_id == user_id) {
            title.is_active = false;
        }
        Ok(())
    }

    async fn activate_user_title(&self, user_id: Uuid, title_id: Uuid) -> Result<bool> {
        let mut store = self.store.write().unwrap();
        match store
            .user_titles
            .iter_mut()
            .find(|t| t.id == title_id && t.user_id == user_id)
        {
            Some(title) => {
                title.is_active = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_user_feature(
        &self,
        user_id: Uuid,
        feature_key: &str,
        metadata: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<UserFeature> {
        let row = UserFeature {
            id: Uuid::new_v4(),
            user_id,
            feature_key: feature_key.to_string(),
            metadata: metadata.map(Json),
            granted_at: at,
        };
        self.store.write().unwrap().user_features.push(row.clone());
        Ok(row)
    }

    async fn list_user_features(&self, user_id: Uuid) -> Result<Vec<UserFeature>> {
        let store = self.store.read().unwrap();
        Ok(store
            .user_features
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_user_discount(
        &self,
        user_id: Uuid,
        percentage: i32,
        code: &str,
        expires_at: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<UserDiscount> {
        let row = UserDiscount {
            id: Uuid::new_v4(),
            user_id,
            percentage,
            code: code.to_string(),
            expires_at,
            is_used: false,
            created_at: at,
        };
        self.store.write().unwrap().user_discounts.push(row.clone());
        Ok(row)
    }

    async fn list_user_discounts(&self, user_id: Uuid) -> Result<Vec<UserDiscount>> {
        let store = self.store.read().unwrap();
        Ok(store
            .user_discounts
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    // ============ Events ============

    async fn list_active_events(&self, now: DateTime<Utc>) -> Result<Vec<GameEvent>> {
        let store = self.store.read().unwrap();
        let mut events: Vec<GameEvent> = store
            .events
            .iter()
            .filter(|e| e.is_active && e.start_date <= now && e.end_date >= now)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.end_date);
        Ok(events)
    }

    async fn list_upcoming_events(&self, now: DateTime<Utc>) -> Result<Vec<GameEvent>> {
        let store = self.store.read().unwrap();
        let mut events: Vec<GameEvent> = store
            .events
            .iter()
            .filter(|e| e.is_active && e.start_date > now)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_date);
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<GameEvent>> {
        let store = self.store.read().unwrap();
        Ok(store.events.iter().find(|e| e.id == id).cloned())
    }

    async fn find_event_participation(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<EventParticipation>> {
        let store = self.store.read().unwrap();
        Ok(store
            .event_participations
            .iter()
            .find(|p| p.user_id == user_id && p.event_id == event_id)
            .cloned())
    }

    async fn list_user_participations(&self, user_id: Uuid) -> Result<Vec<EventParticipation>> {
        let store = self.store.read().unwrap();
        Ok(store
            .event_participations
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_event_participation(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<EventParticipation> {
        let mut store = self.store.write().unwrap();
        if let Some(existing) = store
            .event_participations
            .iter()
            .find(|p| p.user_id == user_id && p.event_id == event_id)
        {
            return Ok(existing.clone());
        }
        let row = EventParticipation {
            id: Uuid::new_v4(),
            user_id,
            event_id,
            points_earned: 0,
            challenges_completed: 0,
            rewards_claimed: false,
            joined_at: at,
        };
        store.event_participations.push(row.clone());
        Ok(row)
    }

    async fn add_event_progress(
        &self,
        participation_id: Uuid,
        points_delta: i64,
        challenges_delta: i64,
    ) -> Result<()> {
        let mut store = self.store.write().unwrap();
        if let Some(p) = store
            .event_participations
            .iter_mut()
            .find(|p| p.id == participation_id)
        {
            p.points_earned += points_delta;
            p.challenges_completed += challenges_delta;
        }
        Ok(())
    }

    async fn claim_event_rewards(&self, participation_id: Uuid) -> Result<bool> {
        let mut store = self.store.write().unwrap();
        match store
            .event_participations
            .iter_mut()
            .find(|p| p.id == participation_id && !p.rewards_claimed)
        {
            Some(p) => {
                p.rewards_claimed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ============ Leaderboards ============

    async fn list_leaderboards(&self) -> Result<Vec<Leaderboard>> {
        let store = self.store.read().unwrap();
        Ok(store
            .leaderboards
            .iter()
            .filter(|b| b.is_active)
            .cloned()
            .collect())
    }

    async fn get_leaderboard(&self, id: Uuid) -> Result<Option<Leaderboard>> {
        let store = self.store.read().unwrap();
        Ok(store.leaderboards.iter().find(|b| b.id == id).cloned())
    }

    async fn points_scores(
        &self,
        category: Option<&str>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScoreRow>> {
        let store = self.store.read().unwrap();
        let mut scores: HashMap<Uuid, i64> = HashMap::new();
        for tx in store.points_transactions.iter() {
            if tx.status != "completed" {
                continue;
            }
            if tx.transaction_type != "earned" && tx.transaction_type != "adjusted" {
                continue;
            }
            if let Some(cat) = category {
                if tx.source != cat {
                    continue;
                }
            }
            if let Some(since) = since {
                if tx.created_at < since {
                    continue;
                }
            }
            if let Some(until) = until {
                if tx.created_at > until {
                    continue;
                }
            }
            *scores.entry(tx.user_id).or_insert(0) += tx.amount;
        }
        Ok(rank_rows(scores, limit, offset))
    }

    async fn achievement_scores(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScoreRow>> {
        let store = self.store.read().unwrap();
        let mut scores: HashMap<Uuid, i64> = HashMap::new();
        for ua in store.user_achievements.iter() {
            if let Some(since) = since {
                if ua.earned_at < since {
                    continue;
                }
            }
            if let Some(until) = until {
                if ua.earned_at > until {
                    continue;
                }
            }
            *scores.entry(ua.user_id).or_insert(0) += 1;
        }
        Ok(rank_rows(scores, limit, offset))
    }

    async fn challenge_scores(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScoreRow>> {
        let store = self.store.read().unwrap();
        let mut scores: HashMap<Uuid, i64> = HashMap::new();
        for uc in store.user_challenges.iter().filter(|uc| uc.is_completed) {
            let completed_at = match uc.completed_at {
                Some(at) => at,
                None => continue,
            };
            if let Some(since) = since {
                if completed_at < since {
                    continue;
                }
            }
            if let Some(until) = until {
                if completed_at > until {
                    continue;
                }
            }
            *scores.entry(uc.user_id).or_insert(0) += 1;
        }
        Ok(rank_rows(scores, limit, offset))
    }
}

/// 점수 내림차순 → user_id 오름차순 정렬 후 페이지 절단 (SQL과 동일한 순서 규칙)
fn rank_rows(scores: HashMap<Uuid, i64>, limit: i64, offset: i64) -> Vec<ScoreRow> {
    let mut rows: Vec<ScoreRow> = scores
        .into_iter()
        .map(|(user_id, score)| ScoreRow { user_id, score })
        .collect();
    rows.sort_by(|a, b| b.score.cmp(&a.score).then(a.user_id.cmp(&b.user_id)));
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}
