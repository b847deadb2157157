//! Streak Tracker Service
//!
//! 연속 활동일 추적: 같은 날은 무시, 어제에 이어지면 +1, 끊겼으면 1로 리셋.
//! 날짜 판정은 전부 UTC 달력일 기준.
//!
//! 마일스톤 포인트와 칭호는 이번 호출이 갱신에 성공해 "새 카운트에 정확히
//! 도달"했을 때만 지급 — 같은 날 두 번째 활동은 저장소의 조건부 갱신에서
//! 걸러지므로 중복 지급이 없음

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{GamificationRepository, UserStreak};
use crate::error::ApiError;

use super::points::PointsLedger;

/// 연속일 수 → 마일스톤 포인트
const STREAK_MILESTONES: [(i64, i64); 8] = [
    (3, 5),
    (7, 10),
    (14, 20),
    (30, 50),
    (60, 100),
    (90, 150),
    (180, 300),
    (365, 1000),
];

/// 스트릭 트래커
pub struct StreakTracker {
    repo: Arc<dyn GamificationRepository>,
    points: Arc<PointsLedger>,
    clock: Arc<dyn Clock>,
}

impl StreakTracker {
    pub fn new(
        repo: Arc<dyn GamificationRepository>,
        points: Arc<PointsLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            points,
            clock,
        }
    }

    /// 활동 1건을 해당 종류의 스트릭에 반영
    ///
    /// 단순 조회성 액션(페이지 뷰 등)은 스트릭을 만들지 않으므로 `None`
    pub async fn record_activity(
        &self,
        user_id: Uuid,
        action: &str,
    ) -> Result<Option<UserStreak>, ApiError> {
        let Some(streak_type) = streak_type_for(action) else {
            return Ok(None);
        };

        let today = self.clock.today();
        let now = self.clock.now();

        let Some(streak) = self.repo.find_streak(user_id, streak_type).await? else {
            // 첫 활동: count 1로 시작 (경합 시 저장소가 기존 행을 돌려줌)
            let created = self
                .repo
                .insert_streak(user_id, streak_type, today, now)
                .await?;
            return Ok(Some(created));
        };

        if streak.last_activity_date == Some(today) {
            // 오늘 이미 집계됨
            return Ok(Some(streak));
        }

        let new_count = if streak.last_activity_date == Some(self.clock.yesterday()) {
            streak.current_count + 1
        } else {
            1
        };
        let new_longest = streak.longest_count.max(new_count);

        let touched = self
            .repo
            .touch_streak(
                streak.id,
                streak.last_activity_date,
                new_count,
                new_longest,
                today,
                now,
            )
            .await?;
        if !touched {
            // 동시 요청이 먼저 오늘을 집계함
            return Ok(self.repo.find_streak(user_id, streak_type).await?);
        }

        self.award_milestone(user_id, streak_type, new_count).await?;

        let mut updated = streak;
        updated.current_count = new_count;
        updated.longest_count = new_longest;
        updated.last_activity_date = Some(today);
        updated.updated_at = now;
        Ok(Some(updated))
    }

    pub async fn user_streaks(&self, user_id: Uuid) -> Result<Vec<UserStreak>, ApiError> {
        Ok(self.repo.list_user_streaks(user_id).await?)
    }

    /// 새 카운트가 마일스톤/칭호 임계값에 정확히 도달했을 때만 지급
    async fn award_milestone(
        &self,
        user_id: Uuid,
        streak_type: &str,
        count: i64,
    ) -> Result<(), ApiError> {
        if let Some((_, points)) = STREAK_MILESTONES.iter().find(|(days, _)| *days == count) {
            self.points
                .credit(
                    user_id,
                    *points,
                    &format!("Streak milestone: {} day {} streak", count, streak_type),
                    "streak_milestone",
                    None,
                )
                .await?;

            tracing::info!(
                user_id = %user_id,
                streak_type = %streak_type,
                count = count,
                "Streak milestone reached"
            );
        }

        let rank = match count {
            30 => Some("Enthusiast"),
            90 => Some("Expert"),
            180 => Some("Master"),
            365 => Some("Legend"),
            _ => None,
        };
        if let Some(rank) = rank {
            let prefix = match streak_type {
                "login" => "Loyal",
                "forum" => "Community",
                "activity" => "Dedicated",
                _ => "Consistent",
            };
            self.repo
                .insert_user_title(
                    user_id,
                    &format!("{} {}", prefix, rank),
                    "streak_milestone",
                    self.clock.now(),
                )
                .await?;
        }

        Ok(())
    }
}

/// 액션 → 스트릭 종류
///
/// 로그인과 포럼 활동은 전용 스트릭, 조회성 내비게이션은 제외,
/// 나머지는 범용 활동 스트릭으로 집계
fn streak_type_for(action: &str) -> Option<&'static str> {
    match action {
        "login" => Some("login"),
        "page_view" | "screen_view" | "navigate" => None,
        _ if action.starts_with("forum_") => Some("forum"),
        _ => Some("activity"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::fixed::FixedClock;
    use crate::db::memory::MemoryRepository;

    fn setup() -> (Arc<MemoryRepository>, Arc<FixedClock>, StreakTracker) {
        let repo = Arc::new(MemoryRepository::new());
        let clock = Arc::new(FixedClock::at_str("2024-06-01T09:00:00Z"));
        let points = Arc::new(PointsLedger::new(repo.clone(), clock.clone()));
        let tracker = StreakTracker::new(repo.clone(), points, clock.clone());
        (repo, clock, tracker)
    }

    #[tokio::test]
    async fn test_first_activity_starts_streak_at_one() {
        let (_repo, _clock, tracker) = setup();
        let user = Uuid::new_v4();

        let streak = tracker.record_activity(user, "login").await.unwrap().unwrap();
        assert_eq!(streak.streak_type, "login");
        assert_eq!(streak.current_count, 1);
        assert_eq!(streak.longest_count, 1);
    }

    #[tokio::test]
    async fn test_same_day_activity_is_a_noop() {
        let (_repo, _clock, tracker) = setup();
        let user = Uuid::new_v4();

        tracker.record_activity(user, "login").await.unwrap();
        let second = tracker.record_activity(user, "login").await.unwrap().unwrap();
        assert_eq!(second.current_count, 1);
    }

    #[tokio::test]
    async fn test_consecutive_days_increment() {
        let (_repo, clock, tracker) = setup();
        let user = Uuid::new_v4();

        tracker.record_activity(user, "login").await.unwrap();
        clock.advance_days(1);
        let streak = tracker.record_activity(user, "login").await.unwrap().unwrap();
        assert_eq!(streak.current_count, 2);
        assert_eq!(streak.longest_count, 2);
    }

    #[tokio::test]
    async fn test_gap_resets_but_longest_survives() {
        let (_repo, clock, tracker) = setup();
        let user = Uuid::new_v4();

        tracker.record_activity(user, "login").await.unwrap();
        clock.advance_days(1);
        tracker.record_activity(user, "login").await.unwrap();
        clock.advance_days(1);
        tracker.record_activity(user, "login").await.unwrap();

        // 이틀 공백 후 리셋
        clock.advance_days(3);
        let streak = tracker.record_activity(user, "login").await.unwrap().unwrap();
        assert_eq!(streak.current_count, 1);
        assert_eq!(streak.longest_count, 3);
    }

    #[tokio::test]
    async fn test_milestone_points_at_exact_counts() {
        let (repo, clock, tracker) = setup();
        let user = Uuid::new_v4();

        for _ in 0..3 {
            tracker.record_activity(user, "login").await.unwrap();
            clock.advance_days(1);
        }

        // 3일차 마일스톤: 5포인트, 1회만
        let summary = repo.points_summary(user).await.unwrap();
        assert_eq!(summary.total_earned, 5);
        let txs = repo
            .list_points_transactions(user, 10, 0)
            .await
            .unwrap()
            .0;
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].source, "streak_milestone");
    }

    #[tokio::test]
    async fn test_thirty_day_login_streak_grants_title() {
        let (repo, clock, tracker) = setup();
        let user = Uuid::new_v4();

        for _ in 0..30 {
            tracker.record_activity(user, "login").await.unwrap();
            clock.advance_days(1);
        }

        let titles = repo.list_user_titles(user).await.unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].title, "Loyal Enthusiast");
        assert_eq!(titles[0].source, "streak_milestone");

        // 3/7/14/30일 마일스톤 포인트 합산
        let summary = repo.points_summary(user).await.unwrap();
        assert_eq!(summary.total_earned, 5 + 10 + 20 + 50);
    }

    #[tokio::test]
    async fn test_forum_actions_feed_forum_streak() {
        let (_repo, _clock, tracker) = setup();
        let user = Uuid::new_v4();

        let streak = tracker
            .record_activity(user, "forum_post_created")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(streak.streak_type, "forum");

        let generic = tracker
            .record_activity(user, "review_submitted")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(generic.streak_type, "activity");

        let streaks = tracker.user_streaks(user).await.unwrap();
        assert_eq!(streaks.len(), 2);
    }

    #[tokio::test]
    async fn test_navigation_actions_are_excluded() {
        let (_repo, _clock, tracker) = setup();
        let user = Uuid::new_v4();

        assert!(tracker.record_activity(user, "page_view").await.unwrap().is_none());
        assert!(tracker.record_activity(user, "screen_view").await.unwrap().is_none());
        assert!(tracker.user_streaks(user).await.unwrap().is_empty());
    }
}
