//! Leaderboard Query Service
//!
//! 리더보드는 저장된 점수 테이블이 아니라 원장/달성 기록 위의 읽기 전용 집계.
//! 기간 창은 조회 시점에 UTC로 계산:
//! - daily: 오늘 00:00부터
//! - weekly: 가장 최근 일요일 00:00부터
//! - monthly: 이달 1일 00:00부터
//! - all_time: 제한 없음, custom: 저장된 범위
//!
//! 동점은 user_id 오름차순으로 안정 정렬되므로 페이지가 흔들리지 않음

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{GamificationRepository, Leaderboard, LeaderboardEntry, ScoreRow};
use crate::error::ApiError;

/// 페이지 크기 상한
const MAX_PAGE_SIZE: i64 = 100;

/// 개인 순위 탐색 범위 (이 밖의 순위는 "순위권 밖"으로 응답)
const RANK_SCAN_LIMIT: i64 = 1000;

/// 리더보드 조회 서비스
pub struct LeaderboardQuery {
    repo: Arc<dyn GamificationRepository>,
    clock: Arc<dyn Clock>,
}

impl LeaderboardQuery {
    pub fn new(repo: Arc<dyn GamificationRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn list(&self) -> Result<Vec<Leaderboard>, ApiError> {
        Ok(self.repo.list_leaderboards().await?)
    }

    /// 순위표 한 페이지. rank는 전체 순위 기준 (offset 반영)
    pub async fn entries(
        &self,
        leaderboard_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let board = self.load(leaderboard_id).await?;
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = offset.max(0);

        let rows = self.scores(&board, limit, offset).await?;
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| LeaderboardEntry {
                rank: offset + i as i64 + 1,
                user_id: row.user_id,
                score: row.score,
            })
            .collect())
    }

    /// 특정 사용자의 순위. 상위 1000위 밖이거나 점수가 없으면 None
    pub async fn user_rank(
        &self,
        leaderboard_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<LeaderboardEntry>, ApiError> {
        let board = self.load(leaderboard_id).await?;
        let rows = self.scores(&board, RANK_SCAN_LIMIT, 0).await?;

        Ok(rows.into_iter().enumerate().find_map(|(i, row)| {
            (row.user_id == user_id).then(|| LeaderboardEntry {
                rank: i as i64 + 1,
                user_id: row.user_id,
                score: row.score,
            })
        }))
    }

    async fn load(&self, leaderboard_id: Uuid) -> Result<Leaderboard, ApiError> {
        self.repo
            .get_leaderboard(leaderboard_id)
            .await?
            .filter(|b| b.is_active)
            .ok_or_else(|| ApiError::NotFound("Leaderboard".to_string()))
    }

    async fn scores(
        &self,
        board: &Leaderboard,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScoreRow>, ApiError> {
        let (since, until) = self.window(board);

        let rows = match board.leaderboard_type.as_str() {
            "points" => {
                self.repo
                    .points_scores(board.category.as_deref(), since, until, limit, offset)
                    .await?
            }
            "achievements" => {
                self.repo
                    .achievement_scores(since, until, limit, offset)
                    .await?
            }
            "challenges" => {
                self.repo
                    .challenge_scores(since, until, limit, offset)
                    .await?
            }
            other => {
                return Err(ApiError::ValidationError(format!(
                    "Unknown leaderboard type: {}",
                    other
                )));
            }
        };
        Ok(rows)
    }

    /// 기간 문자열 → (since, until) 창
    fn window(&self, board: &Leaderboard) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let today = self.clock.today();
        match board.period.as_str() {
            "daily" => (Some(start_of_day(today)), None),
            "weekly" => {
                let sunday =
                    today - Duration::days(today.weekday().num_days_from_sunday() as i64);
                (Some(start_of_day(sunday)), None)
            }
            "monthly" => {
                let first = today - Duration::days(today.day() as i64 - 1);
                (Some(start_of_day(first)), None)
            }
            "custom" => (board.start_date, board.end_date),
            // all_time
            _ => (None, None),
        }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
