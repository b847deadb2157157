//! Daily Task Tracker Service
//!
//! 일일 반복 과제: (사용자, 과제, 날짜) 단위로 하루 1개 인스턴스를 제공하고
//! 활동이 들어올 때마다 목표 횟수까지만 증가시킴.
//!
//! 인스턴스 제공은 지연 방식 — 배치 없이 그날 첫 조회/활동이 슬레이트를 만듦

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{DailyTask, GamificationRepository, UserDailyTask};
use crate::error::ApiError;

use super::points::PointsLedger;

/// 과제 정의 + 오늘의 진행 상태 (대시보드 응답용)
#[derive(Debug, Serialize)]
pub struct DailyTaskStatus {
    pub task: DailyTask,
    pub status: UserDailyTask,
}

/// 일일 과제 트래커
pub struct DailyTaskTracker {
    repo: Arc<dyn GamificationRepository>,
    points: Arc<PointsLedger>,
    clock: Arc<dyn Clock>,
}

impl DailyTaskTracker {
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

    /// 오늘(UTC) 슬레이트 제공. 이미 있으면 기존 인스턴스 유지
    pub async fn ensure_todays_tasks(&self, user_id: Uuid) -> Result<Vec<UserDailyTask>, ApiError> {
        let today = self.clock.today();
        let tasks = self.repo.list_active_daily_tasks().await?;

        let mut instances = Vec::with_capacity(tasks.len());
        for task in tasks {
            instances.push(
                self.repo
                    .ensure_user_daily_task(user_id, task.id, today)
                    .await?,
            );
        }
        Ok(instances)
    }

    /// 활동 1건을 오늘의 매칭 과제에 반영
    ///
    /// 목표 도달 시 조건부 완료 전환에 이긴 호출만 포인트를 지급.
    /// 반환값은 이번 호출로 완료된 인스턴스 목록
    pub async fn on_activity(
        &self,
        user_id: Uuid,
        action: &str,
    ) -> Result<Vec<UserDailyTask>, ApiError> {
        let today = self.clock.today();
        let tasks = self.repo.list_active_daily_tasks().await?;

        let mut completed = Vec::new();
        for task in tasks.iter().filter(|t| t.action == action) {
            let instance = self
                .repo
                .ensure_user_daily_task(user_id, task.id, today)
                .await?;
            if instance.is_completed {
                continue;
            }

            // 목표 미만일 때만 증가 (초과 증가 없음)
            let Some(updated) = self
                .repo
                .increment_daily_task(instance.id, task.target_count)
                .await?
            else {
                continue;
            };

            if updated.progress_count < task.target_count {
                continue;
            }

            let now = self.clock.now();
            if self.repo.complete_user_daily_task(instance.id, now).await? {
                if task.points > 0 {
                    self.points
                        .credit(
                            user_id,
                            task.points,
                            &format!("Daily task completed: {}", task.title),
                            "daily_task",
                            Some(task.id.to_string()),
                        )
                        .await?;
                }

                tracing::info!(
                    user_id = %user_id,
                    task = %task.title,
                    "Daily task completed"
                );

                let mut row = updated.clone();
                row.is_completed = true;
                row.completed_at = Some(now);
                completed.push(row);
            }
        }

        Ok(completed)
    }

    /// 오늘의 과제 목록 (정의 + 진행 상태). 조회만으로도 슬레이트가 제공됨
    pub async fn todays_tasks(&self, user_id: Uuid) -> Result<Vec<DailyTaskStatus>, ApiError> {
        let today = self.clock.today();
        let tasks = self.repo.list_active_daily_tasks().await?;

        let mut out = Vec::with_capacity(tasks.len());
        for task in tasks {
            let status = self
                .repo
                .ensure_user_daily_task(user_id, task.id, today)
                .await?;
            out.push(DailyTaskStatus { task, status });
        }
        Ok(out)
    }
}
