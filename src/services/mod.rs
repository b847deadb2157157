//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `ActivityDispatcher`: 단일 진입점, 다섯 트래커로 팬아웃
//! - `AchievementTracker`: 임계값 기반 1회성 업적
//! - `ChallengeTracker`: 참여형 다중 요구사항 챌린지
//! - `DailyTaskTracker`: 하루 단위 반복 과제
//! - `StreakTracker`: 연속 활동일 + 마일스톤
//! - `LevelTracker`: 생애 포인트 기반 누적 레벨
//! - `RewardDispatcher`: 보상 꾸러미 지급 (포인트/배지/칭호/기능/할인)
//! - `PointsLedger`: 추가 전용 포인트 원장
//! - `EventService`: 기간 한정 이벤트 집계
//! - `TitleService`: 표시 칭호 관리
//! - `LeaderboardQuery`: 기간 창 순위 집계

mod activity;
mod achievements;
mod challenges;
mod daily_tasks;
mod streaks;
mod levels;
mod rewards;
mod points;
mod events;
mod titles;
mod leaderboards;

pub use activity::ActivityDispatcher;
pub use achievements::{AchievementStats, AchievementTracker};
pub use challenges::{ChallengeCompletion, ChallengeTracker};
pub use daily_tasks::{DailyTaskStatus, DailyTaskTracker};
pub use streaks::StreakTracker;
pub use levels::LevelTracker;
pub use rewards::{RewardContext, RewardDispatcher};
pub use points::PointsLedger;
pub use events::EventService;
pub use titles::TitleService;
pub use leaderboards::LeaderboardQuery;
