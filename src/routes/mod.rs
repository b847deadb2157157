//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `/health` - 헬스 체크
//! - `/activity` - 활동 기록 (팬아웃 진입점)
//! - `/achievements/*` - 업적 카탈로그/통계
//! - `/challenges/*` - 챌린지 조회/참여
//! - `/events/*` - 이벤트 조회/참여
//! - `/points/*`, `/rewards/*` - 포인트 원장/교환
//! - `/users/*` - 프로필 (레벨, 스트릭, 일일 과제, 칭호, 피드)
//! - `/leaderboards/*` - 랭킹

pub mod health;
pub mod activity;
pub mod achievements;
pub mod challenges;
pub mod events;
pub mod points;
pub mod profile;
pub mod leaderboards;
