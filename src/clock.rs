//! Clock Abstraction
//!
//! 스트릭 증가, 일일 과제 생성, 리더보드 기간 계산은 전부 "오늘이 어느 날짜인가"에
//! 의존한다. 시스템 시간을 직접 읽으면 날짜 경계 로직을 테스트할 수 없으므로
//! Clock trait 뒤로 숨긴다.
//!
//! 날짜 경계는 UTC 기준 (per-user timezone은 추후 today() 구현 교체로 대응 가능)

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// 시간 소스 인터페이스
///
/// 서비스 레이어는 `Arc<dyn Clock>`으로 주입받아 사용
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// 오늘 날짜 (UTC 달력 기준)
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// 어제 날짜
    fn yesterday(&self) -> NaiveDate {
        self.today() - Duration::days(1)
    }
}

/// 실제 시스템 시간
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// 테스트용 고정 시계:
