//! Title Service
//!
//! 챌린지/스트릭/레벨/이벤트에서 획득한 칭호 관리.
//! 프로필에 표시되는 활성 칭호는 사용자당 최대 1개

use std::sync::Arc;

use uuid::Uuid;

use crate::db::{GamificationRepository, UserTitle};
use crate::error::ApiError;

pub struct TitleService {
    repo: Arc<dyn GamificationRepository>,
}

impl TitleService {
    pub fn new(repo: Arc<dyn GamificationRepository>) -> Self {
        Self { repo }
    }

    pub async fn user_titles(&self, user_id: Uuid) -> Result<Vec<UserTitle>, ApiError> {
        Ok(self.repo.list_user_titles(user_id).await?)
    }

    /// 표시 칭호 교체: 전부 비활성화한 뒤 지정 칭호만 활성화
    ///
    /// 남의 칭호 id나 없는 id는 `NotFound`
    pub async fn set_active_title(
        &self,
        user_id: Uuid,
        title_id: Uuid,
    ) -> Result<UserTitle, ApiError> {
        let titles = self.repo.list_user_titles(user_id).await?;
        let Some(target) = titles.into_iter().find(|t| t.id == title_id) else {
            return Err(ApiError::NotFound("Title".to_string()));
        };

        self.repo.deactivate_user_titles(user_id).await?;
        if !self.repo.activate_user_title(user_id, title_id).await? {
            return Err(ApiError::NotFound("Title".to_string()));
        }

        tracing::info!(
            user_id = %user_id,
            title = %target.title,
            "Active title changed"
        );

        let mut activated = target;
        activated.is_active = true;
        Ok(activated)
    }
}
