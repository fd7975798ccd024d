use serde::{Deserialize, Serialize};

use crate::reputation::{ReputationAdjustment, ReputationScore};
use crate::value_objects::{DisplayName, ExternalId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub external_id: ExternalId,
    pub display_name: DisplayName,
    pub avatar_url: Option<String>,
    pub reputation_score: ReputationScore,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn adjust_reputation(&mut self, adjustment: ReputationAdjustment, now: Timestamp) {
        self.reputation_score = adjustment.apply(self.reputation_score);
        self.updated_at = now;
    }
}

/// 首次通过外部身份登录或显式注册时创建的用户，温度固定从基线开始。
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub external_id: ExternalId,
    pub display_name: DisplayName,
    pub avatar_url: Option<String>,
    pub created_at: Timestamp,
}

impl NewUser {
    pub fn new(
        external_id: ExternalId,
        display_name: DisplayName,
        avatar_url: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            external_id,
            display_name,
            avatar_url,
            created_at,
        }
    }

    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            external_id: self.external_id,
            display_name: self.display_name,
            avatar_url: self.avatar_url,
            reputation_score: ReputationScore::baseline(),
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
