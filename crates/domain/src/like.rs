use serde::{Deserialize, Serialize};

use crate::value_objects::{LikeId, ProductId, Timestamp, UserId};

/// 点赞关系。每个 (用户, 商品) 至多一条。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: LikeId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLike {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: Timestamp,
}

impl NewLike {
    pub fn new(user_id: UserId, product_id: ProductId, created_at: Timestamp) -> Self {
        Self {
            user_id,
            product_id,
            created_at,
        }
    }

    pub fn into_like(self, id: LikeId) -> Like {
        Like {
            id,
            user_id: self.user_id,
            product_id: self.product_id,
            created_at: self.created_at,
        }
    }
}
