use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value_objects::{ProductId, RoomId, Timestamp, UserId};

/// 聊天室的唯一键：同一买家、卖家、商品组合最多只有一个聊天室。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTriple {
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub product_id: ProductId,
}

impl RoomTriple {
    pub fn new(buyer_id: UserId, seller_id: UserId, product_id: ProductId) -> Self {
        Self {
            buyer_id,
            seller_id,
            product_id,
        }
    }
}

impl fmt::Display for RoomTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "buyer {}, seller {}, product {}",
            self.buyer_id, self.seller_id, self.product_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: RoomId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub product_id: ProductId,
    pub created_at: Timestamp,
}

impl ChatRoom {
    pub fn triple(&self) -> RoomTriple {
        RoomTriple::new(self.buyer_id, self.seller_id, self.product_id)
    }

    /// 只有买家和卖家可以在房间里发言。
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatRoom {
    pub triple: RoomTriple,
    pub created_at: Timestamp,
}

impl NewChatRoom {
    pub fn new(triple: RoomTriple, created_at: Timestamp) -> Self {
        Self { triple, created_at }
    }

    pub fn into_room(self, id: RoomId) -> ChatRoom {
        ChatRoom {
            id,
            buyer_id: self.triple.buyer_id,
            seller_id: self.triple.seller_id,
            product_id: self.triple.product_id,
            created_at: self.created_at,
        }
    }
}
