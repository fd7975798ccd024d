//! 二手交易市场核心领域模型
//!
//! 包含用户、商品、聊天室、消息、点赞等实体，以及信誉分（温度）的计算规则。

pub mod chat_room;
pub mod errors;
pub mod like;
pub mod message;
pub mod product;
pub mod reputation;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use chat_room::{ChatRoom, NewChatRoom, RoomTriple};
pub use errors::{DomainError, RepositoryError};
pub use like::{Like, NewLike};
pub use message::{Message, NewMessage};
pub use product::{NewProduct, Product, ProductStatus};
pub use reputation::{ReputationAdjustment, ReputationChange, ReputationScore};
pub use user::{NewUser, User};
pub use value_objects::{
    CategoryId, DisplayName, ExternalId, LikeId, MessageContent, MessageId, ProductId, RoomId,
    Timestamp, UserId,
};
