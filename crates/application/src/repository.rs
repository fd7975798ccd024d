//! 存储端口
//!
//! 所有写操作都必须由存储层保证原子性：唯一约束冲突以
//! `RepositoryError::Conflict` 返回，温度调整必须在一条受行锁保护的语句内完成。

use async_trait::async_trait;
use domain::{
    ChatRoom, ExternalId, Like, Message, NewChatRoom, NewLike, NewMessage, NewProduct, NewUser,
    Product, ProductId, RepositoryError, ReputationAdjustment, ReputationChange, RoomId,
    RoomTriple, Timestamp, User, UserId,
};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    // 外部标识重复时返回 Conflict
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_external_id(&self, id: ExternalId) -> Result<Option<User>, RepositoryError>;

    /// 原子地调整温度并返回调整前后的值；用户不存在时返回 `NotFound`。
    async fn adjust_reputation(
        &self,
        id: UserId,
        adjustment: ReputationAdjustment,
        at: Timestamp,
    ) -> Result<ReputationChange, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError>;
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChatRoomRepository: Send + Sync {
    // 三元组已存在时返回 Conflict，不会覆盖已有房间
    async fn insert(&self, room: NewChatRoom) -> Result<ChatRoom, RepositoryError>;
    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError>;
    async fn find_by_triple(&self, triple: RoomTriple)
        -> Result<Option<ChatRoom>, RepositoryError>;

    // 用户作为买家或卖家参与的房间，最新的在前
    async fn list_by_participant(&self, user_id: UserId) -> Result<Vec<ChatRoom>, RepositoryError>;

    /// 删除房间及其全部消息，返回是否真的删除了记录。
    async fn delete(&self, id: RoomId) -> Result<bool, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn append(&self, message: NewMessage) -> Result<Message, RepositoryError>;

    // 按 (created_at, id) 升序返回整个房间的消息
    async fn list_by_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError>;
    async fn latest_in_room(&self, room_id: RoomId) -> Result<Option<Message>, RepositoryError>;

    /// 把房间内不是 `reader` 发送的未读消息全部标记为已读，返回受影响条数。
    async fn mark_read_except(&self, room_id: RoomId, reader: UserId)
        -> Result<u64, RepositoryError>;
    async fn count_unread(&self, room_id: RoomId, participant: UserId)
        -> Result<u64, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LikeRepository: Send + Sync {
    // (user_id, product_id) 已存在时返回 Conflict
    async fn insert(&self, like: NewLike) -> Result<Like, RepositoryError>;
    async fn find(&self, user_id: UserId, product_id: ProductId)
        -> Result<Option<Like>, RepositoryError>;
    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError>;
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Like>, RepositoryError>;
}
