//! 内存存储实现（用于测试和本地运行）
//!
//! 所有仓储共享一把写锁，唯一约束与级联删除在锁内检查，
//! 语义与 PostgreSQL 实现保持一致。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    ChatRoom, ExternalId, Like, LikeId, Message, MessageId, NewChatRoom, NewLike, NewMessage,
    NewProduct, NewUser, Product, ProductId, RepositoryError, ReputationAdjustment,
    ReputationChange, RoomId, RoomTriple, Timestamp, User, UserId,
};
use tokio::sync::RwLock;

use crate::repository::{
    ChatRoomRepository, LikeRepository, MessageRepository, ProductRepository, UserRepository,
};

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
    rooms: BTreeMap<RoomId, ChatRoom>,
    messages: BTreeMap<MessageId, Message>,
    likes: BTreeMap<LikeId, Like>,
    sequence: i64,
}

impl MemoryState {
    // 所有表共用一个自增序列，与 BIGSERIAL 一样只保证递增
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }
}

type SharedState = Arc<RwLock<MemoryState>>;

#[derive(Clone)]
pub struct MemoryUserRepository {
    state: SharedState,
}

#[derive(Clone)]
pub struct MemoryProductRepository {
    state: SharedState,
}

#[derive(Clone)]
pub struct MemoryChatRoomRepository {
    state: SharedState,
}

#[derive(Clone)]
pub struct MemoryMessageRepository {
    state: SharedState,
}

#[derive(Clone)]
pub struct MemoryLikeRepository {
    state: SharedState,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|existing| existing.external_id == user.external_id)
        {
            return Err(RepositoryError::conflict(format!(
                "external id {} already registered",
                user.external_id
            )));
        }
        let id = UserId::new(state.next_id());
        let stored = user.into_user(id);
        state.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_external_id(&self, id: ExternalId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| user.external_id == id)
            .cloned())
    }

    async fn adjust_reputation(
        &self,
        id: UserId,
        adjustment: ReputationAdjustment,
        at: Timestamp,
    ) -> Result<ReputationChange, RepositoryError> {
        let mut state = self.state.write().await;
        let user = state.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        let previous = user.reputation_score;
        user.adjust_reputation(adjustment, at);
        Ok(ReputationChange {
            user_id: id,
            previous,
            current: user.reputation_score,
        })
    }
}

#[async_trait]
impl ProductRepository for MemoryProductRepository {
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&product.seller_id) {
            return Err(RepositoryError::NotFound);
        }
        let id = ProductId::new(state.next_id());
        let stored = product.into_product(id);
        state.products.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }
}

#[async_trait]
impl ChatRoomRepository for MemoryChatRoomRepository {
    async fn insert(&self, room: NewChatRoom) -> Result<ChatRoom, RepositoryError> {
        let mut state = self.state.write().await;
        if state.rooms.values().any(|existing| existing.triple() == room.triple) {
            return Err(RepositoryError::conflict(format!(
                "chat room for {} already exists",
                room.triple
            )));
        }
        let id = RoomId::new(state.next_id());
        let stored = room.into_room(id);
        state.rooms.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        Ok(self.state.read().await.rooms.get(&id).cloned())
    }

    async fn find_by_triple(
        &self,
        triple: RoomTriple,
    ) -> Result<Option<ChatRoom>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .rooms
            .values()
            .find(|room| room.triple() == triple)
            .cloned())
    }

    async fn list_by_participant(&self, user_id: UserId) -> Result<Vec<ChatRoom>, RepositoryError> {
        let state = self.state.read().await;
        let mut rooms: Vec<ChatRoom> = state
            .rooms
            .values()
            .filter(|room| room.is_participant(user_id))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rooms)
    }

    async fn delete(&self, id: RoomId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if state.rooms.remove(&id).is_none() {
            return Ok(false);
        }
        state.messages.retain(|_, message| message.room_id != id);
        Ok(true)
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn append(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.rooms.contains_key(&message.room_id) {
            return Err(RepositoryError::NotFound);
        }
        let id = MessageId::new(state.next_id());
        let stored = message.into_message(id);
        state.messages.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_by_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.read().await;
        let mut messages: Vec<Message> = state
            .messages
            .values()
            .filter(|message| message.room_id == room_id)
            .cloned()
            .collect();
        messages.sort_by_key(Message::position);
        Ok(messages)
    }

    async fn latest_in_room(&self, room_id: RoomId) -> Result<Option<Message>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .values()
            .filter(|message| message.room_id == room_id)
            .max_by_key(|message| message.position())
            .cloned())
    }

    async fn mark_read_except(
        &self,
        room_id: RoomId,
        reader: UserId,
    ) -> Result<u64, RepositoryError> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for message in state.messages.values_mut() {
            if message.room_id == room_id && message.is_unread_for(reader) {
                message.mark_read();
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn count_unread(
        &self,
        room_id: RoomId,
        participant: UserId,
    ) -> Result<u64, RepositoryError> {
        let state = self.state.read().await;
        let count = state
            .messages
            .values()
            .filter(|message| message.room_id == room_id && message.is_unread_for(participant))
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl LikeRepository for MemoryLikeRepository {
    async fn insert(&self, like: NewLike) -> Result<Like, RepositoryError> {
        let mut state = self.state.write().await;
        if state
            .likes
            .values()
            .any(|existing| existing.user_id == like.user_id && existing.product_id == like.product_id)
        {
            return Err(RepositoryError::conflict(format!(
                "user {} already liked product {}",
                like.user_id, like.product_id
            )));
        }
        let id = LikeId::new(state.next_id());
        let stored = like.into_like(id);
        state.likes.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Like>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .likes
            .values()
            .find(|like| like.user_id == user_id && like.product_id == product_id)
            .cloned())
    }

    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let found = state
            .likes
            .iter()
            .find(|(_, like)| like.user_id == user_id && like.product_id == product_id)
            .map(|(id, _)| *id);
        Ok(match found {
            Some(id) => state.likes.remove(&id).is_some(),
            None => false,
        })
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Like>, RepositoryError> {
        let state = self.state.read().await;
        let mut likes: Vec<Like> = state
            .likes
            .values()
            .filter(|like| like.user_id == user_id)
            .cloned()
            .collect();
        likes.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(likes)
    }
}

/// 与 `PgStorage` 对应的内存版仓储集合。
#[derive(Clone)]
pub struct MemoryStorage {
    pub user_repository: Arc<MemoryUserRepository>,
    pub product_repository: Arc<MemoryProductRepository>,
    pub room_repository: Arc<MemoryChatRoomRepository>,
    pub message_repository: Arc<MemoryMessageRepository>,
    pub like_repository: Arc<MemoryLikeRepository>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let state: SharedState = Arc::new(RwLock::new(MemoryState::default()));
        Self {
            user_repository: Arc::new(MemoryUserRepository {
                state: state.clone(),
            }),
            product_repository: Arc::new(MemoryProductRepository {
                state: state.clone(),
            }),
            room_repository: Arc::new(MemoryChatRoomRepository {
                state: state.clone(),
            }),
            message_repository: Arc::new(MemoryMessageRepository {
                state: state.clone(),
            }),
            like_repository: Arc::new(MemoryLikeRepository { state }),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}
