use std::sync::Arc;

use domain::{
    ChatRoom, Message, MessageContent, NewChatRoom, NewMessage, Product, ProductId,
    RepositoryError, RoomId, RoomTriple,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    error::{ApplicationError, ApplicationResult, Resource},
    repository::{ChatRoomRepository, MessageRepository, ProductRepository, UserRepository},
    retry::{retry_async, RetryConfig},
    services::identity::IdentityResolver,
};

/// 房间列表中的一项：房间本身、最后一条消息以及该用户的未读数。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room: ChatRoom,
    pub last_message: Option<Message>,
    pub unread_count: u64,
}

pub struct ChatServiceDependencies {
    pub room_repository: Arc<dyn ChatRoomRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub product_repository: Arc<dyn ProductRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
    // 插入房间遇到唯一约束冲突时重新查询的次数与退避
    pub room_creation_retry: RetryConfig,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
    identities: IdentityResolver,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        let identities = IdentityResolver::new(deps.user_repository.clone());
        Self { deps, identities }
    }

    async fn load_room(&self, room_id: RoomId) -> ApplicationResult<ChatRoom> {
        self.deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found(Resource::Room, room_id))
    }

    async fn load_product(&self, product_id: ProductId) -> ApplicationResult<Product> {
        self.deps
            .product_repository
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found(Resource::Product, product_id))
    }

    /// 按 (买家, 卖家, 商品) 获取房间，不存在时创建。
    ///
    /// 先查后插只是优化，真正的唯一性由存储层的唯一索引保证：
    /// 插入撞上冲突时重新执行整个查找流程，直到读到胜出方写入的那一行。
    ///
    /// 正常竞争下冲突不会暴露给调用方。只有房间在重试窗口内被反复并发删除、
    /// 每次重新查询都读不到胜出行时，才会在重试耗尽后返回 `RoomContended`。
    pub async fn get_or_create_room(
        &self,
        buyer_raw_id: i64,
        seller_raw_id: i64,
        product_id: ProductId,
    ) -> ApplicationResult<ChatRoom> {
        let buyer = self
            .identities
            .resolve_as(buyer_raw_id, Resource::Buyer)
            .await?;
        let seller = self
            .identities
            .resolve_as(seller_raw_id, Resource::Seller)
            .await?;
        let product = self.load_product(product_id).await?;
        let triple = RoomTriple::new(buyer.id, seller.id, product.id);

        let rooms = &self.deps.room_repository;
        let clock = &self.deps.clock;
        let (result, attempts) = retry_async(
            &self.deps.room_creation_retry,
            |err: &RepositoryError| {
                let conflict = err.is_conflict();
                if conflict {
                    warn!(%triple, "聊天室插入冲突，重新查询: {}", err);
                }
                conflict
            },
            || async move {
                if let Some(room) = rooms.find_by_triple(triple).await? {
                    return Ok((room, false));
                }
                let room = rooms.insert(NewChatRoom::new(triple, clock.now())).await?;
                Ok::<_, RepositoryError>((room, true))
            },
        )
        .await;

        match result {
            Ok((room, created)) => {
                if created {
                    info!(room_id = %room.id, %triple, "创建聊天室");
                } else {
                    debug!(room_id = %room.id, attempts, "返回已有聊天室");
                }
                Ok(room)
            }
            Err(RepositoryError::Conflict(reason)) => {
                warn!("聊天室创建在 {} 次尝试后仍然冲突: {}", attempts, reason);
                Err(ApplicationError::RoomContended { triple, attempts })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_room(&self, room_id: RoomId) -> ApplicationResult<ChatRoom> {
        self.load_room(room_id).await
    }

    pub async fn list_rooms_for_user(&self, user_raw_id: i64) -> ApplicationResult<Vec<RoomSummary>> {
        let user = self.identities.resolve(user_raw_id).await?;
        let rooms = self
            .deps
            .room_repository
            .list_by_participant(user.id)
            .await?;

        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let last_message = self.deps.message_repository.latest_in_room(room.id).await?;
            let unread_count = self
                .deps
                .message_repository
                .count_unread(room.id, user.id)
                .await?;
            summaries.push(RoomSummary {
                room,
                last_message,
                unread_count,
            });
        }
        Ok(summaries)
    }

    /// 删除房间，消息随之级联删除。
    pub async fn delete_room(&self, room_id: RoomId) -> ApplicationResult<()> {
        if !self.deps.room_repository.delete(room_id).await? {
            return Err(ApplicationError::not_found(Resource::Room, room_id));
        }
        info!("删除聊天室 {}", room_id);
        Ok(())
    }

    /// 校验顺序：内容非空、房间存在、发送者可解析、发送者是房间参与者。
    ///
    /// 校验之后房间被并发删除时同样返回房间不存在。
    pub async fn send_message(
        &self,
        room_id: RoomId,
        sender_raw_id: i64,
        content: String,
    ) -> ApplicationResult<Message> {
        if content.trim().is_empty() {
            return Err(ApplicationError::EmptyContent);
        }
        let content = MessageContent::new(content)?;
        let room = self.load_room(room_id).await?;
        let sender = self
            .identities
            .resolve_as(sender_raw_id, Resource::Sender)
            .await?;
        if !room.is_participant(sender.id) {
            return Err(ApplicationError::SenderNotParticipant {
                room: room.id,
                sender: sender.id,
            });
        }

        let message = match self
            .deps
            .message_repository
            .append(NewMessage::new(
                room.id,
                sender.id,
                content,
                self.deps.clock.now(),
            ))
            .await
        {
            Ok(message) => message,
            Err(RepositoryError::NotFound) => {
                return Err(ApplicationError::not_found(Resource::Room, room.id))
            }
            Err(err) => return Err(err.into()),
        };
        debug!("房间 {} 新消息 {}", room.id, message.id);
        Ok(message)
    }

    pub async fn list_messages(&self, room_id: RoomId) -> ApplicationResult<Vec<Message>> {
        let room = self.load_room(room_id).await?;
        Ok(self.deps.message_repository.list_by_room(room.id).await?)
    }

    /// 把房间内他人发送的未读消息标记为已读，返回本次标记的条数。
    /// 重复调用返回 0，阅读者自己的消息不受影响。
    pub async fn mark_read(&self, room_id: RoomId, reader_raw_id: i64) -> ApplicationResult<u64> {
        let room = self
            .deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or(ApplicationError::MarkReadMissingRoom { room: room_id })?;
        let reader = self
            .identities
            .resolve_as(reader_raw_id, Resource::Reader)
            .await?;
        let updated = self
            .deps
            .message_repository
            .mark_read_except(room.id, reader.id)
            .await?;
        debug!(room_id = %room.id, reader_id = %reader.id, updated, "标记消息已读");
        Ok(updated)
    }

    pub async fn unread_count(
        &self,
        room_id: RoomId,
        participant_raw_id: i64,
    ) -> ApplicationResult<u64> {
        let room = self.load_room(room_id).await?;
        let participant = self
            .identities
            .resolve_as(participant_raw_id, Resource::Reader)
            .await?;
        Ok(self
            .deps
            .message_repository
            .count_unread(room.id, participant.id)
            .await?)
    }
}
