use std::sync::Arc;

use application::{
    ChatRoomRepository, LikeRepository, MessageRepository, ProductRepository, UserRepository,
};
use async_trait::async_trait;
use domain::{
    CategoryId, ChatRoom, DisplayName, ExternalId, Like, LikeId, Message, MessageContent,
    MessageId, NewChatRoom, NewLike, NewMessage, NewProduct, NewUser, Product, ProductId,
    ProductStatus, RepositoryError, ReputationAdjustment, ReputationChange, ReputationScore,
    RoomId, RoomTriple, Timestamp, User, UserId,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::debug;

use crate::builder::InfrastructureConfig;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::conflict(db_err.message());
        }
        // 引用的行已被并发删除
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::DataCorruption(message.into())
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: i64,
    external_id: i64,
    display_name: String,
    avatar_url: Option<String>,
    reputation_score: f64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let display_name =
            DisplayName::parse(value.display_name).map_err(|err| invalid_data(err.to_string()))?;
        let reputation_score = ReputationScore::new(value.reputation_score)
            .map_err(|err| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId::new(value.id),
            external_id: ExternalId::new(value.external_id),
            display_name,
            avatar_url: value.avatar_url,
            reputation_score,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProductRecord {
    id: i64,
    seller_id: i64,
    category_id: Option<i64>,
    title: String,
    price: i64,
    status: String,
    created_at: Timestamp,
}

impl TryFrom<ProductRecord> for Product {
    type Error = RepositoryError;

    fn try_from(value: ProductRecord) -> Result<Self, Self::Error> {
        let status = value
            .status
            .parse::<ProductStatus>()
            .map_err(|err| invalid_data(err.to_string()))?;

        Ok(Product {
            id: ProductId::new(value.id),
            seller_id: UserId::new(value.seller_id),
            category_id: value.category_id.map(CategoryId::new),
            title: value.title,
            price: value.price,
            status,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RoomRecord {
    id: i64,
    buyer_id: i64,
    seller_id: i64,
    product_id: i64,
    created_at: Timestamp,
}

impl From<RoomRecord> for ChatRoom {
    fn from(value: RoomRecord) -> Self {
        ChatRoom {
            id: RoomId::new(value.id),
            buyer_id: UserId::new(value.buyer_id),
            seller_id: UserId::new(value.seller_id),
            product_id: ProductId::new(value.product_id),
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: i64,
    room_id: i64,
    sender_id: i64,
    content: String,
    is_read: bool,
    created_at: Timestamp,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content =
            MessageContent::new(value.content).map_err(|err| invalid_data(err.to_string()))?;

        Ok(Message {
            id: MessageId::new(value.id),
            room_id: RoomId::new(value.room_id),
            sender_id: UserId::new(value.sender_id),
            content,
            is_read: value.is_read,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LikeRecord {
    id: i64,
    user_id: i64,
    product_id: i64,
    created_at: Timestamp,
}

impl From<LikeRecord> for Like {
    fn from(value: LikeRecord) -> Self {
        Like {
            id: LikeId::new(value.id),
            user_id: UserId::new(value.user_id),
            product_id: ProductId::new(value.product_id),
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReputationRecord {
    previous: f64,
    current: f64,
}

const USER_COLUMNS: &str =
    "id, external_id, display_name, avatar_url, reputation_score, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, room_id, sender_id, content, is_read, created_at";

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO users (external_id, display_name, avatar_url, reputation_score, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user.external_id.value())
            .bind(user.display_name.as_str())
            .bind(user.avatar_url.as_deref())
            .bind(ReputationScore::BASELINE)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_external_id(&self, id: ExternalId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn adjust_reputation(
        &self,
        id: UserId,
        adjustment: ReputationAdjustment,
        at: Timestamp,
    ) -> Result<ReputationChange, RepositoryError> {
        // 行锁下读取旧值并在同一条语句里写回，按 0.1 取整后夹在上下限之间
        let record = sqlx::query_as::<_, ReputationRecord>(
            r#"
            WITH locked AS (
                SELECT id, reputation_score FROM users WHERE id = $1 FOR UPDATE
            )
            UPDATE users u
            SET reputation_score = LEAST(
                    GREATEST(ROUND((locked.reputation_score + $2)::numeric, 1)::float8, $3),
                    $4
                ),
                updated_at = $5
            FROM locked
            WHERE u.id = locked.id
            RETURNING locked.reputation_score AS previous, u.reputation_score AS current
            "#,
        )
        .bind(id.value())
        .bind(adjustment.delta())
        .bind(ReputationScore::BASELINE)
        .bind(ReputationScore::CEILING)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        let previous =
            ReputationScore::new(record.previous).map_err(|err| invalid_data(err.to_string()))?;
        let current =
            ReputationScore::new(record.current).map_err(|err| invalid_data(err.to_string()))?;
        debug!("用户 {} 温度 {} -> {}", id, previous, current);

        Ok(ReputationChange {
            user_id: id,
            previous,
            current,
        })
    }
}

#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let record = sqlx::query_as::<_, ProductRecord>(
            r#"
            INSERT INTO products (seller_id, category_id, title, price, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, seller_id, category_id, title, price, status, created_at
            "#,
        )
        .bind(product.seller_id.value())
        .bind(product.category_id.map(CategoryId::value))
        .bind(&product.title)
        .bind(product.price)
        .bind(ProductStatus::default().as_str())
        .bind(product.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Product::try_from(record)
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let record = sqlx::query_as::<_, ProductRecord>(
            r#"
            SELECT id, seller_id, category_id, title, price, status, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Product::try_from).transpose()
    }
}

#[derive(Clone)]
pub struct PgChatRoomRepository {
    pool: PgPool,
}

impl PgChatRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRoomRepository for PgChatRoomRepository {
    async fn insert(&self, room: NewChatRoom) -> Result<ChatRoom, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(
            r#"
            INSERT INTO chat_rooms (buyer_id, seller_id, product_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, buyer_id, seller_id, product_id, created_at
            "#,
        )
        .bind(room.triple.buyer_id.value())
        .bind(room.triple.seller_id.value())
        .bind(room.triple.product_id.value())
        .bind(room.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.into())
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(
            r#"
            SELECT id, buyer_id, seller_id, product_id, created_at
            FROM chat_rooms
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(ChatRoom::from))
    }

    async fn find_by_triple(
        &self,
        triple: RoomTriple,
    ) -> Result<Option<ChatRoom>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(
            r#"
            SELECT id, buyer_id, seller_id, product_id, created_at
            FROM chat_rooms
            WHERE buyer_id = $1 AND seller_id = $2 AND product_id = $3
            "#,
        )
        .bind(triple.buyer_id.value())
        .bind(triple.seller_id.value())
        .bind(triple.product_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(ChatRoom::from))
    }

    async fn list_by_participant(&self, user_id: UserId) -> Result<Vec<ChatRoom>, RepositoryError> {
        let records = sqlx::query_as::<_, RoomRecord>(
            r#"
            SELECT id, buyer_id, seller_id, product_id, created_at
            FROM chat_rooms
            WHERE buyer_id = $1 OR seller_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(ChatRoom::from).collect())
    }

    async fn delete(&self, id: RoomId) -> Result<bool, RepositoryError> {
        // messages.room_id 上的 ON DELETE CASCADE 负责清理消息
        let result = sqlx::query("DELETE FROM chat_rooms WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn append(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO messages (room_id, sender_id, content, is_read, created_at)
            VALUES ($1, $2, $3, FALSE, $4)
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(message.room_id.value())
            .bind(message.sender_id.value())
            .bind(message.content.as_str())
            .bind(message.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn list_by_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let records = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(room_id.value())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }

    async fn latest_in_room(&self, room_id: RoomId) -> Result<Option<Message>, RepositoryError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let record = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(room_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn mark_read_except(
        &self,
        room_id: RoomId,
        reader: UserId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE room_id = $1 AND sender_id <> $2 AND NOT is_read
            "#,
        )
        .bind(room_id.value())
        .bind(reader.value())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }

    async fn count_unread(
        &self,
        room_id: RoomId,
        participant: UserId,
    ) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE room_id = $1 AND sender_id <> $2 AND NOT is_read
            "#,
        )
        .bind(room_id.value())
        .bind(participant.value())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        u64::try_from(count).map_err(|_| invalid_data(format!("negative unread count {count}")))
    }
}

#[derive(Clone)]
pub struct PgLikeRepository {
    pool: PgPool,
}

impl PgLikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeRepository for PgLikeRepository {
    async fn insert(&self, like: NewLike) -> Result<Like, RepositoryError> {
        let record = sqlx::query_as::<_, LikeRecord>(
            r#"
            INSERT INTO likes (user_id, product_id, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, product_id, created_at
            "#,
        )
        .bind(like.user_id.value())
        .bind(like.product_id.value())
        .bind(like.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.into())
    }

    async fn find(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Like>, RepositoryError> {
        let record = sqlx::query_as::<_, LikeRecord>(
            r#"
            SELECT id, user_id, product_id, created_at
            FROM likes
            WHERE user_id = $1 AND product_id = $2
            "#,
        )
        .bind(user_id.value())
        .bind(product_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Like::from))
    }

    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.value())
            .bind(product_id.value())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Like>, RepositoryError> {
        let records = sqlx::query_as::<_, LikeRecord>(
            r#"
            SELECT id, user_id, product_id, created_at
            FROM likes
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Like::from).collect())
    }
}

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub product_repository: Arc<PgProductRepository>,
    pub room_repository: Arc<PgChatRoomRepository>,
    pub message_repository: Arc<PgMessageRepository>,
    pub like_repository: Arc<PgLikeRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            product_repository: Arc::new(PgProductRepository::new(pool.clone())),
            room_repository: Arc::new(PgChatRoomRepository::new(pool.clone())),
            message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
            like_repository: Arc::new(PgLikeRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(config: &InfrastructureConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await
}
