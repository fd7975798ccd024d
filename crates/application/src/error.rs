use std::fmt;

use domain::{DomainError, ProductId, RepositoryError, RoomId, RoomTriple, UserId};
use thiserror::Error;

/// 调用方按此分类把错误翻译成传输层响应。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidState,
    InvalidInput,
    DependencyFailure,
}

/// 未找到的实体，以及它在当前操作中扮演的角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Buyer,
    Seller,
    Sender,
    Reader,
    Product,
    Room,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Sender => "sender",
            Self::Reader => "reader",
            Self::Product => "product",
            Self::Room => "room",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: Resource, id: i64 },
    #[error("user {user} already liked product {product}")]
    AlreadyLiked { user: UserId, product: ProductId },
    #[error("user {user} has not liked product {product}")]
    NotLiked { user: UserId, product: ProductId },
    /// 对不存在的房间标记已读。
    #[error("room not found: {room}")]
    MarkReadMissingRoom { room: RoomId },
    #[error("message content cannot be empty")]
    EmptyContent,
    #[error("user {sender} is not a participant of room {room}")]
    SenderNotParticipant { room: RoomId, sender: UserId },
    #[error("room for {triple} still conflicting after {attempts} attempts")]
    RoomContended { triple: RoomTriple, attempts: u32 },
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ApplicationError {
    pub fn not_found(resource: Resource, id: impl Into<i64>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyLiked { .. } | Self::RoomContended { .. } => ErrorKind::Conflict,
            Self::NotLiked { .. } | Self::MarkReadMissingRoom { .. } => ErrorKind::InvalidState,
            Self::EmptyContent | Self::SenderNotParticipant { .. } | Self::Domain(_) => {
                ErrorKind::InvalidInput
            }
            Self::Repository(RepositoryError::Conflict(_)) => ErrorKind::Conflict,
            Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::Repository(_) => ErrorKind::DependencyFailure,
        }
    }
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;
