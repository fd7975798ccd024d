//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：身份解析、聊天室登记、消息日志、
//! 已读状态、点赞与卖家温度联动。所有存储访问都通过 `repository` 中的端口完成。

pub mod clock;
pub mod error;
pub mod memory;
pub mod repository;
pub mod retry;
pub mod services;

pub use clock::{Clock, SystemClock};
pub use error::{ApplicationError, ApplicationResult, ErrorKind, Resource};
pub use memory::MemoryStorage;
pub use repository::{
    ChatRoomRepository, LikeRepository, MessageRepository, ProductRepository, UserRepository,
};
pub use retry::{retry_async, Backoff, RetryConfig};
pub use services::{
    ChatService, ChatServiceDependencies, IdentityResolver, LikeService, LikeServiceDependencies,
    RoomSummary,
};
