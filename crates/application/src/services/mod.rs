mod chat_service;
mod identity;
mod like_service;

#[cfg(test)]
mod test_support;

pub use chat_service::{ChatService, ChatServiceDependencies, RoomSummary};
pub use identity::IdentityResolver;
pub use like_service::{LikeService, LikeServiceDependencies};
