//! 双键身份解析
//!
//! 调用方传入的数字标识可能是内部主键，也可能是外部登录提供方的标识。
//! 所有入口统一先按内部主键查找，找不到再按外部标识查找。

use std::sync::Arc;

use domain::{ExternalId, RepositoryError, User, UserId};
use tracing::debug;

use crate::error::{ApplicationError, ApplicationResult, Resource};
use crate::repository::UserRepository;

#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserRepository>,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// 纯读操作，两个键空间都没有命中时返回 `None`。
    pub async fn lookup(&self, raw_id: i64) -> Result<Option<User>, RepositoryError> {
        if let Some(user) = self.users.find_by_id(UserId::new(raw_id)).await? {
            return Ok(Some(user));
        }
        let user = self
            .users
            .find_by_external_id(ExternalId::new(raw_id))
            .await?;
        if user.is_some() {
            debug!(raw_id, "通过外部标识解析到用户");
        }
        Ok(user)
    }

    /// 解析失败时以 `resource` 标明该用户在当前操作中的角色。
    pub async fn resolve_as(&self, raw_id: i64, resource: Resource) -> ApplicationResult<User> {
        self.lookup(raw_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found(resource, raw_id))
    }

    pub async fn resolve(&self, raw_id: i64) -> ApplicationResult<User> {
        self.resolve_as(raw_id, Resource::User).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use crate::ErrorKind;
    use chrono::Utc;
    use domain::{DisplayName, NewUser};

    #[tokio::test]
    async fn internal_id_wins_over_external_id() {
        let storage = MemoryStorage::new();
        // 第一个用户的内部主键是 1，第二个用户的外部标识也是 1
        let first = storage
            .user_repository
            .create(NewUser::new(
                ExternalId::new(7001),
                DisplayName::parse("first").unwrap(),
                None,
                Utc::now(),
            ))
            .await
            .unwrap();
        let second = storage
            .user_repository
            .create(NewUser::new(
                ExternalId::new(first.id.value()),
                DisplayName::parse("second").unwrap(),
                None,
                Utc::now(),
            ))
            .await
            .unwrap();

        let resolver = IdentityResolver::new(storage.user_repository.clone());
        assert_eq!(resolver.resolve(first.id.value()).await.unwrap().id, first.id);
        assert_eq!(resolver.resolve(7001).await.unwrap().id, first.id);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn falls_back_to_external_id() {
        let storage = MemoryStorage::new();
        let user = storage
            .user_repository
            .create(NewUser::new(
                ExternalId::new(3_000_000_123),
                DisplayName::parse("kakao").unwrap(),
                None,
                Utc::now(),
            ))
            .await
            .unwrap();

        let resolver = IdentityResolver::new(storage.user_repository.clone());
        let resolved = resolver.resolve(3_000_000_123).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn unknown_id_reports_role() {
        let storage = MemoryStorage::new();
        let resolver = IdentityResolver::new(storage.user_repository.clone());

        let err = resolver.resolve_as(42, Resource::Sender).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "sender not found: 42");
    }
}
