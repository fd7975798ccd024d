//! 服务测试共用的夹具

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use domain::{DisplayName, ExternalId, NewProduct, NewUser, Product, Timestamp, User, UserId};

use crate::{
    clock::Clock,
    memory::MemoryStorage,
    repository::{ProductRepository, UserRepository},
    retry::{Backoff, RetryConfig},
    services::{ChatService, ChatServiceDependencies, LikeService, LikeServiceDependencies},
};

/// 固定时间的时钟，所有消息共享同一时间戳，顺序只能靠 id 区分。
#[derive(Clone)]
pub(crate) struct TestClock {
    now: Timestamp,
}

impl TestClock {
    pub(crate) fn new() -> Self {
        Self {
            now: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }
}

impl Clock for TestClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}

pub(crate) struct Fixture {
    pub storage: MemoryStorage,
    pub chat: ChatService,
    pub likes: LikeService,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let storage = MemoryStorage::new();
        let clock: Arc<dyn Clock> = Arc::new(TestClock::new());
        let chat = ChatService::new(ChatServiceDependencies {
            room_repository: storage.room_repository.clone(),
            message_repository: storage.message_repository.clone(),
            product_repository: storage.product_repository.clone(),
            user_repository: storage.user_repository.clone(),
            clock: clock.clone(),
            room_creation_retry: RetryConfig::new(3, Backoff::Immediate),
        });
        let likes = LikeService::new(LikeServiceDependencies {
            like_repository: storage.like_repository.clone(),
            product_repository: storage.product_repository.clone(),
            user_repository: storage.user_repository.clone(),
            clock,
        });
        Self {
            storage,
            chat,
            likes,
        }
    }

    pub(crate) async fn user(&self, external_id: i64, name: &str) -> User {
        self.storage
            .user_repository
            .create(NewUser::new(
                ExternalId::new(external_id),
                DisplayName::parse(name).unwrap(),
                None,
                TestClock::new().now(),
            ))
            .await
            .unwrap()
    }

    pub(crate) async fn product(&self, seller_id: UserId, title: &str) -> Product {
        self.storage
            .product_repository
            .create(NewProduct::new(seller_id, None, title, 15_000, TestClock::new().now()).unwrap())
            .await
            .unwrap()
    }

    pub(crate) async fn reputation_of(&self, user_id: UserId) -> f64 {
        self.storage
            .user_repository
            .find_by_id(user_id)
            .await
            .unwrap()
            .unwrap()
            .reputation_score
            .value()
    }
}
