use std::sync::Arc;

use domain::{
    Like, NewLike, Product, ProductId, RepositoryError, ReputationAdjustment, UserId,
};
use tracing::{info, warn};

use crate::{
    clock::Clock,
    error::{ApplicationError, ApplicationResult, Resource},
    repository::{LikeRepository, ProductRepository, UserRepository},
    services::identity::IdentityResolver,
};

pub struct LikeServiceDependencies {
    pub like_repository: Arc<dyn LikeRepository>,
    pub product_repository: Arc<dyn ProductRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

/// 点赞关系与卖家温度联动。
///
/// 点赞记录是主事实，温度是派生信号：温度调整失败只记日志，不回滚点赞。
pub struct LikeService {
    deps: LikeServiceDependencies,
    identities: IdentityResolver,
}

impl LikeService {
    pub fn new(deps: LikeServiceDependencies) -> Self {
        let identities = IdentityResolver::new(deps.user_repository.clone());
        Self { deps, identities }
    }

    async fn load_product(&self, product_id: ProductId) -> ApplicationResult<Product> {
        self.deps
            .product_repository
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found(Resource::Product, product_id))
    }

    pub async fn like(&self, user_raw_id: i64, product_id: ProductId) -> ApplicationResult<Like> {
        let user = self.identities.resolve(user_raw_id).await?;
        let product = self.load_product(product_id).await?;

        let already_liked = ApplicationError::AlreadyLiked {
            user: user.id,
            product: product.id,
        };
        if self
            .deps
            .like_repository
            .find(user.id, product.id)
            .await?
            .is_some()
        {
            return Err(already_liked);
        }

        // 并发的重复点赞由唯一索引兜底
        let like = match self
            .deps
            .like_repository
            .insert(NewLike::new(user.id, product.id, self.deps.clock.now()))
            .await
        {
            Ok(like) => like,
            Err(RepositoryError::Conflict(_)) => return Err(already_liked),
            Err(err) => return Err(err.into()),
        };

        info!("用户 {} 点赞商品 {}", user.id, product.id);
        self.adjust_seller_reputation(product.seller_id, ReputationAdjustment::Raise)
            .await;
        Ok(like)
    }

    pub async fn unlike(&self, user_raw_id: i64, product_id: ProductId) -> ApplicationResult<()> {
        let user = self.identities.resolve(user_raw_id).await?;
        let product = self.load_product(product_id).await?;

        if !self
            .deps
            .like_repository
            .delete(user.id, product.id)
            .await?
        {
            return Err(ApplicationError::NotLiked {
                user: user.id,
                product: product.id,
            });
        }

        info!("用户 {} 取消点赞商品 {}", user.id, product.id);
        self.adjust_seller_reputation(product.seller_id, ReputationAdjustment::Lower)
            .await;
        Ok(())
    }

    pub async fn is_liked(&self, user_raw_id: i64, product_id: ProductId) -> ApplicationResult<bool> {
        let user = self.identities.resolve(user_raw_id).await?;
        let product = self.load_product(product_id).await?;
        Ok(self
            .deps
            .like_repository
            .find(user.id, product.id)
            .await?
            .is_some())
    }

    /// 用户点赞过的商品，最新的在前。
    pub async fn list_likes(&self, user_raw_id: i64) -> ApplicationResult<Vec<Like>> {
        let user = self.identities.resolve(user_raw_id).await?;
        Ok(self.deps.like_repository.list_by_user(user.id).await?)
    }

    async fn adjust_seller_reputation(&self, seller_id: UserId, adjustment: ReputationAdjustment) {
        match self
            .deps
            .user_repository
            .adjust_reputation(seller_id, adjustment, self.deps.clock.now())
            .await
        {
            Ok(change) if change.is_saturated() => {
                info!(seller_id = %seller_id, score = %change.current, ?adjustment, "卖家温度已到边界");
            }
            Ok(change) => {
                info!(
                    seller_id = %seller_id,
                    from = %change.previous,
                    to = %change.current,
                    "卖家温度已更新"
                );
            }
            Err(err) => {
                warn!(seller_id = %seller_id, ?adjustment, "卖家温度调整失败: {}", err);
            }
        }
    }
}
