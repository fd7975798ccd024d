//! 主应用程序入口
//!
//! 加载配置、初始化日志、连接数据库并执行迁移后退出。
//! 服务由嵌入方通过 `Infrastructure::chat_service` / `like_service` 装配，
//! 这里不持有任何服务实例。

use anyhow::Context;
use config::AppConfig;
use infrastructure::{Infrastructure, InfrastructureConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("加载配置失败")?;

    // RUST_LOG 优先于配置文件中的过滤规则
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .context("无效的日志过滤规则")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("配置: {}", config.sanitize());

    let infra = Infrastructure::connect(InfrastructureConfig {
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        acquire_timeout: config.database.acquire_timeout(),
    })
    .await
    .context("连接数据库失败")?;

    tracing::info!(
        "引导完成，连接池大小 {}，聊天室创建最多尝试 {} 次",
        infra.storage.pool.size(),
        config.chat.room_create_attempts
    );

    infra.storage.pool.close().await;
    Ok(())
}
