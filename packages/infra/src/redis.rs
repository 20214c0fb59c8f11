//! # Redis 接続管理
//!
//! `ConnectionManager` は自動再接続を行い、`Clone` で複数タスクから共有できる。
//! リクエストごとの `RequestContext` にはこのクローンがストレージハンドルとして渡る。
//!
//! ```rust,ignore
//! use apishim_infra::redis;
//!
//! let conn = redis::create_connection_manager("redis://localhost").await?;
//! ```

use redis::{Client, aio::ConnectionManager};

use crate::InfraError;

/// Redis 接続マネージャを作成する
///
/// 起動時に一度だけ呼び出す。
///
/// * `redis_url` - `redis://[[username:]password@]host[:port][/database]`
///   （TLS は `rediss://`）
pub async fn create_connection_manager(redis_url: &str) -> Result<ConnectionManager, InfraError> {
    let client = Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;
    tracing::info!("Redis に接続しました");
    Ok(manager)
}
