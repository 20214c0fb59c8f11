//! # ApiShim インフラ層
//!
//! ストレージクライアント（Redis）への接続と、トークンからユーザーを解決する
//! ストアを提供する。ディスパッチ層はこのクレートの型を不透明なハンドルとして扱う。

pub mod error;
pub mod redis;
pub mod token_store;

pub use ::redis::aio::ConnectionManager;
pub use error::InfraError;
pub use token_store::RedisTokenStore;
