//! # インフラ層エラー定義

use thiserror::Error;

/// ストレージとの通信で発生するエラー
#[derive(Debug, Error)]
pub enum InfraError {
    /// Redis への接続失敗、コマンド実行エラーなど
    #[error("Redis エラー: {0}")]
    Redis(#[from] redis::RedisError),

    /// 保存されている値を解釈できない
    #[error("デシリアライズエラー: {0}")]
    Deserialization(#[from] serde_json::Error),
}
