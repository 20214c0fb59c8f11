//! # ヘルスチェックハンドラ
//!
//! ロードバランサーやコンテナオーケストレーターの死活監視用。
//! 監視系の慣習に合わせ、エンベロープで包まずに返す。
//!
//! ```text
//! $ curl http://localhost:13000/health
//! {"status":"healthy","version":"0.1.0"}
//! ```

use axum::Json;
use serde::Serialize;

/// ヘルスチェックレスポンス
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 稼働状態（`"healthy"` 固定）
    pub status:  String,
    /// アプリケーションバージョン（Cargo.toml から取得）
    pub version: String,
}

/// 常に 200 OK を返す
///
/// Redis への接続状態は確認しない。
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
