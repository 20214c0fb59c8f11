//! # ApiShim 共有ユーティリティ
//!
//! すべてのクレートから依存される、HTTP フレームワーク非依存の型を提供する。
//!
//! ## 設計方針
//!
//! - レスポンスモデルは純粋なデータ構造（`Serialize` / `Deserialize` のみ）
//! - axum への依存は持たない。HTTP レスポンスへの変換は `apishim-server` の責務
//! - ビジネスロジックを含まない

pub mod correlation_id;
pub mod json;
pub mod observability;
pub mod response;

pub use correlation_id::CorrelationId;
pub use json::{EncodeError, to_json_string};
pub use response::{Envelope, ErrorResponse, SuccessResponse};
