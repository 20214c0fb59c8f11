//! # ApiShim サーバー
//!
//! HTTP ハンドラの結果を統一形式の JSON レスポンスに変換するディスパッチ層と、
//! ハンドラの前段でトークンを検証する認証ゲート。
//!
//! ## 処理の流れ
//!
//! ```text
//! リクエスト ─▶ 認証ゲート（保護対象のみ）─▶ ディスパッチ ─▶ ハンドラ
//!                     │                          │
//!                     └─ 401 ◀──────             └─ 成功 / エラー / 内部エラー(500)
//! ```
//!
//! ## モジュール構成
//!
//! - `app`: ルーター構築とアプリケーション状態
//! - `auth`: 認証ゲートと認証器トレイト
//! - `config`: 環境変数からの設定読み込み
//! - `context`: リクエストごとのコンテキスト
//! - `dispatch`: ハンドラ呼び出しとレスポンス生成、障害境界
//! - `handler`: HTTP ハンドラ

pub mod app;
pub mod auth;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod handler;

pub use auth::{Authenticator, DenyAllAuthenticator, authenticate};
pub use context::RequestContext;
pub use dispatch::{
    Dispatcher, FaultReport, FaultReporter, HandlerError, HandlerResult, TracingFaultReporter,
    dispatch,
};
