//! # HTTP リクエストハンドラ
//!
//! ディスパッチャから呼ばれるハンドラを定義する。各ハンドラは
//! `RequestContext` を受け取り `HandlerResult` を返すだけで、HTTP レスポンスの
//! 組み立てやパニックの回復は行わない。
//!
//! ```text
//! handler.rs
//! └── handler/
//!     ├── echo.rs     # 入力をそのまま返す（認証不要）
//!     ├── health.rs   # ヘルスチェック（ディスパッチ対象外）
//!     └── me.rs       # 認証済みユーザー情報
//! ```

pub mod echo;
pub mod health;
pub mod me;

pub use echo::{EchoData, echo};
pub use health::{HealthResponse, health_check};
pub use me::{MeData, me};
