//! # ApiShim ドメイン型
//!
//! 認証ゲートとハンドラの間で受け渡される利用者の識別情報。

pub mod user;

pub use user::{AuthToken, AuthenticatedUser, UserId};
