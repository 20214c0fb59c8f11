//! # 認証済みユーザー
//!
//! 外部の認証器がトークンから解決したユーザー情報。
//!
//! ## 設計判断
//!
//! - **Newtype パターン**: `UserId` と `AuthToken` を `String` と区別し、引数の取り違えを防ぐ
//! - **不変**: `AuthenticatedUser` はフィールドを公開せず、生成後は変更できない
//! - **トークンの秘匿**: `AuthToken` の `Debug` は値を出力しない（ログへの漏洩防止）
//!
//! このクレートはユーザーを永続化しない。生成は認証器の責務。

use std::fmt;

use serde::{Deserialize, Serialize};

/// ユーザーの一意識別子
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// リクエストの `token` パラメータで渡される認証トークン
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AuthToken(String);

impl AuthToken {
    /// 空でない文字列からトークンを作成する
    ///
    /// 空文字列は「トークン未指定」と同じ扱いのため `None` を返す。
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (!token.is_empty()).then_some(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// 認証済みユーザー
///
/// 認証ゲートが `RequestContext` に添付し、以降のハンドラから参照される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    id:    UserId,
    name:  String,
    token: AuthToken,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, name: impl Into<String>, token: AuthToken) -> Self {
        Self {
            id,
            name: name.into(),
            token,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// 表示名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 認証に使われたトークン
    pub fn token(&self) -> &AuthToken {
        &self.token
    }
}
