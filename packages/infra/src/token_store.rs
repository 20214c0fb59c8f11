//! # トークンストア
//!
//! 認証トークンから [`AuthenticatedUser`] を解決する。
//!
//! ## Redis キー設計
//!
//! ```text
//! apishim:token:{token} → {"id": "...", "name": "..."}
//! ```
//!
//! トークンの発行・失効（キーの書き込みと TTL 管理）はこのクレートの範囲外。

use apishim_domain::{AuthToken, AuthenticatedUser, UserId};
use redis::{AsyncCommands, aio::ConnectionManager};
use serde::Deserialize;

use crate::InfraError;

/// トークンキーのプレフィックス
const TOKEN_KEY_PREFIX: &str = "apishim:token";

/// Redis に保存されたユーザー情報
#[derive(Debug, Deserialize)]
struct StoredUser {
    id:   String,
    name: String,
}

/// Redis を使ったトークンストア
#[derive(Clone)]
pub struct RedisTokenStore {
    conn: ConnectionManager,
}

impl RedisTokenStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// トークンに対応するユーザーを取得する
    ///
    /// キーが存在しなければ `Ok(None)`。
    pub async fn lookup(&self, token: &AuthToken) -> Result<Option<AuthenticatedUser>, InfraError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(token_key(token)).await?;

        raw.map(|json| decode_user(&json, token)).transpose()
    }
}

fn token_key(token: &AuthToken) -> String {
    format!("{TOKEN_KEY_PREFIX}:{}", token.as_str())
}

fn decode_user(json: &str, token: &AuthToken) -> Result<AuthenticatedUser, InfraError> {
    let stored: StoredUser = serde_json::from_str(json)?;
    Ok(AuthenticatedUser::new(
        UserId::new(stored.id),
        stored.name,
        token.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn token(value: &str) -> AuthToken {
        AuthToken::new(value).unwrap()
    }

    #[test]
    fn test_トークンキーの形式() {
        assert_eq!(token_key(&token("abc123")), "apishim:token:abc123");
    }

    #[test]
    fn test_保存値からユーザーを復元する() {
        let user = decode_user(r#"{"id":"42","name":"Alice"}"#, &token("t-1")).unwrap();

        assert_eq!(user.id().as_str(), "42");
        assert_eq!(user.name(), "Alice");
        assert_eq!(user.token(), &token("t-1"));
    }

    #[test]
    fn test_不正な保存値はデシリアライズエラーになる() {
        let result = decode_user(r#"{"id":"42"}"#, &token("t-1"));

        assert!(matches!(result, Err(InfraError::Deserialization(_))));
    }
}
