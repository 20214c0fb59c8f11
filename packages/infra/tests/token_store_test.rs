//! RedisTokenStore 統合テスト
//!
//! 実際の Redis を使用する。Redis がない環境では `#[ignore]` のまま。
//!
//! 実行方法:
//! ```bash
//! REDIS_URL=redis://localhost:6379 cargo test -p apishim-infra --test token_store_test -- --ignored
//! ```

use apishim_domain::AuthToken;
use apishim_infra::{RedisTokenStore, redis::create_connection_manager};
use redis::AsyncCommands;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

#[tokio::test]
#[ignore = "Redis が必要"]
async fn test_保存済みトークンからユーザーを解決できる() {
    let mut conn = create_connection_manager(&redis_url()).await.unwrap();
    let _: () = conn
        .set_ex(
            "apishim:token:it-token-1",
            r#"{"id":"u-1","name":"Alice"}"#,
            60,
        )
        .await
        .unwrap();
    let store = RedisTokenStore::new(conn.clone());

    let user = store
        .lookup(&AuthToken::new("it-token-1").unwrap())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(user.id().as_str(), "u-1");
    assert_eq!(user.name(), "Alice");

    let _: () = conn.del("apishim:token:it-token-1").await.unwrap();
}

#[tokio::test]
#[ignore = "Redis が必要"]
async fn test_未登録トークンはnoneを返す() {
    let conn = create_connection_manager(&redis_url()).await.unwrap();
    let store = RedisTokenStore::new(conn);

    let user = store
        .lookup(&AuthToken::new("it-token-does-not-exist").unwrap())
        .await
        .unwrap();

    assert!(user.is_none());
}
