//! # ApiShim サーバー
//!
//! ## 環境変数
//!
//! `.env` ファイルがあれば読み込む。
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `APISHIM_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `APISHIM_PORT` | **Yes** | ポート番号 |
//! | `REDIS_URL` | No | トークンストアの Redis URL |
//! | `LOG_FORMAT` | No | `json` または `pretty`（デフォルト） |
//! | `RUST_LOG` | No | ログレベル（デフォルト: `info,apishim=debug`） |
//!
//! ## 起動方法
//!
//! ```bash
//! APISHIM_PORT=13000 REDIS_URL=redis://localhost:6379 cargo run -p apishim-server
//! ```

use std::{net::SocketAddr, sync::Arc};

use apishim_infra::{ConnectionManager, RedisTokenStore, redis::create_connection_manager};
use apishim_server::{
    DenyAllAuthenticator,
    app::{self, AppState},
    config::ServerConfig,
};
use apishim_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 本番環境では .env を置かず、環境変数を直接設定する
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("apishim-server"))?;

    let config = ServerConfig::from_env()?;

    let state: AppState<ConnectionManager> = match &config.redis_url {
        Some(url) => {
            let conn = create_connection_manager(url).await?;
            let store = RedisTokenStore::new(conn.clone());
            AppState::new(Some(conn), Arc::new(store))
        }
        None => {
            tracing::warn!("REDIS_URL が未設定のため、すべてのトークンを拒否します");
            AppState::new(None, Arc::new(DenyAllAuthenticator))
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("サーバーが起動しました: {}", addr);

    axum::serve(listener, app::router(state)).await?;

    Ok(())
}
