//! # サーバー設定
//!
//! 環境変数からサーバーの設定を読み込む。
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `APISHIM_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `APISHIM_PORT` | **Yes** | ポート番号 |
//! | `REDIS_URL` | No | トークンストアの Redis URL（未設定なら全トークンを拒否） |

use std::env;

use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません（.env を確認してください）")]
    Missing(&'static str),

    #[error("{name} は有効なポート番号である必要があります: {value:?}")]
    InvalidPort { name: &'static str, value: String },
}

/// サーバーの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// バインドアドレス
    pub host:      String,
    /// ポート番号
    pub port:      u16,
    pub redis_url: Option<String>,
}

impl ServerConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の取得関数から設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = lookup("APISHIM_PORT").ok_or(ConfigError::Missing("APISHIM_PORT"))?;
        let port = port.parse().map_err(|_| ConfigError::InvalidPort {
            name:  "APISHIM_PORT",
            value: port.clone(),
        })?;

        Ok(Self {
            host: lookup("APISHIM_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            redis_url: lookup("REDIS_URL").filter(|url| !url.is_empty()),
        })
    }
}
