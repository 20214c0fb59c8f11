//! # ログ出力の初期化
//!
//! `tracing` のグローバルサブスクライバを組み立てる。
//!
//! | 変数名 | 説明 |
//! |--------|------|
//! | `LOG_FORMAT` | `json`（本番向け）または `pretty`（デフォルト） |
//! | `RUST_LOG` | フィルタ指定（デフォルト: [`DEFAULT_FILTER`]） |
//!
//! ディスパッチ境界で捕捉した内部エラーも、ここで初期化したサブスクライバ経由で出力される。

use std::{env, str::FromStr};

use thiserror::Error;
use tracing_subscriber::{
    EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
};

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_FILTER: &str = "info,apishim=debug";

/// 出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 イベント 1 行の JSON
    Json,
    #[default]
    Pretty,
}

/// 未知の `LOG_FORMAT`
#[derive(Debug, Error, PartialEq, Eq)]
#[error("未知のログ形式です: {0:?}（json / pretty のいずれか）")]
pub struct UnknownLogFormat(String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(UnknownLogFormat(other.to_string())),
        }
    }
}

/// サブスクライバの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// 初期化ログに出すサービス名
    pub service: String,
    pub format:  LogFormat,
    /// `EnvFilter` の指定
    pub filter:  String,
}

impl TracingConfig {
    /// 環境変数から読み込む
    pub fn from_env(service: impl Into<String>) -> Self {
        Self::from_lookup(service, |key| env::var(key).ok())
    }

    /// 任意の取得関数から読み込む
    ///
    /// `LOG_FORMAT` が不正な場合は警告を stderr に出して `pretty` にする。
    /// サブスクライバの初期化前なので `tracing` には出せない。
    pub fn from_lookup(
        service: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let format = match lookup("LOG_FORMAT").map(|value| value.parse::<LogFormat>()) {
            Some(Ok(format)) => format,
            Some(Err(e)) => {
                eprintln!("WARNING: {e}");
                LogFormat::default()
            }
            None => LogFormat::default(),
        };
        let filter = lookup("RUST_LOG")
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        Self {
            service: service.into(),
            format,
            filter,
        }
    }
}

/// グローバルサブスクライバを登録する
///
/// JSON 形式ではイベントのフィールドがトップレベルに展開される。
/// フィルタ指定が解釈できない場合は [`DEFAULT_FILTER`] を使う。
/// 登録済みの場合はエラー。
pub fn init_tracing(config: &TracingConfig) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let output = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()?;

    tracing::info!(
        service = %config.service,
        format = ?config.format,
        filter = %config.filter,
        "ログ出力を開始しました"
    );
    Ok(())
}
