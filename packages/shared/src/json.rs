//! # JSON エンコーダ
//!
//! レスポンス値を JSON 文字列に変換する薄いアダプタ。
//!
//! エンコード失敗はリクエスト起因ではなくプログラミングエラーである
//! （例: 文字列以外のキーを持つマップ、失敗する `Serialize` 実装）。
//! 呼び出し側はこれを内部エラーとして扱い、クライアントに詳細を返さない。

use serde::Serialize;
use thiserror::Error;

/// JSON エンコード失敗
#[derive(Debug, Error)]
#[error("JSON エンコードに失敗しました: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// 値を JSON 文字列にエンコードする
///
/// ```
/// use apishim_shared::{Envelope, to_json_string};
///
/// let body = to_json_string(&Envelope::new(200, "ok")).unwrap();
/// assert_eq!(body, r#"{"Status":200,"Response":"ok"}"#);
/// ```
pub fn to_json_string<T>(value: &T) -> Result<String, EncodeError>
where
    T: Serialize + ?Sized,
{
    Ok(serde_json::to_string(value)?)
}
