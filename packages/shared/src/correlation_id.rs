//! # リクエスト追跡用の Correlation ID
//!
//! 1 リクエストの処理中に出力されるログ（特にディスパッチ境界で捕捉した
//! 内部エラーのログ）を結び付けるための識別子。
//!
//! ```rust
//! use apishim_shared::CorrelationId;
//!
//! // 上流から受け取った値を採用（不正なら None）
//! let id = CorrelationId::from_incoming("req-abc-123").unwrap_or_default();
//! tracing::info!(correlation_id = %id, "リクエスト処理開始");
//! ```

use std::fmt;

use uuid::Uuid;

/// 受け付ける Correlation ID の最大長
const MAX_INCOMING_LEN: usize = 128;

/// リクエスト追跡用の一意識別子
///
/// HTTP ヘッダ [`CorrelationId::HEADER`] で上流から伝播される。
/// ヘッダがない、または不正な場合は UUID v7 で新規生成する。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// 伝播に使う HTTP ヘッダ名（小文字）
    pub const HEADER: &'static str = "x-correlation-id";

    /// UUID v7 ベースで新規生成する
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// 上流から受け取った値を検証して採用する
    ///
    /// 空文字列、長すぎる値、可視 ASCII 以外を含む値はログ汚染を避けるため拒否する。
    pub fn from_incoming(value: &str) -> Option<Self> {
        let value = value.trim();
        let valid = !value.is_empty()
            && value.len() <= MAX_INCOMING_LEN
            && value.bytes().all(|b| b.is_ascii_graphic());
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::{assert_eq, assert_ne};
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_newは毎回異なるidを生成する() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }

    #[test]
    fn test_from_incomingは前後の空白を除いて採用する() {
        let id = CorrelationId::from_incoming("  req-123 ").unwrap();

        assert_eq!(id.as_str(), "req-123");
        assert_eq!(id.to_string(), "req-123");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("has space")]
    #[case("改行\n")]
    fn test_from_incomingは不正な値を拒否する(#[case] value: &str) {
        assert_eq!(CorrelationId::from_incoming(value), None);
    }

    #[test]
    fn test_from_incomingは長すぎる値を拒否する() {
        let value = "a".repeat(MAX_INCOMING_LEN + 1);

        assert_eq!(CorrelationId::from_incoming(&value), None);
        assert!(CorrelationId::from_incoming(&value[..MAX_INCOMING_LEN]).is_some());
    }
}
