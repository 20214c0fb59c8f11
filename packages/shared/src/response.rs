//! # レスポンスモデル
//!
//! ハンドラが返す成功 / エラーの 2 種類の結果と、それらを包むエンベロープ。
//!
//! ## ワイヤ形式
//!
//! 成功・失敗を問わず、すべてのレスポンスボディは同じ形をとる:
//!
//! ```json
//! { "Status": 200, "Response": { "id": "42" } }
//! { "Status": 400, "Response": "Invalid Request: name is required" }
//! { "Status": 500, "Response": null }
//! ```
//!
//! クライアントは結果の種類に関係なく 1 つのスキーマで読み取れる。

use serde::{Deserialize, Serialize};

/// 成功レスポンス
///
/// HTTP ステータスコードと任意のシリアライズ可能なペイロード。
/// ステータスはそのまま HTTP レスポンスのステータスになる。
///
/// ## 使用例
///
/// ```
/// use apishim_shared::SuccessResponse;
///
/// let response = SuccessResponse::new(201, "created");
/// assert_eq!(response.status, 201);
/// assert_eq!(response.payload, "created");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessResponse<T> {
    pub status:  u16,
    pub payload: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(status: u16, payload: T) -> Self {
        Self { status, payload }
    }

    /// 200 OK
    pub fn ok(payload: T) -> Self {
        Self::new(200, payload)
    }

    /// ワイヤ形式のエンベロープに変換する
    pub fn envelope(&self) -> Envelope<&T> {
        Envelope::new(self.status, &self.payload)
    }
}

/// エラーレスポンス
///
/// HTTP ステータスコードと人間が読めるメッセージ。
/// ハンドラから `Err` として返すことも、[`raise`](ErrorResponse::raise) で
/// 送出することもでき、どちらも同じ HTTP レスポンスになる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status:  u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request
    ///
    /// メッセージは `"Invalid Request: "` に続けて `detail` を付加したものになる。
    ///
    /// ```
    /// use apishim_shared::ErrorResponse;
    ///
    /// let error = ErrorResponse::invalid_request("id must be numeric");
    /// assert_eq!(error.status, 400);
    /// assert_eq!(error.message, "Invalid Request: id must be numeric");
    /// ```
    pub fn invalid_request(detail: impl AsRef<str>) -> Self {
        Self::new(400, format!("Invalid Request: {}", detail.as_ref()))
    }

    /// 401 トークン未指定
    pub fn missing_token() -> Self {
        Self::new(401, "Missing Token")
    }

    /// 401 トークン不正
    pub fn not_authorized() -> Self {
        Self::new(401, "Not Authorized")
    }

    /// 500 Internal Server Error
    ///
    /// ハンドラが明示的に返した場合はメッセージがそのままクライアントに届く。
    /// 予期しない障害のレスポンス（`Response` が `null`）は [`Envelope::internal_error`] を使う。
    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
    }

    /// ワイヤ形式のエンベロープに変換する
    pub fn envelope(&self) -> Envelope<&str> {
        Envelope::new(self.status, self.message.as_str())
    }

    /// このエラーをペイロードとしてパニックを送出する
    ///
    /// ディスパッチ境界で捕捉され、`Err` で返した場合と同じレスポンスになる。
    /// 深い呼び出し階層から即座に処理を打ち切りたい場合に使う。
    pub fn raise(self) -> ! {
        std::panic::panic_any(self)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

impl std::error::Error for ErrorResponse {}

/// 全レスポンス共通のエンベロープ `{ "Status": ..., "Response": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "Status")]
    pub status:   u16,
    #[serde(rename = "Response")]
    pub response: T,
}

impl<T> Envelope<T> {
    pub fn new(status: u16, response: T) -> Self {
        Self { status, response }
    }
}

impl Envelope<Option<()>> {
    /// 500 内部エラー
    ///
    /// 内部情報を漏らさないため、`Response` は常に `null`。
    pub fn internal_error() -> Self {
        Self::new(500, None)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_成功レスポンスのエンベロープが正しいjson形状になる() {
        let response = SuccessResponse::ok(json!({ "id": "42" }));

        let value = serde_json::to_value(response.envelope()).unwrap();

        assert_eq!(value, json!({ "Status": 200, "Response": { "id": "42" } }));
    }

    #[test]
    fn test_エラーレスポンスは成功と同じエンベロープ形状になる() {
        let error = ErrorResponse::new(404, "Not Found");

        let value = serde_json::to_value(error.envelope()).unwrap();

        assert_eq!(value, json!({ "Status": 404, "Response": "Not Found" }));
    }

    #[test]
    fn test_内部エラーのresponseはnull() {
        let body = serde_json::to_string(&Envelope::internal_error()).unwrap();

        assert_eq!(body, r#"{"Status":500,"Response":null}"#);
    }

    #[rstest]
    #[case("", "Invalid Request: ")]
    #[case("name is required", "Invalid Request: name is required")]
    #[case("id=abc", "Invalid Request: id=abc")]
    fn test_invalid_requestはプレフィックス付きの400を作る(
        #[case] detail: &str,
        #[case] expected: &str,
    ) {
        let error = ErrorResponse::invalid_request(detail);

        assert_eq!(error.status, 400);
        assert_eq!(error.message, expected);
    }

    #[test]
    fn test_認証エラーの固定メッセージ() {
        assert_eq!(ErrorResponse::missing_token(), ErrorResponse::new(401, "Missing Token"));
        assert_eq!(ErrorResponse::not_authorized(), ErrorResponse::new(401, "Not Authorized"));
        assert_eq!(ErrorResponse::internal_error().status, 500);
    }

    #[test]
    fn test_raiseはerror_responseをペイロードにしてパニックする() {
        let payload =
            std::panic::catch_unwind(|| -> u16 { ErrorResponse::new(409, "Conflict").raise() })
                .unwrap_err();

        let error = payload.downcast::<ErrorResponse>().unwrap();
        assert_eq!(*error, ErrorResponse::new(409, "Conflict"));
    }

    #[test]
    fn test_エンベロープをデシリアライズできる() {
        let envelope: Envelope<String> =
            serde_json::from_str(r#"{"Status":401,"Response":"Not Authorized"}"#).unwrap();

        assert_eq!(envelope, Envelope::new(401, "Not Authorized".to_string()));
    }
}
