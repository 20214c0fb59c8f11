//! # リクエストコンテキスト
//!
//! 1 リクエストの処理に必要なものをまとめて保持する。
//!
//! - 受信したリクエスト（ヘッダ等とバッファ済みボディ）
//! - ストレージクライアントのハンドル（任意、型は不透明）
//! - Correlation ID
//! - 認証済みユーザー（認証ゲート通過後のみ）
//!
//! リクエストごとに生成され、処理の終了とともに破棄される。他のリクエストと
//! 共有されることはない。レスポンスはハンドラの戻り値からディスパッチャが組み立てる。

use apishim_domain::AuthenticatedUser;
use apishim_shared::{CorrelationId, ErrorResponse};
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request},
    http::{HeaderMap, Method, Uri, header, request::Parts},
    response::Response,
};

use crate::{app::AppState, dispatch::HandlerError};

/// 受け付けるリクエストボディの上限（2 MiB）
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// フォーム値を読み取るボディの形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormEncoding {
    UrlEncoded,
    Multipart,
}

/// リクエストごとのコンテキスト
///
/// `S` はストレージクライアントのハンドル型。ディスパッチ層は中身に触れない。
#[derive(Debug)]
pub struct RequestContext<S = ()> {
    parts:          Parts,
    body:           Bytes,
    storage:        Option<S>,
    correlation_id: CorrelationId,
    user:           Option<AuthenticatedUser>,
    /// ボディから読み取ったフォーム値（出現順）
    form:           Vec<(String, String)>,
}

impl<S> RequestContext<S> {
    /// リクエストの各部からコンテキストを作成する
    ///
    /// Correlation ID はヘッダから採用し、なければ新規生成する。
    /// `application/x-www-form-urlencoded` のボディはここでフォーム値に展開する
    /// （`multipart/form-data` は非同期の読み取りが必要なので [`FromRequest`] 側で行う）。
    pub fn new(parts: Parts, body: Bytes, storage: Option<S>) -> Self {
        let correlation_id = correlation_id_from(&parts.headers);
        let form = match form_encoding(&parts) {
            Some(FormEncoding::UrlEncoded) => {
                url::form_urlencoded::parse(&body).into_owned().collect()
            }
            _ => Vec::new(),
        };
        Self {
            parts,
            body,
            storage,
            correlation_id,
            user: None,
            form,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// ストレージクライアントのハンドル
    pub fn storage(&self) -> Option<&S> {
        self.storage.as_ref()
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// 認証済みユーザー（認証ゲートを通過していなければ `None`）
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_ref()
    }

    /// 認証済みユーザーを取得する
    ///
    /// 認証ゲートの後ろに置かれていないハンドラから呼ばれた場合は
    /// 配線ミスなので内部エラーにする。
    pub fn require_user(&self) -> Result<&AuthenticatedUser, HandlerError> {
        self.user
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("認証ゲートを通らずに認証済みユーザーが要求されました").into())
    }

    pub(crate) fn attach_user(&mut self, user: AuthenticatedUser) {
        self.user = Some(user);
    }

    /// フォーム値を取得する
    ///
    /// POST / PUT / PATCH でフォーム形式（`application/x-www-form-urlencoded` または
    /// `multipart/form-data`）のボディがあればボディの値を優先し、なければクエリ文字列を見る。
    /// 同じキーが複数あれば最初の値。マルチパートのファイルパートは対象外。
    /// キーが存在しなければ `None`（値が空の場合は `Some("")`）。
    pub fn form_value(&self, key: &str) -> Option<String> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .or_else(|| {
                self.parts
                    .uri
                    .query()
                    .and_then(|query| first_value(query.as_bytes(), key))
            })
    }
}

fn form_encoding(parts: &Parts) -> Option<FormEncoding> {
    if !matches!(parts.method, Method::POST | Method::PUT | Method::PATCH) {
        return None;
    }
    let mime = parts
        .headers
        .get(header::CONTENT_TYPE)?
        .to_str()
        .ok()?
        .split(';')
        .next()?
        .trim();

    if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        Some(FormEncoding::UrlEncoded)
    } else if mime.eq_ignore_ascii_case("multipart/form-data") {
        Some(FormEncoding::Multipart)
    } else {
        None
    }
}

/// マルチパートのボディからテキストパートを読み取る
///
/// 形式が壊れている場合は、そこまでに読めたパートだけを返す。
async fn multipart_fields(headers: &HeaderMap, body: Bytes) -> Vec<(String, String)> {
    let mut request = Request::new(Body::from(body));
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type.clone());
    }
    let Ok(mut multipart) = Multipart::from_request(request, &()).await else {
        return Vec::new();
    };

    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        match field.text().await {
            Ok(value) => fields.push((name, value)),
            Err(_) => break,
        }
    }
    fields
}

fn first_value(input: &[u8], key: &str) -> Option<String> {
    url::form_urlencoded::parse(input)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn correlation_id_from(headers: &HeaderMap) -> CorrelationId {
    headers
        .get(CorrelationId::HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(CorrelationId::from_incoming)
        .unwrap_or_default()
}

impl<S> FromRequest<AppState<S>> for RequestContext<S>
where
    S: Clone + Send + Sync + 'static,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &AppState<S>) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();

        match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => {
                let mut ctx = Self::new(parts, bytes, state.storage.clone());
                if form_encoding(&ctx.parts) == Some(FormEncoding::Multipart) {
                    ctx.form = multipart_fields(&ctx.parts.headers, ctx.body.clone()).await;
                }
                Ok(ctx)
            }
            Err(e) => {
                let correlation_id = correlation_id_from(&parts.headers);
                tracing::debug!(correlation_id = %correlation_id, error = %e, "リクエストボディを読み取れません");
                Err(state.dispatcher.respond_error(
                    &correlation_id,
                    &ErrorResponse::invalid_request("request body could not be read"),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use apishim_domain::{AuthToken, UserId};
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::auth::DenyAllAuthenticator;

    fn context(method: Method, uri: &str, content_type: Option<&str>, body: &str) -> RequestContext {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        RequestContext::new(parts, Bytes::from(body.to_string()), None)
    }

    #[test]
    fn test_クエリ文字列から値を取得する() {
        let ctx = context(Method::GET, "/x?token=abc&other=1", None, "");

        assert_eq!(ctx.form_value("token"), Some("abc".to_string()));
        assert_eq!(ctx.form_value("missing"), None);
    }

    #[test]
    fn test_フォームボディの値がクエリより優先される() {
        let ctx = context(
            Method::POST,
            "/x?token=from-query",
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            "token=from-body",
        );

        assert_eq!(ctx.form_value("token"), Some("from-body".to_string()));
    }

    #[test]
    fn test_ボディにないキーはクエリから取得する() {
        let ctx = context(
            Method::POST,
            "/x?token=from-query",
            Some("application/x-www-form-urlencoded"),
            "other=1",
        );

        assert_eq!(ctx.form_value("token"), Some("from-query".to_string()));
    }

    #[rstest]
    #[case(Method::GET, Some("application/x-www-form-urlencoded"))]
    #[case(Method::DELETE, Some("application/x-www-form-urlencoded"))]
    #[case(Method::POST, Some("application/json"))]
    #[case(Method::POST, None)]
    fn test_フォーム以外のボディは無視する(
        #[case] method: Method,
        #[case] content_type: Option<&str>,
    ) {
        let ctx = context(method, "/x", content_type, "token=from-body");

        assert_eq!(ctx.form_value("token"), None);
    }

    #[test]
    fn test_パーセントエンコードされた値をデコードする() {
        let ctx = context(Method::GET, "/x?message=hello%20world&name=a+b", None, "");

        assert_eq!(ctx.form_value("message"), Some("hello world".to_string()));
        assert_eq!(ctx.form_value("name"), Some("a b".to_string()));
    }

    #[test]
    fn test_同じキーは最初の値を採用する() {
        let ctx = context(Method::GET, "/x?token=first&token=second", None, "");

        assert_eq!(ctx.form_value("token"), Some("first".to_string()));
    }

    #[tokio::test]
    async fn test_マルチパートのテキストパートから値を取得する() {
        let state: AppState<()> = AppState::new(None, Arc::new(DenyAllAuthenticator));
        let body = concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"upload\"; filename=\"token.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "from-file\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"token\"\r\n",
            "\r\n",
            "from-body\r\n",
            "--XYZ--\r\n",
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/x?token=from-query")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
            .body(Body::from(body))
            .unwrap();

        let ctx = RequestContext::from_request(request, &state).await.unwrap();

        assert_eq!(ctx.form_value("token"), Some("from-body".to_string()));
        assert_eq!(ctx.form_value("upload"), None);
    }

    #[tokio::test]
    async fn test_壊れたマルチパートはクエリにフォールバックする() {
        let state: AppState<()> = AppState::new(None, Arc::new(DenyAllAuthenticator));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/x?token=from-query")
            .header(header::CONTENT_TYPE, "multipart/form-data")
            .body(Body::from("not a multipart body"))
            .unwrap();

        let ctx = RequestContext::from_request(request, &state).await.unwrap();

        assert_eq!(ctx.form_value("token"), Some("from-query".to_string()));
    }

    #[test]
    fn test_correlation_idはヘッダから採用する() {
        let (parts, ()) = Request::builder()
            .uri("/x")
            .header(CorrelationId::HEADER, "req-42")
            .body(())
            .unwrap()
            .into_parts();

        let ctx: RequestContext = RequestContext::new(parts, Bytes::new(), None);

        assert_eq!(ctx.correlation_id().as_str(), "req-42");
    }

    #[test]
    fn test_ユーザー未添付でrequire_userは内部エラー() {
        let mut ctx = context(Method::GET, "/x", None, "");
        assert!(matches!(ctx.require_user(), Err(HandlerError::Internal(_))));

        ctx.attach_user(apishim_domain::AuthenticatedUser::new(
            UserId::new("u-1"),
            "Alice",
            AuthToken::new("t").unwrap(),
        ));

        assert_eq!(ctx.require_user().unwrap().name(), "Alice");
    }
}
