//! # ディスパッチ
//!
//! ハンドラを呼び出し、その結果を HTTP レスポンスに変換する。
//!
//! ## 結果の分類
//!
//! | ハンドラの結果 | HTTP ステータス | ボディ |
//! |----------------|-----------------|--------|
//! | `Ok(SuccessResponse)` | `status` | `{"Status": status, "Response": payload}` |
//! | `Err(HandlerError::Response)` | `status` | `{"Status": status, "Response": message}` |
//! | `ErrorResponse::raise()` によるパニック | `status` | 同上 |
//! | `Err(HandlerError::Internal)` / その他のパニック | 500 | `{"Status": 500, "Response": null}` |
//!
//! 内部エラーの詳細とスタックトレースは [`FaultReporter`] にのみ渡し、
//! クライアントには返さない。
//!
//! ## 障害境界
//!
//! ハンドラの実行とペイロードのエンコードはすべて [`barrier`] の内側で行う。
//! ハンドラ自身やその先のコラボレータ、`Serialize` 実装で発生したパニックはここで止まり、
//! ワーカースレッドは次のリクエストを処理し続ける。ハンドラ側でパニックを回復する必要はない。

mod barrier;
mod report;

use std::{any::Any, future::Future, sync::Arc};

use apishim_shared::{CorrelationId, ErrorResponse, SuccessResponse, to_json_string};
use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
pub use barrier::install_panic_hook;
pub(crate) use barrier::request_scope;
use barrier::{Fault, catch_fault, classify, take_site};
pub use report::{FaultReport, FaultReporter, TracingFaultReporter};
use serde::Serialize;
use thiserror::Error;

use crate::context::RequestContext;

/// 内部エラー時のボディ（`Envelope::internal_error()` のエンコード結果）
const INTERNAL_ERROR_BODY: &str = r#"{"Status":500,"Response":null}"#;

/// ハンドラが返すエラー
///
/// `?` 演算子で `ErrorResponse` と `anyhow::Error` のどちらからも変換できる。
#[derive(Debug, Error)]
pub enum HandlerError {
    /// クライアントにそのまま返すエラー（400 系など）
    #[error(transparent)]
    Response(#[from] ErrorResponse),

    /// 予期しない内部エラー（500、詳細はログのみ）
    #[error("内部エラー: {0:#}")]
    Internal(#[from] anyhow::Error),
}

/// ハンドラの戻り値
///
/// 成功・エラー・内部エラーのいずれか 1 つが必ず確定する。
pub type HandlerResult<T> = Result<SuccessResponse<T>, HandlerError>;

/// ハンドラを呼び出してレスポンスを組み立てるディスパッチャ
///
/// 内部エラーの報告先（[`FaultReporter`]）を保持する。`Clone` は安価で、
/// アプリケーション状態に入れて全リクエストで共有する。
#[derive(Clone)]
pub struct Dispatcher {
    reporter: Arc<dyn FaultReporter>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(TracingFaultReporter))
    }
}

impl Dispatcher {
    /// パニックフックは最初の生成時にプロセスへ一度だけ登録される
    pub fn new(reporter: Arc<dyn FaultReporter>) -> Self {
        install_panic_hook();
        Self { reporter }
    }

    /// ハンドラを呼び出し、結果を HTTP レスポンスに変換する
    ///
    /// どのような結果であっても、整形済みのレスポンスをちょうど 1 つ返す。
    /// パニックがこの関数の外へ伝播することはない。
    pub async fn dispatch<S, F, Fut, T>(&self, ctx: RequestContext<S>, handler: F) -> Response
    where
        F: FnOnce(RequestContext<S>) -> Fut,
        Fut: Future<Output = HandlerResult<T>>,
        T: Serialize,
    {
        let correlation_id = ctx.correlation_id().clone();

        // ハンドラの呼び出しとペイロードのエンコードはどちらも境界の内側で行う
        let outcome = catch_fault(async move {
            handler(ctx)
                .await
                .map(|success| render_success(&success))
        })
        .await;

        match outcome {
            Ok(Ok(Ok(response))) => response,
            Ok(Ok(Err(detail))) => self.internal_fault(correlation_id, detail, None),
            Ok(Err(HandlerError::Response(error))) => self.respond_error(&correlation_id, &error),
            Ok(Err(HandlerError::Internal(err))) => {
                let backtrace = err.backtrace();
                let trace = matches!(
                    backtrace.status(),
                    std::backtrace::BacktraceStatus::Captured
                )
                .then(|| backtrace.to_string());
                self.internal_fault(correlation_id, format!("{err:#}"), trace)
            }
            Err(fault) => self.recover(correlation_id, fault),
        }
    }

    /// ディスパッチ境界の外で発生したパニックをレスポンスに変換する
    ///
    /// `tower_http::catch_panic::CatchPanicLayer::custom` から呼ばれる。
    /// ルーターのパニック地点スコープの内側であれば、発生地点とスタックトレースも報告に含まれる。
    pub fn recover_panic(&self, payload: Box<dyn Any + Send + 'static>) -> Response {
        let fault = classify(payload, take_site());
        self.recover(CorrelationId::new(), fault)
    }

    fn recover(&self, correlation_id: CorrelationId, fault: Fault) -> Response {
        match fault {
            Fault::Raised(error) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    status = error.status,
                    message = %error.message,
                    "エラーレスポンスが送出されました"
                );
                self.respond_error(&correlation_id, &error)
            }
            Fault::Panic { detail, trace } => self.internal_fault(correlation_id, detail, trace),
        }
    }

    /// エラーレスポンスを書き出す
    ///
    /// ステータスコードが HTTP として不正な場合は内部エラーとして扱う。
    pub(crate) fn respond_error(
        &self,
        correlation_id: &CorrelationId,
        error: &ErrorResponse,
    ) -> Response {
        render_error(error)
            .unwrap_or_else(|detail| self.internal_fault(correlation_id.clone(), detail, None))
    }

    /// 内部エラーを報告し、500 レスポンスを返す
    fn internal_fault(
        &self,
        correlation_id: CorrelationId,
        detail: String,
        trace: Option<String>,
    ) -> Response {
        self.reporter.report(&FaultReport {
            correlation_id,
            detail,
            trace,
        });
        internal_error_response()
    }
}

/// 既定の [`Dispatcher`]（ログ出力は `tracing`）でハンドラを呼び出す
pub async fn dispatch<S, F, Fut, T>(ctx: RequestContext<S>, handler: F) -> Response
where
    F: FnOnce(RequestContext<S>) -> Fut,
    Fut: Future<Output = HandlerResult<T>>,
    T: Serialize,
{
    Dispatcher::default().dispatch(ctx, handler).await
}

/// 500 `{"Status":500,"Response":null}`
pub fn internal_error_response() -> Response {
    write_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY.to_string())
}

/// 成功レスポンスを組み立てる
///
/// `Err` は内部エラーとして報告すべき詳細。
fn render_success<T: Serialize>(success: &SuccessResponse<T>) -> Result<Response, String> {
    let status = status_code(success.status)?;
    let body = to_json_string(&success.envelope()).map_err(|e| e.to_string())?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

fn render_error(error: &ErrorResponse) -> Result<Response, String> {
    let status = status_code(error.status)?;
    let body = to_json_string(&error.envelope()).map_err(|e| e.to_string())?;
    Ok(write_error(status, body))
}

/// 汎用のエラー書き出し
///
/// ボディはエンベロープ JSON だが、`Content-Type` は成功時と異なり
/// `text/plain; charset=utf-8` と `nosniff` を付ける。
fn write_error(status: StatusCode, body: String) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}

fn status_code(status: u16) -> Result<StatusCode, String> {
    StatusCode::from_u16(status).map_err(|_| format!("不正な HTTP ステータスコード: {status}"))
}
