//! # アプリケーション構築
//!
//! ルーターとアプリケーション状態を組み立てる。
//!
//! ```text
//! GET  /health        ヘルスチェック（エンベロープなし）
//! *    /api/v1/echo   ディスパッチのみ
//! *    /api/v1/me     認証ゲート → ディスパッチ
//! ```

use std::{any::Any, sync::Arc};

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::{
    auth::Authenticator,
    context::RequestContext,
    dispatch::{Dispatcher, request_scope},
    handler,
};

/// 全リクエストで共有するアプリケーション状態
///
/// `S` はリクエストごとのコンテキストに渡すストレージハンドル型。
#[derive(Clone)]
pub struct AppState<S>
where
    S: Send + Sync + 'static,
{
    pub dispatcher:    Dispatcher,
    pub storage:       Option<S>,
    pub authenticator: Arc<dyn Authenticator<S>>,
}

impl<S> AppState<S>
where
    S: Send + Sync + 'static,
{
    pub fn new(storage: Option<S>, authenticator: Arc<dyn Authenticator<S>>) -> Self {
        Self {
            dispatcher: Dispatcher::default(),
            storage,
            authenticator,
        }
    }

    /// 内部エラーの報告先を差し替える
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }
}

/// ルーターを構築する
///
/// `CatchPanicLayer` はディスパッチ境界の外（抽出器や認証器など）で起きたパニック用。
/// 報告先はディスパッチャと同じ。最外層の [`panic_site_scope`] があるので、
/// その場合も発生地点とスタックトレースが報告に含まれる。
pub fn router<S>(state: AppState<S>) -> Router
where
    S: Clone + Send + Sync + 'static,
{
    let dispatcher = state.dispatcher.clone();

    Router::new()
        .route("/health", get(handler::health_check))
        .route("/api/v1/echo", get(echo::<S>).post(echo::<S>))
        .route("/api/v1/me", get(me::<S>).post(me::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(
            move |payload: Box<dyn Any + Send + 'static>| dispatcher.recover_panic(payload),
        ))
        .layer(middleware::from_fn(panic_site_scope))
        .with_state(state)
}

/// リクエスト全体をパニック地点の記録欄つきで処理するミドルウェア
async fn panic_site_scope(request: Request, next: Next) -> Response {
    request_scope(next.run(request)).await
}

async fn echo<S>(State(state): State<AppState<S>>, ctx: RequestContext<S>) -> Response
where
    S: Clone + Send + Sync + 'static,
{
    state.dispatcher.dispatch(ctx, handler::echo).await
}

async fn me<S>(State(state): State<AppState<S>>, ctx: RequestContext<S>) -> Response
where
    S: Clone + Send + Sync + 'static,
{
    state
        .dispatcher
        .authenticate(ctx, state.authenticator.as_ref(), handler::me)
        .await
}
