//! # 認証ゲート
//!
//! 保護対象のハンドラの前段で、リクエストの `token` パラメータを検証する。
//!
//! ```text
//! token なし / 空      → 401 "Missing Token"（ハンドラは呼ばない）
//! 認証器が None を返す → 401 "Not Authorized"（ハンドラは呼ばない）
//! 認証器が Some を返す → ユーザーをコンテキストに添付してディスパッチ
//! ```
//!
//! 認証失敗時はハンドラが動かないため、障害境界を経由しない。

use std::future::Future;

use apishim_domain::{AuthToken, AuthenticatedUser};
use apishim_infra::RedisTokenStore;
use apishim_shared::ErrorResponse;
use async_trait::async_trait;
use axum::response::Response;
use serde::Serialize;

use crate::{
    context::RequestContext,
    dispatch::{Dispatcher, HandlerResult},
};

/// トークンを受け取るフォームパラメータ名
pub const TOKEN_PARAM: &str = "token";

/// トークンをユーザーに解決する外部認証器
///
/// `Some` は認証成功、`None` は失敗を表す。参照先のストアは実装の自由。
#[async_trait]
pub trait Authenticator<S>: Send + Sync
where
    S: Send + Sync + 'static,
{
    async fn authenticate(
        &self,
        ctx: &RequestContext<S>,
        token: &AuthToken,
    ) -> Option<AuthenticatedUser>;
}

/// すべてのトークンを拒否する認証器
///
/// トークンストアが設定されていない環境で使う。
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllAuthenticator;

#[async_trait]
impl<S> Authenticator<S> for DenyAllAuthenticator
where
    S: Send + Sync + 'static,
{
    async fn authenticate(
        &self,
        _ctx: &RequestContext<S>,
        _token: &AuthToken,
    ) -> Option<AuthenticatedUser> {
        None
    }
}

/// Redis のトークンストアで認証する
///
/// ストアとの通信エラーはログに出し、認証失敗として扱う。
#[async_trait]
impl<S> Authenticator<S> for RedisTokenStore
where
    S: Send + Sync + 'static,
{
    async fn authenticate(
        &self,
        ctx: &RequestContext<S>,
        token: &AuthToken,
    ) -> Option<AuthenticatedUser> {
        match self.lookup(token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(
                    correlation_id = %ctx.correlation_id(),
                    error = %e,
                    "トークンの照合に失敗しました"
                );
                None
            }
        }
    }
}

impl Dispatcher {
    /// トークンを検証してからハンドラをディスパッチする
    ///
    /// 認証に成功した場合のみ [`dispatch`](Dispatcher::dispatch) に委譲するので、
    /// ディスパッチの保証（レスポンスは必ず 1 つ、パニックは伝播しない）がそのまま適用される。
    pub async fn authenticate<S, A, F, Fut, T>(
        &self,
        mut ctx: RequestContext<S>,
        authenticator: &A,
        handler: F,
    ) -> Response
    where
        S: Send + Sync + 'static,
        A: Authenticator<S> + ?Sized,
        F: FnOnce(RequestContext<S>) -> Fut,
        Fut: Future<Output = HandlerResult<T>>,
        T: Serialize,
    {
        let Some(token) = ctx.form_value(TOKEN_PARAM).and_then(AuthToken::new) else {
            tracing::debug!(correlation_id = %ctx.correlation_id(), "token パラメータがありません");
            return self.respond_error(ctx.correlation_id(), &ErrorResponse::missing_token());
        };

        let Some(user) = authenticator.authenticate(&ctx, &token).await else {
            tracing::info!(correlation_id = %ctx.correlation_id(), "トークンが認証されませんでした");
            return self.respond_error(ctx.correlation_id(), &ErrorResponse::not_authorized());
        };

        tracing::debug!(
            correlation_id = %ctx.correlation_id(),
            user_id = %user.id(),
            "認証に成功しました"
        );
        ctx.attach_user(user);
        self.dispatch(ctx, handler).await
    }
}

/// 既定の [`Dispatcher`] で認証ゲートを通す
pub async fn authenticate<S, A, F, Fut, T>(
    ctx: RequestContext<S>,
    authenticator: &A,
    handler: F,
) -> Response
where
    S: Send + Sync + 'static,
    A: Authenticator<S> + ?Sized,
    F: FnOnce(RequestContext<S>) -> Fut,
    Fut: Future<Output = HandlerResult<T>>,
    T: Serialize,
{
    Dispatcher::default()
        .authenticate(ctx, authenticator, handler)
        .await
}
