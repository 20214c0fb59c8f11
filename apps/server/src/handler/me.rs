//! # 認証済みユーザー情報ハンドラ
//!
//! 認証ゲートの後ろに置く。ゲートが添付したユーザーを返す。

use apishim_domain::UserId;
use apishim_shared::SuccessResponse;
use serde::Serialize;

use crate::{context::RequestContext, dispatch::HandlerResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeData {
    pub id:   UserId,
    pub name: String,
}

pub async fn me<S>(ctx: RequestContext<S>) -> HandlerResult<MeData> {
    let user = ctx.require_user()?;

    Ok(SuccessResponse::ok(MeData {
        id:   user.id().clone(),
        name: user.name().to_string(),
    }))
}
