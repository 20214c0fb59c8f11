//! # エコーハンドラ
//!
//! `message` パラメータをそのまま返す。認証不要。

use apishim_shared::{ErrorResponse, SuccessResponse};
use serde::Serialize;

use crate::{context::RequestContext, dispatch::HandlerResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EchoData {
    pub message: String,
}

/// `message` がない、または空なら 400
pub async fn echo<S>(ctx: RequestContext<S>) -> HandlerResult<EchoData> {
    let message = ctx
        .form_value("message")
        .filter(|message| !message.is_empty())
        .ok_or_else(|| ErrorResponse::invalid_request("message is required"))?;

    Ok(SuccessResponse::ok(EchoData { message }))
}
