//! # 障害境界
//!
//! Future を `catch_unwind` で包み、パニックを [`Fault`] に変換する。
//!
//! パニック発生地点のスタックトレースは巻き戻し後には取得できない。そこで
//! プロセス全体のパニックフックが task-local の記録欄に発生地点を書き込み、
//! 捕捉した側がそれを取り出す。記録欄を用意するのは次の 2 つ。
//!
//! - [`catch_fault`]: ハンドラ 1 回分の境界（ディスパッチャが使う）
//! - [`request_scope`]: リクエスト全体（ルーターの最外層のミドルウェアが使う）
//!
//! 記録欄のないところで発生したパニックは、登録前のフック（標準では stderr 出力）に渡す。

use std::{
    any::Any,
    backtrace::Backtrace,
    cell::RefCell,
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::Once,
};

use apishim_shared::ErrorResponse;
use futures::FutureExt;

tokio::task_local! {
    static PANIC_SITE: RefCell<Option<PanicSite>>;
}

static INSTALL: Once = Once::new();

/// パニックフックが記録する発生地点
#[derive(Debug)]
pub(crate) struct PanicSite {
    location:  Option<String>,
    backtrace: String,
}

/// 捕捉したパニック
#[derive(Debug)]
pub(crate) enum Fault {
    /// `ErrorResponse::raise()` による送出
    Raised(ErrorResponse),
    /// それ以外のパニック
    Panic {
        detail: String,
        trace:  Option<String>,
    },
}

/// パニックフックを登録する
///
/// 何度呼んでも登録は一度だけ。[`Dispatcher::new`](super::Dispatcher::new) から呼ばれる。
pub fn install_panic_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            // 送出されたエラーレスポンスは通常の制御フローなのでトレース不要
            let raised = info.payload().is::<ErrorResponse>();
            let in_scope = PANIC_SITE.try_with(|slot| {
                if raised {
                    return;
                }
                let site = PanicSite {
                    location:  info.location().map(ToString::to_string),
                    backtrace: Backtrace::force_capture().to_string(),
                };
                if let Ok(mut slot) = slot.try_borrow_mut() {
                    *slot = Some(site);
                }
            });
            if in_scope.is_err() {
                previous(info);
            }
        }));
    });
}

/// Future を境界の内側で実行する
///
/// パニックは `Err(Fault)` として返り、呼び出し元には伝播しない。
pub(crate) async fn catch_fault<F: Future>(future: F) -> Result<F::Output, Fault> {
    PANIC_SITE
        .scope(RefCell::new(None), async move {
            AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .map_err(|payload| classify(payload, take_site()))
        })
        .await
}

/// Future をパニック地点の記録欄つきで実行する
///
/// パニックそのものは捕捉しない。捕捉する側（`CatchPanicLayer` など）が
/// 同じスコープの内側で [`take_site`] を呼ぶ。
pub(crate) async fn request_scope<F: Future>(future: F) -> F::Output {
    PANIC_SITE.scope(RefCell::new(None), future).await
}

/// 現在のスコープに記録されたパニック地点を取り出す
pub(crate) fn take_site() -> Option<PanicSite> {
    PANIC_SITE
        .try_with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
        .ok()
        .flatten()
}

/// パニックペイロードからメッセージを取り出す
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

pub(crate) fn classify(payload: Box<dyn Any + Send>, site: Option<PanicSite>) -> Fault {
    let payload = match payload.downcast::<ErrorResponse>() {
        Ok(error) => return Fault::Raised(*error),
        Err(payload) => payload,
    };
    let message = panic_message(payload.as_ref());

    match site {
        Some(PanicSite {
            location: Some(location),
            backtrace,
        }) => Fault::Panic {
            detail: format!("{message} (at {location})"),
            trace:  Some(backtrace),
        },
        Some(PanicSite {
            location: None,
            backtrace,
        }) => Fault::Panic {
            detail: message,
            trace:  Some(backtrace),
        },
        None => Fault::Panic {
            detail: message,
            trace:  None,
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn checked_div(a: i32, b: i32) -> i32 {
        if b == 0 {
            panic!("division by zero");
        }
        a / b
    }

    fn teapot() -> u16 {
        ErrorResponse::new(418, "teapot").raise()
    }

    #[tokio::test]
    async fn test_正常終了した値をそのまま返す() {
        install_panic_hook();

        let result = catch_fault(async { 42 }).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_文字列パニックは詳細とトレースを持つ() {
        install_panic_hook();

        let result = catch_fault(async {
            tokio::task::yield_now().await;
            checked_div(1, 0)
        })
        .await;

        let Err(Fault::Panic { detail, trace }) = result else {
            panic!("expected Fault::Panic");
        };
        assert!(detail.starts_with("division by zero"));
        assert!(detail.contains("barrier.rs"));
        assert!(trace.is_some());
    }

    #[tokio::test]
    async fn test_送出されたエラーレスポンスはraisedになる() {
        install_panic_hook();

        let result = catch_fault(async { teapot() }).await;

        let Err(Fault::Raised(error)) = result else {
            panic!("expected Fault::Raised");
        };
        assert_eq!(error, ErrorResponse::new(418, "teapot"));
    }

    #[tokio::test]
    async fn test_境界を抜けると記録欄は残らない() {
        install_panic_hook();

        let result = catch_fault(async { checked_div(1, 0) }).await;

        assert!(result.is_err());
        assert!(take_site().is_none());
    }

    #[tokio::test]
    async fn test_リクエストスコープ内のパニック地点を取り出せる() {
        install_panic_hook();

        let site = request_scope(async {
            let caught = AssertUnwindSafe(async { checked_div(1, 0) })
                .catch_unwind()
                .await;
            assert!(caught.is_err());
            take_site()
        })
        .await;

        let site = site.expect("パニック地点が記録されていること");
        assert!(site.location.is_some_and(|location| location.contains("barrier.rs")));
        assert!(!site.backtrace.is_empty());
    }

    #[test]
    fn test_地点がなければトレースなしのパニックになる() {
        let fault = classify(Box::new("boom"), None);

        let Fault::Panic { detail, trace } = fault else {
            panic!("expected Fault::Panic");
        };
        assert_eq!(detail, "boom");
        assert_eq!(trace, None);
    }

    #[test]
    fn test_panic_messageは未知のペイロードを既定文言にする() {
        assert_eq!(panic_message(&42_i32), "Unknown panic");
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
    }
}
