//! # 内部エラーの報告先
//!
//! ディスパッチ境界で捕捉した予期しないエラーの詳細とスタックトレースを受け取る。
//! 報告は投げっぱなしで、戻り値は使わない。

use apishim_shared::CorrelationId;

/// 1 件の内部エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    pub correlation_id: CorrelationId,
    /// エラーメッセージ（パニックの場合は発生地点を含む）
    pub detail:         String,
    /// スタックトレース（取得できた場合のみ）
    pub trace:          Option<String>,
}

/// 内部エラーの報告先
pub trait FaultReporter: Send + Sync {
    fn report(&self, report: &FaultReport);
}

/// `tracing` の ERROR イベントとして出力する報告先
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFaultReporter;

impl FaultReporter for TracingFaultReporter {
    fn report(&self, report: &FaultReport) {
        tracing::error!(
            correlation_id = %report.correlation_id,
            detail = %report.detail,
            trace = report.trace.as_deref(),
            "ハンドラで予期しないエラーが発生しました"
        );
    }
}
