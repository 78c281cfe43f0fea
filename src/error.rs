use thiserror::Error;

/// パイプラインの致命的エラー
///
/// 「データ不足」はエラーにしない方針:
/// キーフレーム欠落・メトリクス算出不能は結果側（absent / unavailable）で
/// 表現し、ScoreResult の confidence で劣化を伝える。
/// ここに載るのは解析を開始できない入力・設定の異常のみ。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// 空のシーケンス
    #[error("landmark sequence is empty")]
    EmptySequence,

    /// フレームインデックスが昇順でない
    #[error("frame indices are not strictly increasing at position {position}")]
    UnorderedFrames { position: usize },

    /// フレームインデックスに欠番がある
    /// （未検出は信頼度0のフレームとして入れる契約のため、欠番は入力異常）
    #[error("frame index gap at position {position} (expected {expected}, got {got})")]
    GappedFrames {
        position: usize,
        expected: u32,
        got: u32,
    },

    /// 要求されたアクションの設定が存在しない
    #[error("unknown action: {0}")]
    UnknownAction(String),
}
