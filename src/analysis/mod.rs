//! セッション解析パイプライン
//!
//! 1回の解析は、ランドマーク列に対する同期的な純関数:
//! スムージング → キーフレーム検出 → メトリクス算出 → {採点, 欠陥検出}
//! の順で各ステージが前段の出力のみに依存する。
//! 隠れた共有可変状態を持たないため、別セッションの解析は並行実行できる。

pub mod anthropometry;
pub mod flaws;
pub mod keyframes;
pub mod metrics;
pub mod scoring;
pub mod smooth;

pub use flaws::{Flaw, FlawDetector};
pub use keyframes::{KeyframeDetector, KeyframeId, KeyframeOutcome, Keyframes};
pub use metrics::{MetricCalculator, MetricSet, MetricValue, UnavailableReason};
pub use scoring::{ScoreResult, ScoringEngine};
pub use smooth::Smoother;

use serde::Serialize;

use crate::config::Config;
use crate::error::AnalysisError;
use crate::pose::LandmarkSequence;

/// 解析リクエスト
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// アクションID（設定のキー）
    pub action: String,
    /// 身長（メートル）。無ければ正規化メトリクスが unavailable になる
    pub height_m: Option<f32>,
    /// サンプルレート（Hz）。無ければタイムスタンプから推定を試みる
    pub sample_rate_hz: Option<f64>,
}

impl AnalysisRequest {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            height_m: None,
            sample_rate_hz: None,
        }
    }
}

/// 解析結果一式
/// 1回の解析で生成され、以後変更されない
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub action: String,
    pub keyframes: Keyframes,
    /// キーフレーム検出の診断（破棄の記録など）
    pub diagnostics: Vec<String>,
    pub metrics: MetricSet,
    pub score: ScoreResult,
    /// 重大度の高い順
    pub flaws: Vec<Flaw>,
}

/// セッション解析の実行
///
/// 致命的エラーは空シーケンスと未知アクションのみ
/// （フレーム順の異常は LandmarkSequence 構築時に弾かれている）。
/// データ不足はエラーにせず、absent / unavailable と confidence で伝える
pub fn analyze(
    sequence: &LandmarkSequence,
    request: &AnalysisRequest,
    config: &Config,
) -> Result<Analysis, AnalysisError> {
    if sequence.is_empty() {
        return Err(AnalysisError::EmptySequence);
    }
    let action = config
        .action(&request.action)
        .ok_or_else(|| AnalysisError::UnknownAction(request.action.clone()))?;

    // ステージ1: スムージング
    let smoother = Smoother::from_config(&config.smooth);
    let smoothed = smoother.apply(sequence);

    // ステージ2: キーフレーム検出
    let detector = KeyframeDetector::from_config(&action.keyframes);
    let outcome = detector.detect(&smoothed);

    // ステージ3: メトリクス算出
    let sample_rate = request
        .sample_rate_hz
        .or_else(|| sequence.estimate_sample_rate_hz());
    let calculator = MetricCalculator::new(
        action.keyframes.min_confidence,
        request.height_m,
        sample_rate,
    );
    let metric_set = calculator.compute(&smoothed, &outcome.keyframes, &action.metrics);

    // ステージ4・5: 採点と欠陥検出（どちらもメトリクスのみ読む）
    let score = ScoringEngine::from_config(&action.scoring).score(&metric_set, &action.metrics);
    let flaws = FlawDetector::detect(&metric_set, &action.rules, &action.metrics);

    Ok(Analysis {
        action: request.action.clone(),
        keyframes: outcome.keyframes,
        diagnostics: outcome.diagnostics,
        metrics: metric_set,
        score,
        flaws,
    })
}
