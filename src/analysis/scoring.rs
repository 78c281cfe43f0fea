use serde::Serialize;
use std::collections::BTreeMap;

use crate::analysis::metrics::MetricSet;
use crate::config::{Falloff, MetricDef, ScoreMode, ScoringConfig};

/// 採点結果
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    /// 総合スコア (0〜100)
    pub overall: u8,
    /// カテゴリ別サブスコア (0〜100)
    /// 算出可能なメトリクスが1つも無いカテゴリは0ではなく省略
    pub breakdown: BTreeMap<String, f32>,
    /// 設定された全メトリクス中、算出できた割合 (0〜1)
    /// 「低得点」と「データ不足」を呼び出し側が区別するための値
    pub confidence: f32,
}

/// 採点エンジン
///
/// 各メトリクスを理想レンジに対する 0〜100 のサブスコアへ写像し、
/// カテゴリ → 総合の重み付き平均で集計する。乱数・時刻依存なしの
/// 純関数（同一入力は常に同一結果）
pub struct ScoringEngine {
    falloff: Falloff,
}

impl ScoringEngine {
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            falloff: config.falloff,
        }
    }

    pub fn score(&self, metrics: &MetricSet, defs: &[MetricDef]) -> ScoreResult {
        // カテゴリ → (重み合計, 重み付きスコア合計)
        let mut categories: BTreeMap<&str, (f32, f32)> = BTreeMap::new();
        let mut available = 0usize;

        for def in defs {
            let Some(value) = metrics.value(&def.name) else {
                continue;
            };
            available += 1;
            let subscore = self.metric_subscore(def, value);
            let entry = categories.entry(def.category.as_str()).or_insert((0.0, 0.0));
            entry.0 += def.weight;
            entry.1 += def.weight * subscore;
        }

        let mut breakdown = BTreeMap::new();
        let mut total_weight = 0.0f32;
        let mut weighted_sum = 0.0f32;
        for (category, (weight, sum)) in &categories {
            if *weight <= 0.0 {
                continue;
            }
            let category_score = sum / weight;
            breakdown.insert(category.to_string(), category_score);
            total_weight += weight;
            weighted_sum += weight * category_score;
        }

        let overall = if total_weight > 0.0 {
            (weighted_sum / total_weight).round().clamp(0.0, 100.0) as u8
        } else {
            0
        };

        let confidence = if defs.is_empty() {
            0.0
        } else {
            available as f32 / defs.len() as f32
        };

        ScoreResult {
            overall,
            breakdown,
            confidence,
        }
    }

    /// 単一メトリクスのサブスコア (0〜100)
    /// レンジ内は100。レンジ外は falloff に従い max_deviation で0に到達
    /// （負値にはならない）
    pub fn metric_subscore(&self, def: &MetricDef, value: f64) -> f32 {
        let lo = def.ideal[0] as f64;
        let hi = def.ideal[1] as f64;
        if value >= lo && value <= hi {
            return 100.0;
        }

        if def.score_mode == ScoreMode::WithinOnly {
            return 0.0;
        }

        let deviation = if value < lo { lo - value } else { value - hi };
        let max_deviation = def.max_deviation as f64;
        if max_deviation <= 0.0 {
            return 0.0;
        }
        let t = (deviation / max_deviation).min(1.0);
        let score = match self.falloff {
            Falloff::Linear => 100.0 * (1.0 - t),
            Falloff::Cosine => 50.0 * (1.0 + (std::f64::consts::PI * t).cos()),
        };
        score.max(0.0) as f32
    }
}
