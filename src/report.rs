//! Flat serialization of analysis results for display and for grounding a
//! downstream natural-language explainer.
//!
//! Values are copied verbatim from the four pipeline outputs (keyframes,
//! metrics, score, flaws); nothing is recomputed or fabricated here.

use serde::Serialize;

use crate::analysis::keyframes::KeyframeId;
use crate::analysis::metrics::UnavailableReason;
use crate::analysis::{Analysis, Flaw};
use crate::config::{ActionConfig, Unit};

/// 解析結果のフラットな表現
#[derive(Debug, Clone, Serialize)]
pub struct GroundingReport {
    pub action: String,
    pub action_label: String,
    /// 検出できたキーフレームのみ（absent は載せない）
    pub keyframes: Vec<KeyframeLine>,
    /// 設定の宣言順
    pub metrics: Vec<MetricLine>,
    pub score: ScoreLine,
    pub flaws: Vec<Flaw>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyframeLine {
    pub name: &'static str,
    pub position: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricLine {
    pub name: String,
    pub label: String,
    pub unit: Unit,
    /// unavailable なら None（0ではない）
    pub value: Option<f64>,
    pub unavailable_reason: Option<UnavailableReason>,
    pub ideal: [f32; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreLine {
    pub overall: u8,
    pub confidence: f32,
    pub breakdown: Vec<CategoryLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryLine {
    pub category: String,
    pub score: f32,
}

impl GroundingReport {
    pub fn new(analysis: &Analysis, action: &ActionConfig) -> Self {
        let mut keyframes = Vec::new();
        for id in [
            KeyframeId::Start,
            KeyframeId::PeakDisplacement,
            KeyframeId::Release,
            KeyframeId::End,
        ] {
            if let Some(position) = analysis.keyframes.get(id) {
                keyframes.push(KeyframeLine {
                    name: id.name(),
                    position,
                });
            }
        }

        let metrics = action
            .metrics
            .iter()
            .filter_map(|def| {
                let value = analysis.metrics.get(&def.name)?;
                let unavailable_reason = match value {
                    crate::analysis::MetricValue::Unavailable { reason } => Some(*reason),
                    _ => None,
                };
                Some(MetricLine {
                    name: def.name.clone(),
                    label: def.label.clone(),
                    unit: def.unit,
                    value: value.value(),
                    unavailable_reason,
                    ideal: def.ideal,
                })
            })
            .collect();

        let breakdown = analysis
            .score
            .breakdown
            .iter()
            .map(|(category, score)| CategoryLine {
                category: category.clone(),
                score: *score,
            })
            .collect();

        Self {
            action: analysis.action.clone(),
            action_label: action.label.clone(),
            keyframes,
            metrics,
            score: ScoreLine {
                overall: analysis.score.overall,
                confidence: analysis.score.confidence,
                breakdown,
            },
            flaws: analysis.flaws.clone(),
            diagnostics: analysis.diagnostics.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
