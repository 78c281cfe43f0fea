use serde::Serialize;
use std::collections::BTreeSet;

use crate::analysis::metrics::MetricSet;
use crate::config::{FlawRule, MetricDef, RuleCondition, Severity};

/// 検出された技術的欠陥
///
/// severity と injury_risk は独立した属性（低重大度でも
/// 傷害リスクはあり得る）。解析ごとに新規生成し、変更しない
#[derive(Debug, Clone, Serialize)]
pub struct Flaw {
    pub id: String,
    pub title: String,
    pub category: String,
    pub severity: Severity,
    pub injury_risk: bool,
    /// 修正ガイダンス
    pub correction: String,
    /// 起因メトリクス（表示用）
    pub metric: String,
    /// 実測値
    pub observed: f64,
    /// 理想レンジ
    pub ideal: [f32; 2],
    /// 補助ドリル
    pub drill: Option<String>,
    /// 参考リンク
    pub reference: Option<String>,
}

/// 欠陥検出器
///
/// ルール表を MetricSet に対して評価する。参照メトリクスが
/// unavailable のルールは発火ではなく抑制（データ欠落が欠陥を
/// 捏造しない）。全メトリクスが許容内なら空リスト = 正常
pub struct FlawDetector;

impl FlawDetector {
    /// 重大度の高い順（同順位はルール表の宣言順）で返す
    pub fn detect(metrics: &MetricSet, rules: &[FlawRule], defs: &[MetricDef]) -> Vec<Flaw> {
        let mut seen_ids: BTreeSet<&str> = BTreeSet::new();
        let mut flaws: Vec<Flaw> = Vec::new();

        for rule in rules {
            // 同一IDは表で先に宣言されたものだけ評価
            if !seen_ids.insert(rule.id.as_str()) {
                continue;
            }
            if rule.when.is_empty() {
                continue;
            }

            let mut fired = true;
            for condition in &rule.when {
                match Self::evaluate(condition, metrics, defs) {
                    Some(true) => {}
                    // 不成立 or メトリクス欠落 → ルール全体を抑制
                    _ => {
                        fired = false;
                        break;
                    }
                }
            }
            if !fired {
                continue;
            }

            // 表示用の実測値: 先頭条件のメトリクス
            let metric_name = rule.when[0].metric();
            let Some(observed) = metrics.value(metric_name) else {
                continue;
            };
            let Some(def) = defs.iter().find(|d| d.name == metric_name) else {
                log::warn!(
                    "rule {} references metric {} with no definition, skipped",
                    rule.id,
                    metric_name
                );
                continue;
            };

            flaws.push(Flaw {
                id: rule.id.clone(),
                title: rule.title.clone(),
                category: rule.category.clone(),
                severity: rule.severity,
                injury_risk: rule.injury_risk,
                correction: rule.correction.clone(),
                metric: metric_name.to_string(),
                observed,
                ideal: def.ideal,
                drill: rule.drill.clone(),
                reference: rule.reference.clone(),
            });
        }

        // 安定ソート: 同重大度は宣言順を保つ
        flaws.sort_by(|a, b| b.severity.cmp(&a.severity));
        flaws
    }

    /// 条件評価。メトリクスが unavailable なら None
    fn evaluate(
        condition: &RuleCondition,
        metrics: &MetricSet,
        defs: &[MetricDef],
    ) -> Option<bool> {
        let value = metrics.value(condition.metric())?;
        match condition {
            RuleCondition::Below { value: threshold, .. } => Some(value < *threshold as f64),
            RuleCondition::Above { value: threshold, .. } => Some(value > *threshold as f64),
            RuleCondition::OutsideIdeal { metric, margin } => {
                let def = defs.iter().find(|d| d.name == *metric)?;
                let lo = (def.ideal[0] - margin) as f64;
                let hi = (def.ideal[1] + margin) as f64;
                Some(value < lo || value > hi)
            }
        }
    }
}
