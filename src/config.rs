use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::analysis::anthropometry::BodySegment;
use crate::analysis::keyframes::KeyframeId;
use crate::pose::LandmarkIndex;

/// 解析設定
///
/// アクションごとのキーフレーム閾値・メトリクス定義・採点・欠陥ルールを
/// config.toml から読み込む。グローバル可変状態にはせず、読み込んだ設定を
/// 参照で各ステージに渡す。
///
/// ```toml
/// [smooth]
/// window = 5
///
/// [actions.jump_shot]
/// label = "ジャンプシュート"
///
/// [actions.jump_shot.keyframes]
/// onset_landmark = "right_wrist"
/// track_landmark = "left_hip"
/// release_landmark = "right_wrist"
///
/// [[actions.jump_shot.metrics]]
/// name = "release_elbow_angle"
/// label = "リリース肘角度"
/// unit = "deg"
/// category = "release"
/// ideal = [160.0, 180.0]
/// max_deviation = 40.0
/// kind = { type = "joint_angle", joint = "right_elbow", from = "right_shoulder", to = "right_wrist", at = "release" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub smooth: SmoothConfig,
    #[serde(default = "builtin_actions")]
    pub actions: BTreeMap<String, ActionConfig>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("config load failed ({}), using built-in defaults", err);
                Self::default()
            }
        }
    }

    pub fn action(&self, id: &str) -> Option<&ActionConfig> {
        self.actions.get(id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smooth: SmoothConfig::default(),
            actions: builtin_actions(),
        }
    }
}

/// スムージング設定
#[derive(Debug, Clone, Deserialize)]
pub struct SmoothConfig {
    /// 移動平均の窓幅（フレーム、中心窓）
    #[serde(default = "default_smooth_window")]
    pub window: usize,
    /// 窓内でこの信頼度未満のサンプルは平均から除外
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// 窓内の有効サンプル率がこれ未満ならスムージングせず素通し
    /// （疎なデータからトレンドを捏造しない）
    #[serde(default = "default_min_coverage")]
    pub min_coverage: f32,
}

fn default_smooth_window() -> usize {
    5
}
fn default_min_confidence() -> f32 {
    0.3
}
fn default_min_coverage() -> f32 {
    0.6
}

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            window: default_smooth_window(),
            min_confidence: default_min_confidence(),
            min_coverage: default_min_coverage(),
        }
    }
}

/// 1アクション分の設定
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    /// 表示名
    pub label: String,
    pub keyframes: KeyframeConfig,
    #[serde(default)]
    pub metrics: Vec<MetricDef>,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub rules: Vec<FlawRule>,
}

/// キーフレーム検出の閾値
/// アクションごとに異なるため定数にしない
#[derive(Debug, Clone, Deserialize)]
pub struct KeyframeConfig {
    /// これ未満のフレーム数は全キーフレーム absent
    #[serde(default = "default_min_frames")]
    pub min_frames: usize,
    /// ランドマーク有効判定の信頼度閾値
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// 動作開始判定に使うランドマーク
    pub onset_landmark: LandmarkIndex,
    /// 開始判定の速度閾値（メートル/フレーム）
    #[serde(default = "default_onset_velocity")]
    pub onset_velocity: f32,
    /// 垂直変位ピークの追跡ランドマーク
    pub track_landmark: LandmarkIndex,
    #[serde(default)]
    pub peak_direction: PeakDirection,
    /// リリース判定に使う末端ランドマーク
    pub release_landmark: LandmarkIndex,
    /// リリース判定の速度閾値（メートル/フレーム）
    #[serde(default = "default_release_velocity")]
    pub release_velocity: f32,
    #[serde(default)]
    pub release_direction: ReleaseDirection,
    /// ピーク後、リリースを探す最大フレーム数
    /// 無関係な後続動作へのロックオンを防ぐ
    #[serde(default = "default_release_window")]
    pub release_window: usize,
    /// 停止判定の全身平均速度閾値（メートル/フレーム）
    #[serde(default = "default_stop_velocity")]
    pub stop_velocity: f32,
}

fn default_min_frames() -> usize {
    10
}
fn default_onset_velocity() -> f32 {
    0.01
}
fn default_release_velocity() -> f32 {
    0.04
}
fn default_release_window() -> usize {
    20
}
fn default_stop_velocity() -> f32 {
    0.008
}

/// 垂直ピークの向き
/// カメラ座標はY下向きのため、up = yの最小値
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakDirection {
    #[default]
    Up,
    Down,
}

/// リリース速度の判定方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseDirection {
    Up,
    Down,
    /// 方向を問わず速度の大きさで判定
    #[default]
    Outward,
}

/// メトリクス定義
#[derive(Debug, Clone, Deserialize)]
pub struct MetricDef {
    pub name: String,
    /// 表示名
    pub label: String,
    pub unit: Unit,
    /// 採点カテゴリ（breakdown のキー）
    pub category: String,
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// 理想レンジ [lo, hi]。レンジ内はサブスコア100
    pub ideal: [f32; 2],
    /// レンジ境界からこの量逸脱するとサブスコア0
    pub max_deviation: f32,
    #[serde(default)]
    pub score_mode: ScoreMode,
    pub kind: MetricKind,
}

fn default_weight() -> f32 {
    1.0
}

/// メトリクス単位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// 角度（度）
    Deg,
    /// 時間（ミリ秒）
    Ms,
    /// 身体スケール比
    Ratio,
    /// 無次元指数 (0〜1)
    Index,
}

impl Unit {
    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Deg => "°",
            Unit::Ms => "ms",
            Unit::Ratio => "",
            Unit::Index => "",
        }
    }
}

/// レンジ外の採点方式
/// closer-to-range-is-better と strictly-within-range の2通り
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// 逸脱量に応じて減点（max_deviation で0点）
    #[default]
    Deviation,
    /// レンジ外は即0点
    WithinOnly,
}

/// メトリクスの算出式
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricKind {
    /// 3点関節角度: joint を頂点とする from / to へのベクトルのなす角（度）
    JointAngle {
        joint: LandmarkIndex,
        from: LandmarkIndex,
        to: LandmarkIndex,
        at: KeyframeId,
    },
    /// キーフレーム間の時間差（ミリ秒）。サンプルレート必須
    KeyframeOffset { from: KeyframeId, to: KeyframeId },
    /// start→peak の垂直変位を身長×体節比で正規化。身長必須
    NormalizedDisplacement {
        landmark: LandmarkIndex,
        segment: BodySegment,
    },
    /// 窓内の位置分散に基づく安定性指数 (0〜1]
    Stability {
        landmark: LandmarkIndex,
        from: KeyframeId,
        to: KeyframeId,
        #[serde(default = "default_stability_gain")]
        gain: f32,
    },
    /// リリース後の減速に基づくフォロースルー指数 [0〜1]
    FollowThrough {
        landmark: LandmarkIndex,
        #[serde(default = "default_follow_window")]
        window: usize,
    },
}

fn default_stability_gain() -> f32 {
    100.0
}
fn default_follow_window() -> usize {
    12
}

/// 採点設定
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringConfig {
    /// レンジ外の減衰形状
    #[serde(default)]
    pub falloff: Falloff,
}

/// サブスコアの減衰形状
/// 最適な形は計測データで検証すべきチューニング項目のため設定に出す
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Falloff {
    #[default]
    Linear,
    Cosine,
}

/// 欠陥の重大度
/// 傷害リスクとは独立（低重大度でも傷害リスクはあり得る）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// 欠陥検出ルール
#[derive(Debug, Clone, Deserialize)]
pub struct FlawRule {
    /// 同一IDのルールは最初の1件のみ有効
    pub id: String,
    pub title: String,
    pub category: String,
    pub severity: Severity,
    #[serde(default)]
    pub injury_risk: bool,
    /// 修正ガイダンス
    pub correction: String,
    /// 補助ドリル名
    #[serde(default)]
    pub drill: Option<String>,
    /// 参考リンク
    #[serde(default)]
    pub reference: Option<String>,
    /// 全条件成立で発火（AND）。参照メトリクスが1つでも
    /// unavailable ならルールは抑制される
    pub when: Vec<RuleCondition>,
}

/// ルール条件
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCondition {
    Below { metric: String, value: f32 },
    Above { metric: String, value: f32 },
    /// 理想レンジから margin を超えて逸脱
    OutsideIdeal {
        metric: String,
        #[serde(default)]
        margin: f32,
    },
}

impl RuleCondition {
    pub fn metric(&self) -> &str {
        match self {
            RuleCondition::Below { metric, .. } => metric,
            RuleCondition::Above { metric, .. } => metric,
            RuleCondition::OutsideIdeal { metric, .. } => metric,
        }
    }
}

/// 組み込みアクション設定
/// config.toml が無い環境でも参照実装として動く
fn builtin_actions() -> BTreeMap<String, ActionConfig> {
    let mut actions = BTreeMap::new();
    actions.insert("jump_shot".to_string(), jump_shot_action());
    actions.insert("squat".to_string(), squat_action());
    actions
}

fn jump_shot_action() -> ActionConfig {
    ActionConfig {
        label: "ジャンプシュート".to_string(),
        keyframes: KeyframeConfig {
            min_frames: default_min_frames(),
            min_confidence: default_min_confidence(),
            onset_landmark: LandmarkIndex::RightWrist,
            onset_velocity: default_onset_velocity(),
            track_landmark: LandmarkIndex::LeftHip,
            peak_direction: PeakDirection::Up,
            release_landmark: LandmarkIndex::RightWrist,
            release_velocity: default_release_velocity(),
            release_direction: ReleaseDirection::Outward,
            release_window: default_release_window(),
            stop_velocity: default_stop_velocity(),
        },
        metrics: vec![
            MetricDef {
                name: "knee_load_angle".to_string(),
                label: "沈み込み膝角度".to_string(),
                unit: Unit::Deg,
                category: "lower_body".to_string(),
                weight: 1.0,
                ideal: [110.0, 140.0],
                max_deviation: 40.0,
                score_mode: ScoreMode::Deviation,
                kind: MetricKind::JointAngle {
                    joint: LandmarkIndex::RightKnee,
                    from: LandmarkIndex::RightHip,
                    to: LandmarkIndex::RightAnkle,
                    at: KeyframeId::Start,
                },
            },
            MetricDef {
                name: "release_elbow_angle".to_string(),
                label: "リリース肘角度".to_string(),
                unit: Unit::Deg,
                category: "release".to_string(),
                weight: 1.5,
                ideal: [160.0, 180.0],
                max_deviation: 50.0,
                score_mode: ScoreMode::Deviation,
                kind: MetricKind::JointAngle {
                    joint: LandmarkIndex::RightElbow,
                    from: LandmarkIndex::RightShoulder,
                    to: LandmarkIndex::RightWrist,
                    at: KeyframeId::Release,
                },
            },
            MetricDef {
                name: "release_timing".to_string(),
                label: "リリースタイミング".to_string(),
                unit: Unit::Ms,
                category: "release".to_string(),
                weight: 1.0,
                ideal: [0.0, 180.0],
                max_deviation: 250.0,
                score_mode: ScoreMode::Deviation,
                kind: MetricKind::KeyframeOffset {
                    from: KeyframeId::PeakDisplacement,
                    to: KeyframeId::Release,
                },
            },
            MetricDef {
                name: "jump_height".to_string(),
                label: "ジャンプ高".to_string(),
                unit: Unit::Ratio,
                category: "lower_body".to_string(),
                weight: 1.0,
                ideal: [0.15, 0.45],
                max_deviation: 0.3,
                score_mode: ScoreMode::Deviation,
                kind: MetricKind::NormalizedDisplacement {
                    landmark: LandmarkIndex::LeftHip,
                    segment: BodySegment::HipHeight,
                },
            },
            MetricDef {
                name: "core_stability".to_string(),
                label: "体幹安定性".to_string(),
                unit: Unit::Index,
                category: "stability".to_string(),
                weight: 1.0,
                ideal: [0.7, 1.0],
                max_deviation: 0.6,
                score_mode: ScoreMode::Deviation,
                kind: MetricKind::Stability {
                    landmark: LandmarkIndex::LeftHip,
                    from: KeyframeId::Start,
                    to: KeyframeId::Release,
                    gain: default_stability_gain(),
                },
            },
            MetricDef {
                name: "follow_through".to_string(),
                label: "フォロースルー".to_string(),
                unit: Unit::Index,
                category: "release".to_string(),
                weight: 0.5,
                ideal: [0.5, 1.0],
                max_deviation: 0.5,
                score_mode: ScoreMode::Deviation,
                kind: MetricKind::FollowThrough {
                    landmark: LandmarkIndex::RightWrist,
                    window: default_follow_window(),
                },
            },
        ],
        scoring: ScoringConfig::default(),
        rules: vec![
            FlawRule {
                id: "shallow_knee_bend".to_string(),
                title: "沈み込み不足".to_string(),
                category: "lower_body".to_string(),
                severity: Severity::Medium,
                injury_risk: false,
                correction: "シュート前にもう一段深く膝を曲げ、脚の力をボールに伝える".to_string(),
                drill: Some("チェアシューティング".to_string()),
                reference: None,
                when: vec![RuleCondition::Above {
                    metric: "knee_load_angle".to_string(),
                    value: 155.0,
                }],
            },
            FlawRule {
                id: "bent_elbow_release".to_string(),
                title: "肘の伸び不足".to_string(),
                category: "release".to_string(),
                severity: Severity::High,
                injury_risk: false,
                correction: "リリースで肘を伸ばし切り、指先でボールを押し出す".to_string(),
                drill: Some("ワンハンドフォームシューティング".to_string()),
                reference: None,
                when: vec![RuleCondition::Below {
                    metric: "release_elbow_angle".to_string(),
                    value: 145.0,
                }],
            },
            FlawRule {
                id: "late_release".to_string(),
                title: "リリースが遅い".to_string(),
                category: "release".to_string(),
                severity: Severity::Medium,
                injury_risk: false,
                correction: "ジャンプ頂点と同時にボールを離す意識でテンポを上げる".to_string(),
                drill: None,
                reference: None,
                when: vec![RuleCondition::Above {
                    metric: "release_timing".to_string(),
                    value: 250.0,
                }],
            },
            FlawRule {
                id: "unstable_base".to_string(),
                title: "土台の不安定".to_string(),
                category: "stability".to_string(),
                severity: Severity::Low,
                injury_risk: true,
                correction: "着地まで体幹を固定し、真上に跳ぶ。左右へ流れる癖は捻挫につながる".to_string(),
                drill: Some("壁際ジャンプドリル".to_string()),
                reference: None,
                when: vec![
                    RuleCondition::Below {
                        metric: "core_stability".to_string(),
                        value: 0.5,
                    },
                    RuleCondition::Below {
                        metric: "jump_height".to_string(),
                        value: 0.25,
                    },
                ],
            },
            FlawRule {
                id: "no_follow_through".to_string(),
                title: "フォロースルー不足".to_string(),
                category: "release".to_string(),
                severity: Severity::Low,
                injury_risk: false,
                correction: "リリース後も手首のスナップを保ち、指がリングを指す形で止める".to_string(),
                drill: None,
                reference: None,
                when: vec![RuleCondition::Below {
                    metric: "follow_through".to_string(),
                    value: 0.3,
                }],
            },
        ],
    }
}

fn squat_action() -> ActionConfig {
    ActionConfig {
        label: "スクワット".to_string(),
        keyframes: KeyframeConfig {
            min_frames: default_min_frames(),
            min_confidence: default_min_confidence(),
            onset_landmark: LandmarkIndex::LeftHip,
            onset_velocity: 0.005,
            track_landmark: LandmarkIndex::LeftHip,
            // しゃがみ込み: ピークはYの最大（最下点）
            peak_direction: PeakDirection::Down,
            release_landmark: LandmarkIndex::LeftHip,
            release_velocity: 0.01,
            release_direction: ReleaseDirection::Up,
            release_window: 30,
            stop_velocity: 0.005,
        },
        metrics: vec![
            MetricDef {
                name: "bottom_knee_angle".to_string(),
                label: "最下点膝角度".to_string(),
                unit: Unit::Deg,
                category: "depth".to_string(),
                weight: 1.5,
                ideal: [70.0, 100.0],
                max_deviation: 50.0,
                score_mode: ScoreMode::Deviation,
                kind: MetricKind::JointAngle {
                    joint: LandmarkIndex::LeftKnee,
                    from: LandmarkIndex::LeftHip,
                    to: LandmarkIndex::LeftAnkle,
                    at: KeyframeId::PeakDisplacement,
                },
            },
            MetricDef {
                name: "descent_time".to_string(),
                label: "下降時間".to_string(),
                unit: Unit::Ms,
                category: "tempo".to_string(),
                weight: 1.0,
                ideal: [600.0, 1500.0],
                max_deviation: 800.0,
                score_mode: ScoreMode::Deviation,
                kind: MetricKind::KeyframeOffset {
                    from: KeyframeId::Start,
                    to: KeyframeId::PeakDisplacement,
                },
            },
            MetricDef {
                name: "hip_drop".to_string(),
                label: "腰の沈み込み量".to_string(),
                unit: Unit::Ratio,
                category: "depth".to_string(),
                weight: 1.0,
                ideal: [0.3, 0.55],
                max_deviation: 0.35,
                score_mode: ScoreMode::Deviation,
                kind: MetricKind::NormalizedDisplacement {
                    landmark: LandmarkIndex::LeftHip,
                    segment: BodySegment::HipHeight,
                },
            },
            MetricDef {
                name: "ankle_balance".to_string(),
                label: "足元バランス".to_string(),
                unit: Unit::Index,
                category: "balance".to_string(),
                weight: 1.0,
                ideal: [0.8, 1.0],
                max_deviation: 0.7,
                score_mode: ScoreMode::Deviation,
                kind: MetricKind::Stability {
                    landmark: LandmarkIndex::LeftAnkle,
                    from: KeyframeId::Start,
                    to: KeyframeId::End,
                    gain: 400.0,
                },
            },
        ],
        scoring: ScoringConfig::default(),
        rules: vec![
            FlawRule {
                id: "knee_collapse".to_string(),
                title: "膝の潰れ込み".to_string(),
                category: "depth".to_string(),
                severity: Severity::High,
                injury_risk: true,
                correction: "最下点で膝角度を保ち、踵に荷重して立ち上がる".to_string(),
                drill: Some("ボックススクワット".to_string()),
                reference: None,
                when: vec![RuleCondition::Below {
                    metric: "bottom_knee_angle".to_string(),
                    value: 55.0,
                }],
            },
            FlawRule {
                id: "shallow_depth".to_string(),
                title: "しゃがみ込み不足".to_string(),
                category: "depth".to_string(),
                severity: Severity::Medium,
                injury_risk: false,
                correction: "腿が床と平行になる深さまで腰を落とす".to_string(),
                drill: None,
                reference: None,
                when: vec![RuleCondition::Above {
                    metric: "bottom_knee_angle".to_string(),
                    value: 120.0,
                }],
            },
            FlawRule {
                id: "rushed_descent".to_string(),
                title: "下降が速すぎる".to_string(),
                category: "tempo".to_string(),
                severity: Severity::Low,
                injury_risk: true,
                correction: "2秒かけて下ろす意識で、重力に逆らいながらしゃがむ".to_string(),
                drill: Some("テンポスクワット".to_string()),
                reference: None,
                when: vec![RuleCondition::Below {
                    metric: "descent_time".to_string(),
                    value: 450.0,
                }],
            },
            FlawRule {
                id: "poor_balance".to_string(),
                title: "バランス不良".to_string(),
                category: "balance".to_string(),
                severity: Severity::Medium,
                injury_risk: true,
                correction: "足裏全体で床を押し、足首のぐらつきを抑える".to_string(),
                drill: None,
                reference: None,
                when: vec![RuleCondition::OutsideIdeal {
                    metric: "ankle_balance".to_string(),
                    margin: 0.1,
                }],
            },
        ],
    }
}
