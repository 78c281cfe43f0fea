use nalgebra::Vector3;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::analysis::anthropometry::BodySegment;
use crate::analysis::keyframes::{KeyframeId, Keyframes};
use crate::config::{MetricDef, MetricKind};
use crate::pose::{LandmarkIndex, LandmarkSequence};

/// メトリクス値
///
/// 算出不能は明示的な Unavailable で表現する。0やマイナス値の
/// センチネルにしない（「データなし」と「ゼロ」の混同を防ぐ）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricValue {
    Available { value: f64 },
    Unavailable { reason: UnavailableReason },
}

impl MetricValue {
    pub fn available(value: f64) -> Self {
        Self::Available { value }
    }

    pub fn unavailable(reason: UnavailableReason) -> Self {
        Self::Unavailable { reason }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Available { value } => Some(*value),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// 算出不能の理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// 必要なキーフレームが absent
    MissingKeyframe,
    /// 対象ランドマークの信頼度不足
    LowConfidence,
    /// 身長未入力（正規化不能）
    MissingHeight,
    /// サンプルレート不明（時間換算不能）
    MissingSampleRate,
    /// 窓内の有効サンプル不足
    InsufficientWindow,
    /// 角度が定義できない（同一点など）
    DegenerateGeometry,
}

/// メトリクス名 → 値の集合
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricSet {
    values: BTreeMap<String, MetricValue>,
}

impl MetricSet {
    pub fn insert(&mut self, name: String, value: MetricValue) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.values.get(name)
    }

    /// available な値のみ返す
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(|v| v.value())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetricValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.values.values().filter(|v| v.is_available()).count()
    }
}

/// メトリクス計算器
///
/// 平滑化済みシーケンスとキーフレームから、アクション定義の
/// 各メトリクスを算出する。必要条件（キーフレーム・信頼度・
/// 身長・サンプルレート）を欠くメトリクスは理由つき Unavailable
pub struct MetricCalculator {
    min_confidence: f32,
    height_m: Option<f32>,
    sample_rate_hz: Option<f64>,
}

impl MetricCalculator {
    pub fn new(min_confidence: f32, height_m: Option<f32>, sample_rate_hz: Option<f64>) -> Self {
        Self {
            min_confidence,
            height_m,
            sample_rate_hz,
        }
    }

    pub fn compute(
        &self,
        sequence: &LandmarkSequence,
        keyframes: &Keyframes,
        defs: &[MetricDef],
    ) -> MetricSet {
        let mut set = MetricSet::default();
        for def in defs {
            let value = self.compute_one(sequence, keyframes, def);
            set.insert(def.name.clone(), value);
        }
        set
    }

    fn compute_one(
        &self,
        sequence: &LandmarkSequence,
        keyframes: &Keyframes,
        def: &MetricDef,
    ) -> MetricValue {
        match &def.kind {
            MetricKind::JointAngle {
                joint,
                from,
                to,
                at,
            } => self.joint_angle(sequence, keyframes, *joint, *from, *to, *at),
            MetricKind::KeyframeOffset { from, to } => {
                self.keyframe_offset(keyframes, *from, *to)
            }
            MetricKind::NormalizedDisplacement { landmark, segment } => {
                self.normalized_displacement(sequence, keyframes, *landmark, *segment)
            }
            MetricKind::Stability {
                landmark,
                from,
                to,
                gain,
            } => self.stability(sequence, keyframes, *landmark, *from, *to, *gain),
            MetricKind::FollowThrough { landmark, window } => {
                self.follow_through(sequence, keyframes, *landmark, *window)
            }
        }
    }

    /// 3点関節角度（度、0〜180）
    /// joint を頂点とし、from / to へのベクトルのなす角
    fn joint_angle(
        &self,
        sequence: &LandmarkSequence,
        keyframes: &Keyframes,
        joint: LandmarkIndex,
        from: LandmarkIndex,
        to: LandmarkIndex,
        at: KeyframeId,
    ) -> MetricValue {
        let Some(pos) = keyframes.get(at) else {
            return MetricValue::unavailable(UnavailableReason::MissingKeyframe);
        };
        let Some(frame) = sequence.frame(pos) else {
            return MetricValue::unavailable(UnavailableReason::MissingKeyframe);
        };

        let j = frame.get(joint);
        let a = frame.get(from);
        let b = frame.get(to);
        if !j.is_valid(self.min_confidence)
            || !a.is_valid(self.min_confidence)
            || !b.is_valid(self.min_confidence)
        {
            return MetricValue::unavailable(UnavailableReason::LowConfidence);
        }

        let v1 = Vector3::new(a.x - j.x, a.y - j.y, a.z - j.z);
        let v2 = Vector3::new(b.x - j.x, b.y - j.y, b.z - j.z);
        if v1.norm() < 1e-6 || v2.norm() < 1e-6 {
            return MetricValue::unavailable(UnavailableReason::DegenerateGeometry);
        }

        let angle_deg = v1.angle(&v2).to_degrees() as f64;
        MetricValue::available(angle_deg)
    }

    /// キーフレーム間の時間差（ミリ秒）
    fn keyframe_offset(
        &self,
        keyframes: &Keyframes,
        from: KeyframeId,
        to: KeyframeId,
    ) -> MetricValue {
        let (Some(from_pos), Some(to_pos)) = (keyframes.get(from), keyframes.get(to)) else {
            return MetricValue::unavailable(UnavailableReason::MissingKeyframe);
        };
        let Some(rate) = self.sample_rate_hz else {
            // レートを推測して計算はしない
            return MetricValue::unavailable(UnavailableReason::MissingSampleRate);
        };
        if rate <= 0.0 {
            return MetricValue::unavailable(UnavailableReason::MissingSampleRate);
        }
        let frames = to_pos as f64 - from_pos as f64;
        MetricValue::available(frames * 1000.0 / rate)
    }

    /// start→peak の垂直変位を身長×体節比で正規化
    fn normalized_displacement(
        &self,
        sequence: &LandmarkSequence,
        keyframes: &Keyframes,
        landmark: LandmarkIndex,
        segment: BodySegment,
    ) -> MetricValue {
        let (Some(start), Some(peak)) = (keyframes.start, keyframes.peak_displacement) else {
            return MetricValue::unavailable(UnavailableReason::MissingKeyframe);
        };
        let Some(height) = self.height_m else {
            return MetricValue::unavailable(UnavailableReason::MissingHeight);
        };

        let (Some(start_frame), Some(peak_frame)) =
            (sequence.frame(start), sequence.frame(peak))
        else {
            return MetricValue::unavailable(UnavailableReason::MissingKeyframe);
        };
        let baseline = start_frame.get(landmark);
        let extreme = peak_frame.get(landmark);
        if !baseline.is_valid(self.min_confidence) || !extreme.is_valid(self.min_confidence) {
            return MetricValue::unavailable(UnavailableReason::LowConfidence);
        }

        let scale = segment.length_m(height);
        if scale <= 0.0 {
            return MetricValue::unavailable(UnavailableReason::MissingHeight);
        }
        let displacement = (extreme.y - baseline.y).abs();
        MetricValue::available((displacement / scale) as f64)
    }

    /// 窓内の位置分散に基づく安定性指数 (0〜1]
    /// 1/(1 + gain·σ²)。σ² は各軸分散の和（メートル²）
    fn stability(
        &self,
        sequence: &LandmarkSequence,
        keyframes: &Keyframes,
        landmark: LandmarkIndex,
        from: KeyframeId,
        to: KeyframeId,
        gain: f32,
    ) -> MetricValue {
        let (Some(lo), Some(hi)) = (keyframes.get(from), keyframes.get(to)) else {
            return MetricValue::unavailable(UnavailableReason::MissingKeyframe);
        };

        let mut points: Vec<(f32, f32, f32)> = Vec::new();
        for pos in lo..=hi.min(sequence.len().saturating_sub(1)) {
            if let Some(frame) = sequence.frame(pos) {
                let lm = frame.get(landmark);
                if lm.is_valid(self.min_confidence) {
                    points.push((lm.x, lm.y, lm.z));
                }
            }
        }
        if points.len() < 2 {
            return MetricValue::unavailable(UnavailableReason::InsufficientWindow);
        }

        let n = points.len() as f32;
        let (mut mx, mut my, mut mz) = (0.0f32, 0.0f32, 0.0f32);
        for (x, y, z) in &points {
            mx += x;
            my += y;
            mz += z;
        }
        mx /= n;
        my /= n;
        mz /= n;

        let mut var = 0.0f32;
        for (x, y, z) in &points {
            var += (x - mx).powi(2) + (y - my).powi(2) + (z - mz).powi(2);
        }
        var /= n;

        MetricValue::available((1.0 / (1.0 + gain * var)) as f64)
    }

    /// リリース後の減速に基づくフォロースルー指数 [0〜1]
    /// 窓の前半平均速度に対する後半平均速度の減少率
    fn follow_through(
        &self,
        sequence: &LandmarkSequence,
        keyframes: &Keyframes,
        landmark: LandmarkIndex,
        window: usize,
    ) -> MetricValue {
        let Some(release) = keyframes.release else {
            return MetricValue::unavailable(UnavailableReason::MissingKeyframe);
        };

        let hi = (release + window).min(sequence.len().saturating_sub(1));
        let mut speeds: Vec<f32> = Vec::new();
        for pos in (release + 1)..=hi {
            let (Some(prev), Some(curr)) = (sequence.frame(pos - 1), sequence.frame(pos))
            else {
                continue;
            };
            let a = prev.get(landmark);
            let b = curr.get(landmark);
            if !a.is_valid(self.min_confidence) || !b.is_valid(self.min_confidence) {
                continue;
            }
            speeds.push(a.distance(b));
        }
        if speeds.len() < 4 {
            return MetricValue::unavailable(UnavailableReason::InsufficientWindow);
        }

        let mid = speeds.len() / 2;
        let first: f32 = speeds[..mid].iter().sum::<f32>() / mid as f32;
        let second: f32 = speeds[mid..].iter().sum::<f32>() / (speeds.len() - mid) as f32;
        if first < 1e-6 {
            // リリース後に動きがない = フォロースルーなし
            return MetricValue::available(0.0);
        }
        let index = (1.0 - second / first).clamp(0.0, 1.0);
        MetricValue::available(index as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScoreMode, Unit};
    use crate::pose::{Landmark, PoseFrame};

    fn blank_frames(n: u32) -> Vec<PoseFrame> {
        (0..n)
            .map(|t| {
                let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
                for lm in landmarks.iter_mut() {
                    *lm = Landmark::new(0.5, 0.5, 0.9);
                }
                PoseFrame::new(t, landmarks)
            })
            .collect()
    }

    fn set_landmark(frames: &mut [PoseFrame], pos: usize, idx: LandmarkIndex, x: f32, y: f32) {
        frames[pos].landmarks[idx as usize] = Landmark::new(x, y, 0.9);
    }

    fn angle_def(at: KeyframeId) -> MetricDef {
        MetricDef {
            name: "elbow".to_string(),
            label: "肘角度".to_string(),
            unit: Unit::Deg,
            category: "arm".to_string(),
            weight: 1.0,
            ideal: [80.0, 100.0],
            max_deviation: 40.0,
            score_mode: ScoreMode::Deviation,
            kind: MetricKind::JointAngle {
                joint: LandmarkIndex::RightElbow,
                from: LandmarkIndex::RightShoulder,
                to: LandmarkIndex::RightWrist,
                at,
            },
        }
    }

    #[test]
    fn test_joint_angle_right_angle() {
        let mut frames = blank_frames(10);
        // 肘(0.4, 0.5)、肩は真上(0.4, 0.2)、手首は真横(0.65, 0.5) → 90°
        set_landmark(&mut frames, 5, LandmarkIndex::RightElbow, 0.4, 0.5);
        set_landmark(&mut frames, 5, LandmarkIndex::RightShoulder, 0.4, 0.2);
        set_landmark(&mut frames, 5, LandmarkIndex::RightWrist, 0.65, 0.5);
        let seq = LandmarkSequence::new(frames).unwrap();
        let keyframes = Keyframes {
            release: Some(5),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[angle_def(KeyframeId::Release)]);
        let angle = set.value("elbow").unwrap();
        assert!((angle - 90.0).abs() < 1e-4, "angle={}", angle);
    }

    #[test]
    fn test_joint_angle_straight_limb() {
        let mut frames = blank_frames(10);
        // 肩-肘-手首が一直線 → 180°
        set_landmark(&mut frames, 3, LandmarkIndex::RightShoulder, 0.2, 0.2);
        set_landmark(&mut frames, 3, LandmarkIndex::RightElbow, 0.3, 0.3);
        set_landmark(&mut frames, 3, LandmarkIndex::RightWrist, 0.4, 0.4);
        let seq = LandmarkSequence::new(frames).unwrap();
        let keyframes = Keyframes {
            release: Some(3),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[angle_def(KeyframeId::Release)]);
        let angle = set.value("elbow").unwrap();
        assert!((angle - 180.0).abs() < 1e-3, "angle={}", angle);
    }

    #[test]
    fn test_joint_angle_missing_keyframe_unavailable() {
        // キーフレーム absent → 数値を返してはならない
        let seq = LandmarkSequence::new(blank_frames(10)).unwrap();
        let keyframes = Keyframes::default();
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[angle_def(KeyframeId::Release)]);
        assert_eq!(
            set.get("elbow"),
            Some(&MetricValue::unavailable(UnavailableReason::MissingKeyframe))
        );
        assert_eq!(set.value("elbow"), None);
    }

    #[test]
    fn test_joint_angle_low_confidence_unavailable() {
        let mut frames = blank_frames(10);
        frames[5].landmarks[LandmarkIndex::RightElbow as usize] =
            Landmark::new(0.4, 0.5, 0.1);
        let seq = LandmarkSequence::new(frames).unwrap();
        let keyframes = Keyframes {
            release: Some(5),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[angle_def(KeyframeId::Release)]);
        assert_eq!(
            set.get("elbow"),
            Some(&MetricValue::unavailable(UnavailableReason::LowConfidence))
        );
    }

    fn offset_def() -> MetricDef {
        MetricDef {
            name: "timing".to_string(),
            label: "タイミング".to_string(),
            unit: Unit::Ms,
            category: "tempo".to_string(),
            weight: 1.0,
            ideal: [0.0, 200.0],
            max_deviation: 300.0,
            score_mode: ScoreMode::Deviation,
            kind: MetricKind::KeyframeOffset {
                from: KeyframeId::Start,
                to: KeyframeId::Release,
            },
        }
    }

    #[test]
    fn test_keyframe_offset_ms() {
        let seq = LandmarkSequence::new(blank_frames(40)).unwrap();
        let keyframes = Keyframes {
            start: Some(0),
            release: Some(30),
            ..Default::default()
        };
        // 60Hz: 30フレーム = 500ms
        let calc = MetricCalculator::new(0.3, None, Some(60.0));
        let set = calc.compute(&seq, &keyframes, &[offset_def()]);
        let ms = set.value("timing").unwrap();
        assert!((ms - 500.0).abs() < 1e-6, "ms={}", ms);
    }

    #[test]
    fn test_keyframe_offset_without_rate_unavailable() {
        // レート不明時に仮定レートで計算しない
        let seq = LandmarkSequence::new(blank_frames(40)).unwrap();
        let keyframes = Keyframes {
            start: Some(0),
            release: Some(30),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[offset_def()]);
        assert_eq!(
            set.get("timing"),
            Some(&MetricValue::unavailable(
                UnavailableReason::MissingSampleRate
            ))
        );
    }

    fn displacement_def() -> MetricDef {
        MetricDef {
            name: "jump_height".to_string(),
            label: "ジャンプ高".to_string(),
            unit: Unit::Ratio,
            category: "lower_body".to_string(),
            weight: 1.0,
            ideal: [0.2, 0.5],
            max_deviation: 0.3,
            score_mode: ScoreMode::Deviation,
            kind: MetricKind::NormalizedDisplacement {
                landmark: LandmarkIndex::LeftHip,
                segment: BodySegment::HipHeight,
            },
        }
    }

    #[test]
    fn test_normalized_displacement() {
        let mut frames = blank_frames(40);
        set_landmark(&mut frames, 0, LandmarkIndex::LeftHip, 0.5, 1.0);
        set_landmark(&mut frames, 20, LandmarkIndex::LeftHip, 0.5, 0.6);
        let seq = LandmarkSequence::new(frames).unwrap();
        let keyframes = Keyframes {
            start: Some(0),
            peak_displacement: Some(20),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, Some(1.70), None);
        let set = calc.compute(&seq, &keyframes, &[displacement_def()]);
        // 変位0.4m / (1.70m × 0.530) = 0.4439...
        let value = set.value("jump_height").unwrap();
        let expected = 0.4 / (1.70 * 0.530);
        assert!((value - expected as f64).abs() < 1e-4, "value={}", value);
    }

    #[test]
    fn test_normalized_displacement_without_height_unavailable() {
        let seq = LandmarkSequence::new(blank_frames(40)).unwrap();
        let keyframes = Keyframes {
            start: Some(0),
            peak_displacement: Some(20),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[displacement_def()]);
        assert_eq!(
            set.get("jump_height"),
            Some(&MetricValue::unavailable(UnavailableReason::MissingHeight))
        );
    }

    fn stability_def(gain: f32) -> MetricDef {
        MetricDef {
            name: "stability".to_string(),
            label: "安定性".to_string(),
            unit: Unit::Index,
            category: "stability".to_string(),
            weight: 1.0,
            ideal: [0.7, 1.0],
            max_deviation: 0.6,
            score_mode: ScoreMode::Deviation,
            kind: MetricKind::Stability {
                landmark: LandmarkIndex::LeftHip,
                from: KeyframeId::Start,
                to: KeyframeId::End,
                gain,
            },
        }
    }

    #[test]
    fn test_stability_constant_is_one() {
        let seq = LandmarkSequence::new(blank_frames(30)).unwrap();
        let keyframes = Keyframes {
            start: Some(0),
            end: Some(29),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[stability_def(100.0)]);
        let value = set.value("stability").unwrap();
        assert!((value - 1.0).abs() < 1e-6, "value={}", value);
    }

    #[test]
    fn test_stability_decreases_with_scatter() {
        let mut frames = blank_frames(30);
        for pos in 0..30 {
            let jitter = if pos % 2 == 0 { 0.1 } else { -0.1 };
            set_landmark(&mut frames, pos, LandmarkIndex::LeftHip, 0.5 + jitter, 0.5);
        }
        let seq = LandmarkSequence::new(frames).unwrap();
        let keyframes = Keyframes {
            start: Some(0),
            end: Some(29),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[stability_def(100.0)]);
        let value = set.value("stability").unwrap();
        // σ² = 0.01 → 1/(1+1) = 0.5
        assert!((value - 0.5).abs() < 1e-3, "value={}", value);
    }

    #[test]
    fn test_stability_insufficient_window_unavailable() {
        let mut frames = blank_frames(30);
        // 窓内の腰を全て低信頼度に
        for frame in frames.iter_mut() {
            frame.landmarks[LandmarkIndex::LeftHip as usize].confidence = 0.05;
        }
        let seq = LandmarkSequence::new(frames).unwrap();
        let keyframes = Keyframes {
            start: Some(0),
            end: Some(29),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[stability_def(100.0)]);
        assert_eq!(
            set.get("stability"),
            Some(&MetricValue::unavailable(
                UnavailableReason::InsufficientWindow
            ))
        );
    }

    fn follow_def(window: usize) -> MetricDef {
        MetricDef {
            name: "follow".to_string(),
            label: "フォロースルー".to_string(),
            unit: Unit::Index,
            category: "release".to_string(),
            weight: 1.0,
            ideal: [0.5, 1.0],
            max_deviation: 0.5,
            score_mode: ScoreMode::Deviation,
            kind: MetricKind::FollowThrough {
                landmark: LandmarkIndex::RightWrist,
                window,
            },
        }
    }

    #[test]
    fn test_follow_through_decelerating() {
        let mut frames = blank_frames(30);
        // リリース後: 前半は高速、後半はほぼ停止
        let mut y = 0.8f32;
        set_landmark(&mut frames, 10, LandmarkIndex::RightWrist, 0.3, y);
        for pos in 11..=22 {
            let step = if pos <= 16 { 0.08 } else { 0.005 };
            y -= step;
            set_landmark(&mut frames, pos, LandmarkIndex::RightWrist, 0.3, y);
        }
        let seq = LandmarkSequence::new(frames).unwrap();
        let keyframes = Keyframes {
            release: Some(10),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[follow_def(12)]);
        let value = set.value("follow").unwrap();
        assert!(value > 0.6, "value={}", value);
    }

    #[test]
    fn test_follow_through_constant_speed_low() {
        let mut frames = blank_frames(30);
        let mut y = 0.8f32;
        set_landmark(&mut frames, 10, LandmarkIndex::RightWrist, 0.3, y);
        for pos in 11..=22 {
            y -= 0.05;
            set_landmark(&mut frames, pos, LandmarkIndex::RightWrist, 0.3, y);
        }
        let seq = LandmarkSequence::new(frames).unwrap();
        let keyframes = Keyframes {
            release: Some(10),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[follow_def(12)]);
        let value = set.value("follow").unwrap();
        assert!(value < 0.1, "value={}", value);
    }

    #[test]
    fn test_follow_through_missing_release_unavailable() {
        let seq = LandmarkSequence::new(blank_frames(30)).unwrap();
        let keyframes = Keyframes::default();
        let calc = MetricCalculator::new(0.3, None, None);
        let set = calc.compute(&seq, &keyframes, &[follow_def(12)]);
        assert_eq!(
            set.get("follow"),
            Some(&MetricValue::unavailable(UnavailableReason::MissingKeyframe))
        );
    }

    #[test]
    fn test_available_count() {
        let seq = LandmarkSequence::new(blank_frames(40)).unwrap();
        let keyframes = Keyframes {
            start: Some(0),
            release: Some(30),
            ..Default::default()
        };
        let calc = MetricCalculator::new(0.3, None, Some(60.0));
        let set = calc.compute(&seq, &keyframes, &[offset_def(), follow_def(12)]);
        // timing は計算可能、follow はリリース後の手首が静止 → 0.0 (available)
        assert_eq!(set.len(), 2);
        assert_eq!(set.available_count(), 2);
    }
}
