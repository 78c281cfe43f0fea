use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::pose::{Landmark, LandmarkIndex};

/// 1フレーム分の姿勢
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseFrame {
    /// フレーム番号（シーケンス内で連番）
    pub index: u32,
    /// タイムスタンプ（ミリ秒）。固定サンプルレート前提の入力では省略可
    #[serde(default)]
    pub timestamp_ms: Option<f64>,
    /// 全ランドマーク。未検出は信頼度0で保持
    pub landmarks: [Landmark; LandmarkIndex::COUNT],
}

impl PoseFrame {
    pub fn new(index: u32, landmarks: [Landmark; LandmarkIndex::COUNT]) -> Self {
        Self {
            index,
            timestamp_ms: None,
            landmarks,
        }
    }

    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index as usize]
    }

    /// 全ランドマークの平均信頼度
    pub fn average_confidence(&self) -> f32 {
        let sum: f32 = self.landmarks.iter().map(|lm| lm.confidence).sum();
        sum / LandmarkIndex::COUNT as f32
    }
}

/// 1セッション分のランドマーク列
///
/// 構築時にフレーム番号の昇順・連番を検証する（欠番・逆順は入力異常）。
/// 構築後は不変。スムージングは新しいシーケンスを返す。
#[derive(Debug, Clone, Serialize)]
pub struct LandmarkSequence {
    frames: Vec<PoseFrame>,
}

impl LandmarkSequence {
    pub fn new(frames: Vec<PoseFrame>) -> Result<Self, AnalysisError> {
        if let Some(first) = frames.first() {
            let base = first.index;
            for (pos, frame) in frames.iter().enumerate().skip(1) {
                let prev = frames[pos - 1].index;
                if frame.index <= prev {
                    return Err(AnalysisError::UnorderedFrames { position: pos });
                }
                let expected = base + pos as u32;
                if frame.index != expected {
                    return Err(AnalysisError::GappedFrames {
                        position: pos,
                        expected,
                        got: frame.index,
                    });
                }
            }
        }
        Ok(Self { frames })
    }

    /// 検証済みフレーム列から構築（スムージング出力用）
    pub(crate) fn from_validated(frames: Vec<PoseFrame>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, position: usize) -> Option<&PoseFrame> {
        self.frames.get(position)
    }

    pub fn frames(&self) -> &[PoseFrame] {
        &self.frames
    }

    /// タイムスタンプからサンプルレートを推定（Hz）
    /// 隣接フレームの平均間隔から算出。タイムスタンプ無し・不正なら None
    pub fn estimate_sample_rate_hz(&self) -> Option<f64> {
        if self.frames.len() < 2 {
            return None;
        }
        let first = self.frames.first()?.timestamp_ms?;
        let last = self.frames.last()?.timestamp_ms?;
        let span_ms = last - first;
        if span_ms <= 0.0 {
            return None;
        }
        Some((self.frames.len() - 1) as f64 * 1000.0 / span_ms)
    }
}
