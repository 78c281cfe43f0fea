use crate::config::SmoothConfig;
use crate::pose::{Landmark, LandmarkIndex, LandmarkSequence, PoseFrame};

/// ランドマーク列の移動平均スムーザー
///
/// 中心窓の移動平均で高周波ジッタを除去する。境界では窓を
/// 詰める（パディングしない）。信頼度の低いサンプルは平均から
/// 除外し、窓内の有効サンプル率が min_coverage 未満のランドマークは
/// 素通しする。信頼度自体も同じ窓で平均するため、平滑化済みでも
/// 不確かな点は下流で見分けられる。
pub struct Smoother {
    window: usize,
    min_confidence: f32,
    min_coverage: f32,
}

impl Smoother {
    pub fn new(window: usize, min_confidence: f32, min_coverage: f32) -> Self {
        Self {
            // 窓幅0は1扱い（素通し）
            window: window.max(1),
            min_confidence,
            min_coverage,
        }
    }

    pub fn from_config(config: &SmoothConfig) -> Self {
        Self::new(config.window, config.min_confidence, config.min_coverage)
    }

    /// 新しいシーケンスを返す。入力は変更しない
    /// 空入力は空出力。フレーム数・番号・タイムスタンプは保存される
    pub fn apply(&self, sequence: &LandmarkSequence) -> LandmarkSequence {
        if sequence.is_empty() || self.window <= 1 {
            return sequence.clone();
        }

        let frames = sequence.frames();
        let half = self.window / 2;
        let mut smoothed: Vec<PoseFrame> = Vec::with_capacity(frames.len());

        for (pos, frame) in frames.iter().enumerate() {
            // 境界で窓を詰める
            let lo = pos.saturating_sub(half);
            let hi = (pos + half + 1).min(frames.len());
            let span = hi - lo;

            let mut landmarks = frame.landmarks;
            for idx in LandmarkIndex::ALL {
                let i = idx as usize;

                let mut sum_x = 0.0f32;
                let mut sum_y = 0.0f32;
                let mut sum_z = 0.0f32;
                let mut sum_conf = 0.0f32;
                let mut valid = 0usize;
                for w in &frames[lo..hi] {
                    let lm = &w.landmarks[i];
                    sum_conf += lm.confidence;
                    if lm.is_valid(self.min_confidence) {
                        sum_x += lm.x;
                        sum_y += lm.y;
                        sum_z += lm.z;
                        valid += 1;
                    }
                }

                let coverage = valid as f32 / span as f32;
                let avg_conf = sum_conf / span as f32;
                if coverage < self.min_coverage {
                    // 疎なランドマークは位置を素通し（トレンドを捏造しない）
                    landmarks[i].confidence = avg_conf;
                    continue;
                }

                let n = valid as f32;
                landmarks[i] = Landmark {
                    x: sum_x / n,
                    y: sum_y / n,
                    z: sum_z / n,
                    confidence: avg_conf,
                };
            }

            let mut out = PoseFrame::new(frame.index, landmarks);
            out.timestamp_ms = frame.timestamp_ms;
            smoothed.push(out);
        }

        LandmarkSequence::from_validated(smoothed)
    }
}
