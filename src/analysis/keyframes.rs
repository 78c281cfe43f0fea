use serde::{Deserialize, Serialize};

use crate::config::{KeyframeConfig, PeakDirection, ReleaseDirection};
use crate::pose::{LandmarkIndex, LandmarkSequence};

/// キーフレーム識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyframeId {
    Start,
    PeakDisplacement,
    Release,
    End,
}

impl KeyframeId {
    pub fn name(self) -> &'static str {
        match self {
            KeyframeId::Start => "start",
            KeyframeId::PeakDisplacement => "peak_displacement",
            KeyframeId::Release => "release",
            KeyframeId::End => "end",
        }
    }
}

/// 検出されたキーフレーム（シーケンス内位置）
///
/// 各フィールドは検出失敗で absent になる。1つの欠落が他に依存しない
/// 計算を妨げてはならない。全フィールドが揃ったときの不変条件:
/// start ≤ peak_displacement ≤ release ≤ end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Keyframes {
    pub start: Option<usize>,
    pub peak_displacement: Option<usize>,
    pub release: Option<usize>,
    pub end: Option<usize>,
}

impl Keyframes {
    pub fn get(&self, id: KeyframeId) -> Option<usize> {
        match id {
            KeyframeId::Start => self.start,
            KeyframeId::PeakDisplacement => self.peak_displacement,
            KeyframeId::Release => self.release,
            KeyframeId::End => self.end,
        }
    }

    pub fn all_absent(&self) -> bool {
        self.start.is_none()
            && self.peak_displacement.is_none()
            && self.release.is_none()
            && self.end.is_none()
    }
}

/// 検出結果と診断メッセージ
#[derive(Debug, Clone, Serialize)]
pub struct KeyframeOutcome {
    pub keyframes: Keyframes,
    /// 破棄されたキーフレーム等の診断（静かに補正しない）
    pub diagnostics: Vec<String>,
}

/// キーフレーム検出器
///
/// 平滑化済みシーケンスから start / peak_displacement / release / end を
/// 探す。条件を満たすフレームが無ければ当該キーフレームは absent のまま
/// 残す（推測で埋めない）。
pub struct KeyframeDetector {
    config: KeyframeConfig,
}

impl KeyframeDetector {
    pub fn from_config(config: &KeyframeConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn detect(&self, sequence: &LandmarkSequence) -> KeyframeOutcome {
        let mut diagnostics = Vec::new();

        if sequence.len() < self.config.min_frames {
            diagnostics.push(format!(
                "sequence too short for keyframe detection ({} < {})",
                sequence.len(),
                self.config.min_frames
            ));
            return KeyframeOutcome {
                keyframes: Keyframes::default(),
                diagnostics,
            };
        }

        let start = self.detect_start(sequence);
        let peak = self.detect_peak(sequence, start);
        let release = self.detect_release(sequence, peak);
        let end = self.detect_end(sequence, start, peak, release);

        let mut keyframes = Keyframes {
            start,
            peak_displacement: peak,
            release,
            end,
        };
        enforce_ordering(&mut keyframes, &mut diagnostics);

        KeyframeOutcome {
            keyframes,
            diagnostics,
        }
    }

    /// start: onset ランドマークの速度が閾値を初めて超えたフレーム
    /// 超えなければ、信頼度が閾値以上の最初のフレームにフォールバック
    fn detect_start(&self, sequence: &LandmarkSequence) -> Option<usize> {
        let idx = self.config.onset_landmark;
        for pos in 1..sequence.len() {
            if let Some((vx, vy, vz)) = self.velocity(sequence, pos, idx) {
                let speed = (vx * vx + vy * vy + vz * vz).sqrt();
                if speed > self.config.onset_velocity {
                    return Some(pos);
                }
            }
        }
        // フォールバック: 最初の有効フレーム
        (0..sequence.len()).find(|&pos| {
            sequence
                .frame(pos)
                .map(|f| f.get(idx).is_valid(self.config.min_confidence))
                .unwrap_or(false)
        })
    }

    /// peak_displacement: 追跡ランドマークの垂直座標の極値
    /// 探索範囲は [start, 末尾]（start absent 時は先頭から）
    /// 同値は最初の出現を採用
    fn detect_peak(&self, sequence: &LandmarkSequence, start: Option<usize>) -> Option<usize> {
        let idx = self.config.track_landmark;
        let from = start.unwrap_or(0);
        let mut best: Option<(usize, f32)> = None;
        for pos in from..sequence.len() {
            let frame = sequence.frame(pos)?;
            let lm = frame.get(idx);
            if !lm.is_valid(self.config.min_confidence) {
                continue;
            }
            let better = match (&best, self.config.peak_direction) {
                (None, _) => true,
                // Y下向き座標系: up = 最小値
                (Some((_, best_y)), PeakDirection::Up) => lm.y < *best_y,
                (Some((_, best_y)), PeakDirection::Down) => lm.y > *best_y,
            };
            if better {
                best = Some((pos, lm.y));
            }
        }
        best.map(|(pos, _)| pos)
    }

    /// release: ピーク後の限定窓内で、末端ランドマークの速度が
    /// 設定方向に閾値を超えた最初のフレーム
    fn detect_release(&self, sequence: &LandmarkSequence, peak: Option<usize>) -> Option<usize> {
        let peak = peak?;
        let idx = self.config.release_landmark;
        let hi = (peak + self.config.release_window).min(sequence.len().saturating_sub(1));
        for pos in (peak + 1)..=hi {
            let Some((vx, vy, vz)) = self.velocity(sequence, pos, idx) else {
                continue;
            };
            let threshold = self.config.release_velocity;
            let fired = match self.config.release_direction {
                // Y下向き: 上方向への動きは vy < 0
                ReleaseDirection::Up => -vy > threshold,
                ReleaseDirection::Down => vy > threshold,
                ReleaseDirection::Outward => {
                    (vx * vx + vy * vy + vz * vz).sqrt() > threshold
                }
            };
            if fired {
                return Some(pos);
            }
        }
        None
    }

    /// end: release（なければ peak / start）以降で全身速度が停止閾値を
    /// 下回った最初のフレーム。下回らなければ最終フレーム。
    /// 基準キーフレームが全て absent なら end も absent
    fn detect_end(
        &self,
        sequence: &LandmarkSequence,
        start: Option<usize>,
        peak: Option<usize>,
        release: Option<usize>,
    ) -> Option<usize> {
        let anchor = release.or(peak).or(start)?;
        for pos in (anchor + 1)..sequence.len() {
            if let Some(speed) = self.body_speed(sequence, pos) {
                if speed < self.config.stop_velocity {
                    return Some(pos);
                }
            }
        }
        Some(sequence.len() - 1)
    }

    /// 位置 pos における前フレームとの差分速度（メートル/フレーム）
    /// どちらかのフレームで信頼度不足なら None
    fn velocity(
        &self,
        sequence: &LandmarkSequence,
        pos: usize,
        idx: LandmarkIndex,
    ) -> Option<(f32, f32, f32)> {
        if pos == 0 {
            return None;
        }
        let prev = sequence.frame(pos - 1)?.get(idx);
        let curr = sequence.frame(pos)?.get(idx);
        if !prev.is_valid(self.config.min_confidence)
            || !curr.is_valid(self.config.min_confidence)
        {
            return None;
        }
        Some((curr.x - prev.x, curr.y - prev.y, curr.z - prev.z))
    }

    /// 主要ランドマークの平均速度（停止判定用）
    /// 有効ペアが1つも無ければ None
    fn body_speed(&self, sequence: &LandmarkSequence, pos: usize) -> Option<f32> {
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for idx in LandmarkIndex::CORE {
            if let Some((vx, vy, vz)) = self.velocity(sequence, pos, idx) {
                sum += (vx * vx + vy * vy + vz * vz).sqrt();
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f32)
        }
    }
}

/// 順序不変条件の強制
///
/// start ≤ peak ≤ release ≤ end を破るキーフレームは破棄して診断に残す。
/// 並べ替えによる補正はしない
fn enforce_ordering(keyframes: &mut Keyframes, diagnostics: &mut Vec<String>) {
    let mut last: Option<(KeyframeId, usize)> = None;
    let ids = [
        KeyframeId::Start,
        KeyframeId::PeakDisplacement,
        KeyframeId::Release,
        KeyframeId::End,
    ];
    for id in ids {
        let Some(pos) = keyframes.get(id) else {
            continue;
        };
        if let Some((prev_id, prev_pos)) = last {
            if pos < prev_pos {
                let msg = format!(
                    "keyframe {} ({}) precedes {} ({}), discarded",
                    id.name(),
                    pos,
                    prev_id.name(),
                    prev_pos
                );
                log::warn!("{}", msg);
                diagnostics.push(msg);
                match id {
                    KeyframeId::Start => keyframes.start = None,
                    KeyframeId::PeakDisplacement => keyframes.peak_displacement = None,
                    KeyframeId::Release => keyframes.release = None,
                    KeyframeId::End => keyframes.end = None,
                }
                continue;
            }
        }
        last = Some((id, pos));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyframeConfig;
    use crate::pose::{Landmark, PoseFrame};

    fn test_config() -> KeyframeConfig {
        KeyframeConfig {
            min_frames: 10,
            min_confidence: 0.3,
            onset_landmark: LandmarkIndex::RightWrist,
            onset_velocity: 0.01,
            track_landmark: LandmarkIndex::LeftHip,
            peak_direction: PeakDirection::Up,
            release_landmark: LandmarkIndex::RightWrist,
            release_velocity: 0.05,
            release_direction: ReleaseDirection::Outward,
            release_window: 20,
            stop_velocity: 0.008,
        }
    }

    /// 60フレームの合成ジャンプ:
    /// - 体幹はV字軌道でフレーム30に頂点（y最小）
    /// - 手首はフレーム1〜17に準備動作、34から高速リリース
    /// - 全フレーム動作継続（停止なし）
    fn jump_sequence() -> LandmarkSequence {
        let frames: Vec<PoseFrame> = (0u32..60)
            .map(|t| {
                let tf = t as f32;
                let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
                for lm in landmarks.iter_mut() {
                    *lm = Landmark::new(0.5, 0.5, 0.9);
                }
                // 腰: 1.0 → 0.6 → 1.0 のV字（頂点=30）
                let hip_y = if t <= 30 {
                    1.0 - (0.4 / 30.0) * tf
                } else {
                    0.6 + (0.4 / 29.0) * (tf - 30.0)
                };
                // 体は一体で上下する（肩・両腰・足首も同じ軌道に乗せる）
                for (idx, offset) in [
                    (LandmarkIndex::LeftShoulder, -0.4),
                    (LandmarkIndex::RightShoulder, -0.4),
                    (LandmarkIndex::LeftHip, 0.0),
                    (LandmarkIndex::RightHip, 0.0),
                    (LandmarkIndex::LeftAnkle, 0.45),
                    (LandmarkIndex::RightAnkle, 0.45),
                ] {
                    landmarks[idx as usize] = Landmark::new(0.5, hip_y + offset, 0.9);
                }
                // 手首: 0〜17 緩い準備動作、18〜33 静止、34〜 高速移動
                let wrist_y = if t <= 17 {
                    0.8 - 0.02 * tf
                } else if t <= 33 {
                    0.8 - 0.02 * 17.0
                } else {
                    0.8 - 0.02 * 17.0 - 0.1 * (tf - 33.0)
                };
                landmarks[LandmarkIndex::RightWrist as usize] =
                    Landmark::new(0.3, wrist_y, 0.9);
                PoseFrame::new(t, landmarks)
            })
            .collect();
        LandmarkSequence::new(frames).unwrap()
    }

    #[test]
    fn test_short_sequence_all_absent() {
        let detector = KeyframeDetector::from_config(&test_config());
        let frames: Vec<PoseFrame> = (0u32..5)
            .map(|t| {
                let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
                for lm in landmarks.iter_mut() {
                    *lm = Landmark::new(0.5, 0.5, 0.9);
                }
                PoseFrame::new(t, landmarks)
            })
            .collect();
        let seq = LandmarkSequence::new(frames).unwrap();
        let outcome = detector.detect(&seq);
        assert!(outcome.keyframes.all_absent());
        assert!(!outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_jump_keyframes() {
        let detector = KeyframeDetector::from_config(&test_config());
        let outcome = detector.detect(&jump_sequence());
        let kf = outcome.keyframes;

        // start: 手首の準備動作で先頭付近
        let start = kf.start.unwrap();
        assert!(start <= 2, "start={}", start);
        // peak: 腰のy最小はフレーム30
        assert_eq!(kf.peak_displacement, Some(30));
        // release: 手首速度0.1がフレーム34で閾値0.05を超える
        assert_eq!(kf.release, Some(34));
        // end: 停止しないため最終フレーム
        assert_eq!(kf.end, Some(59));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_ordering_invariant_holds() {
        let detector = KeyframeDetector::from_config(&test_config());
        let kf = detector.detect(&jump_sequence()).keyframes;
        if let (Some(s), Some(p), Some(r), Some(e)) =
            (kf.start, kf.peak_displacement, kf.release, kf.end)
        {
            assert!(s <= p && p <= r && r <= e, "{:?}", kf);
        } else {
            panic!("expected all keyframes present: {:?}", kf);
        }
    }

    #[test]
    fn test_all_low_confidence_all_absent() {
        let detector = KeyframeDetector::from_config(&test_config());
        let frames: Vec<PoseFrame> = (0u32..60)
            .map(|t| {
                let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
                for lm in landmarks.iter_mut() {
                    *lm = Landmark::new(0.5, 0.5, 0.1);
                }
                PoseFrame::new(t, landmarks)
            })
            .collect();
        let seq = LandmarkSequence::new(frames).unwrap();
        let outcome = detector.detect(&seq);
        assert!(outcome.keyframes.all_absent(), "{:?}", outcome.keyframes);
    }

    #[test]
    fn test_stationary_sequence_start_fallback() {
        // 全フレーム静止: onset速度は超えない → 最初の有効フレームにフォールバック
        let detector = KeyframeDetector::from_config(&test_config());
        let frames: Vec<PoseFrame> = (0u32..20)
            .map(|t| {
                let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
                for lm in landmarks.iter_mut() {
                    *lm = Landmark::new(0.5, 0.5, 0.9);
                }
                PoseFrame::new(t, landmarks)
            })
            .collect();
        let seq = LandmarkSequence::new(frames).unwrap();
        let outcome = detector.detect(&seq);
        assert_eq!(outcome.keyframes.start, Some(0));
        // peak: 同値はもっとも早い出現
        assert_eq!(outcome.keyframes.peak_displacement, Some(0));
        // release: 速度ゼロのため absent（推測しない）
        assert_eq!(outcome.keyframes.release, None);
        // end: 静止のためアンカー直後
        assert_eq!(outcome.keyframes.end, Some(1));
    }

    #[test]
    fn test_release_window_bounds_search() {
        // 手首のスパイクがピークから窓外（release_window超）なら absent
        let mut config = test_config();
        config.release_window = 3;
        let detector = KeyframeDetector::from_config(&config);
        let outcome = detector.detect(&jump_sequence());
        // ピーク30、スパイク34 > 30+3 → リリースなし
        assert_eq!(outcome.keyframes.release, None);
    }

    #[test]
    fn test_enforce_ordering_discards_violator() {
        let mut diagnostics = Vec::new();
        let mut kf = Keyframes {
            start: Some(10),
            peak_displacement: Some(5),
            release: Some(12),
            end: Some(20),
        };
        enforce_ordering(&mut kf, &mut diagnostics);
        // peak(5) < start(10) → peakを破棄、他は保持
        assert_eq!(kf.start, Some(10));
        assert_eq!(kf.peak_displacement, None);
        assert_eq!(kf.release, Some(12));
        assert_eq!(kf.end, Some(20));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("peak_displacement"));
    }

    #[test]
    fn test_enforce_ordering_keeps_valid() {
        let mut diagnostics = Vec::new();
        let mut kf = Keyframes {
            start: Some(0),
            peak_displacement: Some(30),
            release: Some(34),
            end: Some(59),
        };
        let before = kf;
        enforce_ordering(&mut kf, &mut diagnostics);
        assert_eq!(kf, before);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_enforce_ordering_ignores_absent() {
        // absent を挟んでも残りの順序だけ検証される
        let mut diagnostics = Vec::new();
        let mut kf = Keyframes {
            start: Some(5),
            peak_displacement: None,
            release: Some(3),
            end: Some(10),
        };
        enforce_ordering(&mut kf, &mut diagnostics);
        assert_eq!(kf.release, None);
        assert_eq!(kf.end, Some(10));
    }
}
