use serde::{Deserialize, Serialize};

/// 身体比率テーブル（Drillis & Contini 1966）
///
/// 身長に対する体節長の比。身体スケール正規化メトリクスで
/// 変位量を「身長 × 比率」で割るために使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySegment {
    /// 身長そのもの
    Height,
    /// 床から大転子まで
    HipHeight,
    /// 肩峰高
    ShoulderHeight,
    /// 大腿長
    ThighLength,
    /// 下腿長
    ShankLength,
    /// 上腕＋前腕
    ArmLength,
    /// 肩から腰まで
    TorsoLength,
}

impl BodySegment {
    /// 身長に対する比率
    pub fn fraction(self) -> f32 {
        match self {
            BodySegment::Height => 1.0,
            BodySegment::HipHeight => 0.530,
            BodySegment::ShoulderHeight => 0.818,
            BodySegment::ThighLength => 0.245,
            BodySegment::ShankLength => 0.246,
            BodySegment::ArmLength => 0.332,
            BodySegment::TorsoLength => 0.288,
        }
    }

    /// 身長（メートル）から体節長（メートル）を算出
    pub fn length_m(self, height_m: f32) -> f32 {
        height_m * self.fraction()
    }
}
