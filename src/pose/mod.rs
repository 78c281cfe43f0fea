pub mod landmark;
pub mod sequence;

pub use landmark::{Landmark, LandmarkIndex};
pub use sequence::{LandmarkSequence, PoseFrame};
