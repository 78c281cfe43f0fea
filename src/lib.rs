pub mod analysis;
pub mod config;
pub mod error;
pub mod pose;
pub mod report;

pub use analysis::{analyze, Analysis, AnalysisRequest};
pub use error::AnalysisError;
