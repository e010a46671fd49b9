pub mod rules;
pub mod service;

pub use rules::AlertKind;
pub use service::{AnalysisError, ReadingAnalyzer, TelemetryAnalyzer, Verdict};
