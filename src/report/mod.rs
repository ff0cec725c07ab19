//! 報告敘述：由分析結果產生可直接放入報告的段落文字。

pub mod models;
pub mod narratives;
pub mod service;

pub use models::{
    AnalysisPeriod, IntersectionResult, LaneGroupSummary, NarrativeOptions, NarrativeSection,
    ReportNarrative, ScenarioComparison, ScenarioResult, ScenarioType,
};
pub use service::{generate_narrative, queue_table_caption, summary_table_caption, NarrativeSubject};
