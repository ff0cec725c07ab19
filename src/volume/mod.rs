//! 流量資料檢查：異常偵測與修正建議，僅供參考。

pub mod anomalies;
pub mod models;
pub mod service;
pub mod suggestions;

pub use models::{
    Anomaly, AnomalySeverity, AnomalyType, ApproachVolume, FacilityType, Suggestion,
    SuggestionType, TurningMovement, VolumeAnalysisResult, VolumeAreaType, VolumeInput,
    VolumeSummary,
};
pub use service::analyze_volumes;
