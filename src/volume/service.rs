use crate::utils::numeric::round_to;
use crate::volume::anomalies::detect_all_anomalies;
use crate::volume::models::{AnomalySeverity, VolumeAnalysisResult, VolumeInput, VolumeSummary};
use crate::volume::suggestions::generate_suggestions;

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn compute_summary(input: &VolumeInput) -> VolumeSummary {
    let total: f64 = input.approaches.iter().map(|a| a.movements.total()).sum();
    let phf: Vec<f64> = input.approaches.iter().filter_map(|a| a.phf).collect();
    let hv: Vec<f64> = input
        .approaches
        .iter()
        .filter_map(|a| a.heavy_vehicle_pct)
        .collect();

    VolumeSummary {
        total_entering_volume: round_to(total, 0),
        approaches_analyzed: input.approaches.len(),
        average_phf: mean(&phf).filter(|v| *v != 0.0).map(|v| round_to(v, 2)),
        average_heavy_vehicle_pct: mean(&hv).filter(|v| *v != 0.0).map(|v| round_to(v, 1)),
        area_type: input.area_type,
        facility_type: input.facility_type,
    }
}

/// 檢查流量資料並產生修正建議；不計算服務水準，也不修改輸入
pub fn analyze_volumes(input: &VolumeInput) -> VolumeAnalysisResult {
    let anomalies = detect_all_anomalies(input);

    let count = |severity: AnomalySeverity| anomalies.iter().filter(|a| a.severity == severity).count();
    let warning_count = count(AnomalySeverity::Warning);
    let error_count = count(AnomalySeverity::Error);

    if warning_count > 0 || error_count > 0 {
        tracing::warn!(
            "⚠️ Volume check for {}: {} warning(s), {} error(s)",
            input.intersection_name.as_deref().unwrap_or("unnamed intersection"),
            warning_count,
            error_count
        );
    }

    let suggestions = generate_suggestions(input, &anomalies);

    VolumeAnalysisResult {
        valid: error_count == 0,
        anomaly_count: anomalies.len(),
        warning_count,
        error_count,
        anomalies,
        suggestions,
        summary: compute_summary(input),
    }
}
