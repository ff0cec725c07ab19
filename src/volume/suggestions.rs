use crate::utils::numeric::round_to;
use crate::volume::models::{
    Anomaly, AnomalyType, ApproachVolume, Suggestion, SuggestionType, VolumeAreaType, VolumeInput,
};
use std::collections::{HashMap, HashSet};

fn suggestion(
    suggestion_type: SuggestionType,
    location: impl Into<String>,
    message: String,
    confidence: f64,
    rationale: impl Into<String>,
) -> Suggestion {
    Suggestion {
        suggestion_type,
        location: location.into(),
        message,
        current_value: None,
        suggested_value: None,
        confidence,
        rationale: rationale.into(),
    }
}

impl Suggestion {
    fn values(mut self, current: Option<f64>, suggested: Option<f64>) -> Self {
        self.current_value = current;
        self.suggested_value = suggested;
        self
    }
}

pub fn suggest_phf_correction(
    approach: &ApproachVolume,
    anomaly: &Anomaly,
    area: VolumeAreaType,
) -> Option<Suggestion> {
    if !matches!(
        anomaly.anomaly_type,
        AnomalyType::PhfTooLow | AnomalyType::PhfOutOfRange | AnomalyType::MissingData
    ) {
        return None;
    }

    let default_phf = area.default_phf();
    let Some(current) = anomaly.current_value.or(approach.phf) else {
        return Some(
            suggestion(
                SuggestionType::UseDefaultValue,
                &approach.name,
                format!("Use default PHF of {:.2} for {} area", default_phf, area),
                0.70,
                format!("No PHF provided; {:.2} is typical for {} conditions", default_phf, area),
            )
            .values(None, Some(default_phf)),
        );
    };

    if current < 0.70 {
        return Some(
            suggestion(
                SuggestionType::AdjustPhf,
                &approach.name,
                format!("Adjust PHF from {:.2} to minimum valid value of 0.70", current),
                0.90,
                "PHF below 0.70 is physically impossible",
            )
            .values(Some(current), Some(0.70)),
        );
    }

    if current < 0.85 && area.is_urban_core() {
        return Some(
            suggestion(
                SuggestionType::AdjustPhf,
                &approach.name,
                format!("Consider adjusting PHF from {:.2} to {:.2}", current, default_phf),
                0.65,
                format!(
                    "PHF of {:.2} is unusual for {} areas; verify peak 15-min count or use typical value",
                    current, area
                ),
            )
            .values(Some(current), Some(default_phf)),
        );
    }

    None
}

/// PHF 缺漏時，優先由尖峰流量計算，否則採地區預設值
pub fn suggest_missing_phf(approach: &ApproachVolume, area: VolumeAreaType) -> Option<Suggestion> {
    if approach.phf.is_some() {
        return None;
    }

    if let Some(calculated) = approach.calculated_phf() {
        let phf = calculated.clamp(0.70, 1.0);
        return Some(
            suggestion(
                SuggestionType::AdjustPhf,
                &approach.name,
                format!("Calculate PHF as {:.2} from peak volumes", phf),
                0.90,
                "PHF calculated from provided peak hour and 15-minute volumes",
            )
            .values(None, Some(round_to(phf, 2))),
        );
    }

    let default_phf = area.default_phf();
    Some(
        suggestion(
            SuggestionType::UseDefaultValue,
            &approach.name,
            format!("Use default PHF of {:.2}", default_phf),
            0.70,
            format!("No PHF or peak volumes provided; using typical value for {}", area),
        )
        .values(None, Some(default_phf)),
    )
}

pub fn suggest_heavy_vehicle_adjustment(
    approach: &ApproachVolume,
    anomaly: &Anomaly,
    area: VolumeAreaType,
) -> Option<Suggestion> {
    if anomaly.anomaly_type != AnomalyType::HighHeavyVehiclePct {
        return None;
    }

    let current = anomaly.current_value.or(approach.heavy_vehicle_pct)?;
    let typical = area.typical_heavy_vehicle_pct();

    Some(
        suggestion(
            SuggestionType::VerifyCount,
            &approach.name,
            format!(
                "Verify heavy vehicle count ({:.1}%); typical is {:.1}%",
                current, typical
            ),
            0.50,
            format!(
                "Heavy vehicle percentage of {:.1}% is above typical; verify classification counts or check for nearby truck generators",
                current
            ),
        )
        .values(Some(current), Some(typical)),
    )
}

/// 分析年晚於基準年時建議複利成長係數
pub fn suggest_growth_adjustment(input: &VolumeInput) -> Option<Suggestion> {
    // 年份相減溢位時視同無法推估
    let years = input.analysis_year?.checked_sub(input.base_year?)?;
    if years <= 0 {
        return None;
    }

    let (rate, confidence, rationale) = match input.annual_growth_rate {
        Some(rate) => (
            rate,
            0.85,
            format!("Using provided annual growth rate of {:.1}%", rate),
        ),
        None => (
            input.area_type.typical_growth_rate(),
            0.60,
            format!("Using typical growth rate for {} areas", input.area_type),
        ),
    };

    let factor = (1.0 + rate / 100.0).powi(years);

    Some(
        suggestion(
            SuggestionType::ApplyGrowthFactor,
            "All approaches",
            format!(
                "Apply growth factor of {:.3} ({} years at {:.1}%/year)",
                factor, years, rate
            ),
            confidence,
            rationale,
        )
        .values(Some(1.0), Some(round_to(factor, 3))),
    )
}

pub fn suggest_volume_verification(approach: &ApproachVolume, anomaly: &Anomaly) -> Option<Suggestion> {
    let value = anomaly.current_value.unwrap_or_default();
    match anomaly.anomaly_type {
        AnomalyType::ZeroVolume => Some(
            suggestion(
                SuggestionType::VerifyCount,
                &approach.name,
                "Verify if approach is closed or count is missing".to_string(),
                0.50,
                "Zero volume may indicate closed approach, missing data, or count error",
            )
            .values(Some(0.0), None),
        ),
        AnomalyType::SuspiciousRoundNumber => Some(
            suggestion(
                SuggestionType::VerifyCount,
                &anomaly.location,
                format!("Verify count of {:.0} - may be estimated", value),
                0.40,
                "Round numbers often indicate estimates rather than actual counts",
            )
            .values(anomaly.current_value, None),
        ),
        AnomalyType::UnrealisticHighVolume => Some(
            suggestion(
                SuggestionType::VerifyCount,
                &approach.name,
                format!("Verify high volume of {:.0} vph", value),
                0.60,
                "Volume exceeds typical capacity; verify lane count and count accuracy",
            )
            .values(anomaly.current_value, None),
        ),
        _ => None,
    }
}

pub fn generate_suggestions(input: &VolumeInput, anomalies: &[Anomaly]) -> Vec<Suggestion> {
    // 依進口名稱分組（"NB/left" 歸於 "NB"）
    let mut by_approach: HashMap<&str, Vec<&Anomaly>> = HashMap::new();
    for anomaly in anomalies {
        let base = anomaly.location.split('/').next().unwrap_or_default();
        by_approach.entry(base).or_default().push(anomaly);
    }

    let mut suggestions = Vec::new();
    for approach in &input.approaches {
        suggestions.extend(suggest_missing_phf(approach, input.area_type));

        for anomaly in by_approach.get(approach.name.as_str()).into_iter().flatten() {
            suggestions.extend(suggest_phf_correction(approach, anomaly, input.area_type));
            suggestions.extend(suggest_heavy_vehicle_adjustment(approach, anomaly, input.area_type));
            suggestions.extend(suggest_volume_verification(approach, anomaly));
        }
    }
    suggestions.extend(suggest_growth_adjustment(input));

    let mut seen = HashSet::new();
    suggestions.retain(|s| seen.insert((s.suggestion_type, s.location.clone())));
    suggestions
}
