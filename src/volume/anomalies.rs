use crate::volume::models::{
    Anomaly, AnomalySeverity, AnomalyType, ApproachVolume, FacilityType, VolumeAreaType, VolumeInput,
};

const PHF_MIN: f64 = 0.70;
const PHF_MISMATCH_TOLERANCE: f64 = 0.05;
const IMBALANCE_RATIO: f64 = 2.0;

/// 每車道約 900 veh/h 視為偏高，假設兩車道並加 1.5 倍餘裕
const HIGH_VOLUME_THRESHOLD: f64 = 900.0 * 2.0 * 1.5;

const OPPOSING_PAIRS: [(&str, &str); 4] = [
    ("northbound", "southbound"),
    ("nb", "sb"),
    ("eastbound", "westbound"),
    ("eb", "wb"),
];

fn anomaly(
    anomaly_type: AnomalyType,
    severity: AnomalySeverity,
    location: impl Into<String>,
    message: String,
) -> Anomaly {
    Anomaly {
        anomaly_type,
        severity,
        location: location.into(),
        message,
        current_value: None,
        expected_range: None,
    }
}

impl Anomaly {
    fn with_value(mut self, value: f64) -> Self {
        self.current_value = Some(value);
        self
    }

    fn expecting(mut self, range: impl Into<String>) -> Self {
        self.expected_range = Some(range.into());
        self
    }
}

pub fn detect_phf_anomalies(approach: &ApproachVolume, area: VolumeAreaType) -> Vec<Anomaly> {
    let name = approach.name.as_str();
    let Some(phf) = approach.phf else {
        return vec![anomaly(
            AnomalyType::MissingData,
            AnomalySeverity::Info,
            name,
            format!("PHF not provided for {}", name),
        )
        .expecting("0.85-0.95 typical")];
    };

    let mut anomalies = Vec::new();

    if phf < PHF_MIN {
        anomalies.push(
            anomaly(
                AnomalyType::PhfOutOfRange,
                AnomalySeverity::Error,
                name,
                format!("PHF of {:.2} is below minimum valid value of 0.70", phf),
            )
            .with_value(phf)
            .expecting("0.70-1.00"),
        );
    } else if phf > 1.0 {
        anomalies.push(
            anomaly(
                AnomalyType::PhfOutOfRange,
                AnomalySeverity::Error,
                name,
                format!("PHF of {:.2} exceeds maximum of 1.00", phf),
            )
            .with_value(phf)
            .expecting("0.70-1.00"),
        );
    }

    match area {
        VolumeAreaType::Urban | VolumeAreaType::Cbd => {
            if (PHF_MIN..0.85).contains(&phf) {
                anomalies.push(
                    anomaly(
                        AnomalyType::PhfTooLow,
                        AnomalySeverity::Warning,
                        name,
                        format!(
                            "PHF of {:.2} is below typical minimum of 0.85 for {} areas",
                            phf, area
                        ),
                    )
                    .with_value(phf)
                    .expecting("0.85-0.95"),
                );
            } else if phf > 0.98 {
                anomalies.push(
                    anomaly(
                        AnomalyType::PhfTooHigh,
                        AnomalySeverity::Info,
                        name,
                        format!("PHF of {:.2} is unusually high - verify peak 15-min count", phf),
                    )
                    .with_value(phf)
                    .expecting("0.85-0.95"),
                );
            }
        }
        VolumeAreaType::Suburban if (PHF_MIN..0.80).contains(&phf) => {
            anomalies.push(
                anomaly(
                    AnomalyType::PhfTooLow,
                    AnomalySeverity::Warning,
                    name,
                    format!("PHF of {:.2} is below typical minimum of 0.80 for suburban areas", phf),
                )
                .with_value(phf)
                .expecting("0.80-0.95"),
            );
        }
        _ => {}
    }

    anomalies
}

pub fn detect_heavy_vehicle_anomalies(
    approach: &ApproachVolume,
    area: VolumeAreaType,
    facility: FacilityType,
) -> Vec<Anomaly> {
    let Some(hv) = approach.heavy_vehicle_pct else {
        return Vec::new();
    };

    let (high, very_high, expected) = match area {
        VolumeAreaType::Cbd => (5.0, 10.0, "2-5%"),
        VolumeAreaType::Urban => (8.0, 15.0, "2-8%"),
        VolumeAreaType::Suburban => (12.0, 20.0, "3-12%"),
        VolumeAreaType::Rural => (20.0, 30.0, "5-20%"),
    };

    let found = if hv > very_high {
        Some((
            AnomalySeverity::Warning,
            format!("Heavy vehicle percentage of {:.1}% is very high for {} {}", hv, area, facility),
        ))
    } else if hv > high {
        Some((
            AnomalySeverity::Info,
            format!("Heavy vehicle percentage of {:.1}% is above typical for {} {}", hv, area, facility),
        ))
    } else {
        None
    };

    found
        .map(|(severity, message)| {
            anomaly(AnomalyType::HighHeavyVehiclePct, severity, &approach.name, message)
                .with_value(hv)
                .expecting(expected)
        })
        .into_iter()
        .collect()
}

pub fn detect_volume_anomalies(approach: &ApproachVolume, area: VolumeAreaType) -> Vec<Anomaly> {
    let name = approach.name.as_str();
    let total = approach.movements.total();

    if total == 0.0 {
        return vec![anomaly(
            AnomalyType::ZeroVolume,
            AnomalySeverity::Warning,
            name,
            format!("Zero total volume for {} - verify if approach is closed", name),
        )
        .with_value(0.0)];
    }

    let mut anomalies = Vec::new();

    let low_threshold = if area.is_urban_core() { 50.0 } else { 20.0 };
    if total < low_threshold {
        anomalies.push(
            anomaly(
                AnomalyType::VeryLowVolume,
                AnomalySeverity::Info,
                name,
                format!("Very low volume ({:.0} vph) for {}", total, name),
            )
            .with_value(total)
            .expecting(format!(">{} vph typical", low_threshold)),
        );
    }

    if total > HIGH_VOLUME_THRESHOLD {
        anomalies.push(
            anomaly(
                AnomalyType::UnrealisticHighVolume,
                AnomalySeverity::Warning,
                name,
                format!("Volume of {:.0} vph may be unrealistically high - verify count", total),
            )
            .with_value(total)
            .expecting(format!("<{:.0} vph typical", HIGH_VOLUME_THRESHOLD)),
        );
    }

    let movements = [
        ("left", approach.movements.left),
        ("through", approach.movements.through),
        ("right", approach.movements.right),
    ];
    for (movement, value) in movements {
        if value >= 200.0 && value % 100.0 == 0.0 {
            anomalies.push(
                anomaly(
                    AnomalyType::SuspiciousRoundNumber,
                    AnomalySeverity::Info,
                    format!("{}/{}", name, movement),
                    format!("Volume of {:.0} is a round number - may be estimated", value),
                )
                .with_value(value),
            );
        }
    }

    anomalies
}

/// 對向進口流量比 > 2.0 時提示
pub fn detect_volume_imbalance(input: &VolumeInput) -> Vec<Anomaly> {
    let find = |direction: &str| {
        input
            .approaches
            .iter()
            .rev()
            .find(|a| a.name.to_lowercase() == direction)
    };

    OPPOSING_PAIRS
        .iter()
        .filter_map(|(d1, d2)| {
            let (a1, a2) = (find(d1)?, find(d2)?);
            let (t1, t2) = (a1.movements.total(), a2.movements.total());
            if t1 <= 0.0 || t2 <= 0.0 {
                return None;
            }
            let ratio = t1.max(t2) / t1.min(t2);
            (ratio > IMBALANCE_RATIO).then(|| {
                anomaly(
                    AnomalyType::VolumeImbalance,
                    AnomalySeverity::Info,
                    format!("{} vs {}", a1.name, a2.name),
                    format!(
                        "Significant imbalance between opposing approaches ({:.0} vs {:.0} vph)",
                        t1, t2
                    ),
                )
                .with_value(ratio)
                .expecting("Ratio < 2.0")
            })
        })
        .collect()
}

pub fn detect_phf_volume_mismatch(approach: &ApproachVolume) -> Vec<Anomaly> {
    let (Some(phf), Some(calculated)) = (approach.phf, approach.calculated_phf()) else {
        return Vec::new();
    };

    if (calculated - phf).abs() <= PHF_MISMATCH_TOLERANCE {
        return Vec::new();
    }

    vec![anomaly(
        AnomalyType::PeakHourMismatch,
        AnomalySeverity::Warning,
        &approach.name,
        format!(
            "Provided PHF ({:.2}) doesn't match calculated PHF ({:.2})",
            phf, calculated
        ),
    )
    .with_value(phf)
    .expecting(format!("{:.2}", calculated))]
}

pub fn detect_all_anomalies(input: &VolumeInput) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    for approach in &input.approaches {
        anomalies.extend(detect_phf_anomalies(approach, input.area_type));
        anomalies.extend(detect_heavy_vehicle_anomalies(
            approach,
            input.area_type,
            input.facility_type,
        ));
        anomalies.extend(detect_volume_anomalies(approach, input.area_type));
        anomalies.extend(detect_phf_volume_mismatch(approach));
    }
    anomalies.extend(detect_volume_imbalance(input));

    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::models::TurningMovement;

    fn approach(name: &str, left: f64, through: f64, right: f64) -> ApproachVolume {
        ApproachVolume {
            name: name.to_string(),
            movements: TurningMovement { left, through, right },
            phf: Some(0.92),
            heavy_vehicle_pct: Some(3.0),
            peak_hour_volume: None,
            peak_15_min_volume: None,
        }
    }

    fn types(anomalies: &[Anomaly]) -> Vec<AnomalyType> {
        anomalies.iter().map(|a| a.anomaly_type).collect()
    }

    #[test]
    fn test_phf_rules() {
        let mut a = approach("NB", 100.0, 850.0, 95.0);
        assert!(detect_phf_anomalies(&a, VolumeAreaType::Urban).is_empty());

        a.phf = Some(0.72);
        assert_eq!(types(&detect_phf_anomalies(&a, VolumeAreaType::Urban)), vec![AnomalyType::PhfTooLow]);
        assert!(detect_phf_anomalies(&a, VolumeAreaType::Rural).is_empty());

        a.phf = Some(0.65);
        let found = detect_phf_anomalies(&a, VolumeAreaType::Urban);
        assert_eq!(found[0].severity, AnomalySeverity::Error);

        a.phf = None;
        assert_eq!(types(&detect_phf_anomalies(&a, VolumeAreaType::Urban)), vec![AnomalyType::MissingData]);
    }

    #[test]
    fn test_heavy_vehicle_thresholds() {
        let mut a = approach("EB", 50.0, 500.0, 50.0);
        a.heavy_vehicle_pct = Some(12.0);
        let found = detect_heavy_vehicle_anomalies(&a, VolumeAreaType::Cbd, FacilityType::Arterial);
        assert_eq!(found[0].severity, AnomalySeverity::Warning);
        assert!(found[0].message.contains("cbd arterial"));

        let found = detect_heavy_vehicle_anomalies(&a, VolumeAreaType::Urban, FacilityType::Arterial);
        assert_eq!(found[0].severity, AnomalySeverity::Info);

        assert!(detect_heavy_vehicle_anomalies(&a, VolumeAreaType::Rural, FacilityType::Local).is_empty());
    }

    #[test]
    fn test_zero_volume_stops_further_checks() {
        let found = detect_volume_anomalies(&approach("WB", 0.0, 0.0, 0.0), VolumeAreaType::Urban);
        assert_eq!(types(&found), vec![AnomalyType::ZeroVolume]);
    }

    #[test]
    fn test_round_numbers_and_high_volume() {
        let found = detect_volume_anomalies(&approach("SB", 300.0, 2500.0, 95.0), VolumeAreaType::Urban);
        assert_eq!(
            types(&found),
            vec![
                AnomalyType::UnrealisticHighVolume,
                AnomalyType::SuspiciousRoundNumber,
                AnomalyType::SuspiciousRoundNumber
            ]
        );
        assert_eq!(found[1].location, "SB/left");
        assert_eq!(found[2].location, "SB/through");
    }

    #[test]
    fn test_very_low_volume_depends_on_area() {
        let a = approach("NB", 5.0, 30.0, 5.0);
        assert_eq!(types(&detect_volume_anomalies(&a, VolumeAreaType::Urban)), vec![AnomalyType::VeryLowVolume]);
        assert!(detect_volume_anomalies(&a, VolumeAreaType::Rural).is_empty());
    }

    #[test]
    fn test_imbalance_case_insensitive() {
        let input = VolumeInput {
            intersection_name: None,
            count_date: None,
            count_period: None,
            approaches: vec![approach("Northbound", 50.0, 900.0, 55.0), approach("SOUTHBOUND", 20.0, 350.0, 25.0)],
            area_type: VolumeAreaType::Urban,
            facility_type: FacilityType::Arterial,
            base_year: None,
            analysis_year: None,
            annual_growth_rate: None,
        };
        let found = detect_volume_imbalance(&input);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location, "Northbound vs SOUTHBOUND");
        assert!(found[0].current_value.unwrap() > 2.0);
    }

    #[test]
    fn test_phf_mismatch() {
        let mut a = approach("NB", 100.0, 800.0, 100.0);
        a.peak_hour_volume = Some(1000.0);
        a.peak_15_min_volume = Some(320.0);
        // 計算值 0.78，與 0.92 差距超過 0.05
        assert_eq!(types(&detect_phf_volume_mismatch(&a)), vec![AnomalyType::PeakHourMismatch]);

        a.peak_15_min_volume = Some(272.0);
        assert!(detect_phf_volume_mismatch(&a).is_empty());
    }
}
