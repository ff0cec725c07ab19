use crate::utils::error::Result;
use crate::utils::validation::{Validate, Violations};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    PhfOutOfRange,
    PhfTooLow,
    PhfTooHigh,
    HighHeavyVehiclePct,
    VolumeImbalance,
    SuspiciousRoundNumber,
    ZeroVolume,
    VeryLowVolume,
    UnrealisticHighVolume,
    MissingData,
    PeakHourMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    AdjustPhf,
    AdjustHeavyVehiclePct,
    ApplyGrowthFactor,
    BalanceVolumes,
    VerifyCount,
    UseDefaultValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeAreaType {
    #[default]
    Urban,
    Suburban,
    Rural,
    Cbd,
}

impl VolumeAreaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeAreaType::Urban => "urban",
            VolumeAreaType::Suburban => "suburban",
            VolumeAreaType::Rural => "rural",
            VolumeAreaType::Cbd => "cbd",
        }
    }

    pub fn is_urban_core(&self) -> bool {
        matches!(self, VolumeAreaType::Urban | VolumeAreaType::Cbd)
    }

    pub fn default_phf(&self) -> f64 {
        match self {
            VolumeAreaType::Cbd => 0.92,
            VolumeAreaType::Urban => 0.90,
            VolumeAreaType::Suburban => 0.88,
            VolumeAreaType::Rural => 0.85,
        }
    }

    pub fn typical_heavy_vehicle_pct(&self) -> f64 {
        match self {
            VolumeAreaType::Cbd => 3.0,
            VolumeAreaType::Urban => 5.0,
            VolumeAreaType::Suburban => 7.0,
            VolumeAreaType::Rural => 12.0,
        }
    }

    /// 年成長率（%）
    pub fn typical_growth_rate(&self) -> f64 {
        match self {
            VolumeAreaType::Cbd => 0.5,
            VolumeAreaType::Urban => 1.0,
            VolumeAreaType::Suburban => 2.0,
            VolumeAreaType::Rural => 1.5,
        }
    }
}

impl fmt::Display for VolumeAreaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityType {
    #[default]
    Arterial,
    Collector,
    Local,
    Freeway,
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FacilityType::Arterial => "arterial",
            FacilityType::Collector => "collector",
            FacilityType::Local => "local",
            FacilityType::Freeway => "freeway",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TurningMovement {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub through: f64,
    #[serde(default)]
    pub right: f64,
}

impl TurningMovement {
    pub fn total(&self) -> f64 {
        self.left + self.through + self.right
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproachVolume {
    pub name: String,
    pub movements: TurningMovement,
    #[serde(default)]
    pub phf: Option<f64>,
    #[serde(default)]
    pub heavy_vehicle_pct: Option<f64>,
    #[serde(default)]
    pub peak_hour_volume: Option<f64>,
    #[serde(default)]
    pub peak_15_min_volume: Option<f64>,
}

impl ApproachVolume {
    /// PHF = 尖峰小時流量 / (4 × 尖峰 15 分鐘流量)
    pub fn calculated_phf(&self) -> Option<f64> {
        match (self.peak_hour_volume, self.peak_15_min_volume) {
            (Some(hour), Some(peak15)) if peak15 > 0.0 => Some(hour / (4.0 * peak15)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInput {
    #[serde(default)]
    pub intersection_name: Option<String>,
    #[serde(default)]
    pub count_date: Option<String>,
    #[serde(default)]
    pub count_period: Option<String>,
    pub approaches: Vec<ApproachVolume>,
    #[serde(default)]
    pub area_type: VolumeAreaType,
    #[serde(default)]
    pub facility_type: FacilityType,
    #[serde(default)]
    pub base_year: Option<i32>,
    #[serde(default)]
    pub analysis_year: Option<i32>,
    #[serde(default)]
    pub annual_growth_rate: Option<f64>,
}

impl Validate for VolumeInput {
    fn validate(&self) -> Result<()> {
        let mut v = Violations::new();

        if self.approaches.is_empty() {
            v.push("approaches", 0, "at least one approach is required");
        }

        for (i, approach) in self.approaches.iter().enumerate() {
            let field = |name: &str| format!("approaches[{}].{}", i, name);
            v.at_least(&field("movements.left"), approach.movements.left, 0.0);
            v.at_least(&field("movements.through"), approach.movements.through, 0.0);
            v.at_least(&field("movements.right"), approach.movements.right, 0.0);
            // PHF 上限交由異常偵測回報
            if let Some(phf) = approach.phf {
                v.at_least(&field("phf"), phf, 0.0);
            }
            if let Some(hv) = approach.heavy_vehicle_pct {
                v.within(&field("heavy_vehicle_pct"), hv, 0.0, 100.0);
            }
            if let Some(volume) = approach.peak_hour_volume {
                v.at_least(&field("peak_hour_volume"), volume, 0.0);
            }
            if let Some(volume) = approach.peak_15_min_volume {
                v.at_least(&field("peak_15_min_volume"), volume, 0.0);
            }
        }

        if let Some(date) = &self.count_date {
            if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                v.push("count_date", date, "must be a date in YYYY-MM-DD format");
            }
        }
        for (name, year) in [("base_year", self.base_year), ("analysis_year", self.analysis_year)] {
            if let Some(year) = year {
                if !(1990..=2100).contains(&year) {
                    v.push(name, year, "must be between 1990 and 2100");
                }
            }
        }
        if let Some(rate) = self.annual_growth_rate {
            v.within("annual_growth_rate", rate, -5.0, 10.0);
        }

        v.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: AnomalySeverity,
    pub location: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub location: String,
    pub message: String,
    pub current_value: Option<f64>,
    pub suggested_value: Option<f64>,
    pub confidence: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeSummary {
    pub total_entering_volume: f64,
    pub approaches_analyzed: usize,
    pub average_phf: Option<f64>,
    pub average_heavy_vehicle_pct: Option<f64>,
    pub area_type: VolumeAreaType,
    pub facility_type: FacilityType,
}

/// 僅為建議性質，不修改輸入資料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnalysisResult {
    pub valid: bool,
    pub anomaly_count: usize,
    pub warning_count: usize,
    pub error_count: usize,
    pub anomalies: Vec<Anomaly>,
    pub suggestions: Vec<Suggestion>,
    pub summary: VolumeSummary,
}
