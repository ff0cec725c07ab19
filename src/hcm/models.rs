use crate::hcm::ENGINE_VERSION;
use crate::utils::error::{LosError, Result};
use crate::utils::validation::Violations;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LevelOfService {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl LevelOfService {
    pub const ALL: [LevelOfService; 6] = [
        LevelOfService::A,
        LevelOfService::B,
        LevelOfService::C,
        LevelOfService::D,
        LevelOfService::E,
        LevelOfService::F,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LevelOfService::A => "A",
            LevelOfService::B => "B",
            LevelOfService::C => "C",
            LevelOfService::D => "D",
            LevelOfService::E => "E",
            LevelOfService::F => "F",
        }
    }
}

impl fmt::Display for LevelOfService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LevelOfService {
    type Err = LosError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(LevelOfService::A),
            "B" => Ok(LevelOfService::B),
            "C" => Ok(LevelOfService::C),
            "D" => Ok(LevelOfService::D),
            "E" => Ok(LevelOfService::E),
            "F" => Ok(LevelOfService::F),
            _ => Err(LosError::InvalidConfigValueError {
                field: "los".to_string(),
                value: s.to_string(),
                reason: "Level of service must be one of A-F".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    #[default]
    Through,
    Left,
    Right,
    ThroughRight,
    ThroughLeft,
    LeftRight,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalControlType {
    #[default]
    Pretimed,
    ActuatedUncoordinated,
    ActuatedCoordinated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    Cbd,
    #[default]
    Other,
}

impl FromStr for AreaType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cbd" => Ok(AreaType::Cbd),
            "other" => Ok(AreaType::Other),
            _ => Err("must be 'cbd' or 'other'".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalTiming {
    pub cycle_length: f64,
    pub effective_green: f64,
    #[serde(default)]
    pub control_type: SignalControlType,
}

fn default_base_saturation_flow() -> f64 {
    1900.0
}

fn default_lane_width() -> f64 {
    12.0
}

fn default_area_type() -> String {
    "other".to_string()
}

fn default_analysis_period() -> f64 {
    0.25
}

fn default_upstream_filtering() -> f64 {
    1.0
}

/// 車道數接受整數或小數部分為零的浮點數（如 2.0）
fn deserialize_lane_count<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LaneCount {
        Integer(i64),
        Float(f64),
    }

    match LaneCount::deserialize(deserializer)? {
        LaneCount::Integer(n) => Ok(n),
        LaneCount::Float(f) if f.fract() == 0.0 && f.abs() <= i64::MAX as f64 => Ok(f as i64),
        LaneCount::Float(f) => Err(serde::de::Error::custom(format!(
            "num_lanes must be an integer, got {}",
            f
        ))),
    }
}

/// 未驗證的車道群輸入，欄位與 JSON 文件一一對應
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneGroupParams {
    pub volume: f64,
    #[serde(deserialize_with = "deserialize_lane_count")]
    pub num_lanes: i64,
    #[serde(default)]
    pub movement_type: MovementType,
    #[serde(default = "default_base_saturation_flow")]
    pub base_saturation_flow: f64,
    #[serde(default = "default_lane_width")]
    pub lane_width: f64,
    #[serde(default)]
    pub heavy_vehicle_pct: f64,
    #[serde(default)]
    pub grade_pct: f64,
    #[serde(default)]
    pub parking_adjacent: bool,
    #[serde(default)]
    pub parking_maneuvers_per_hour: f64,
    #[serde(default)]
    pub bus_stops_per_hour: f64,
    #[serde(default = "default_area_type")]
    pub area_type: String,
    #[serde(default)]
    pub left_turn_pct: f64,
    #[serde(default)]
    pub right_turn_pct: f64,
    pub signal_timing: SignalTiming,
    #[serde(default = "default_analysis_period")]
    pub analysis_period_hours: f64,
    #[serde(default = "default_upstream_filtering")]
    pub upstream_filtering_factor: f64,
}

impl LaneGroupParams {
    /// 以必要欄位建立，其餘使用預設值
    pub fn new(volume: f64, num_lanes: i64, cycle_length: f64, effective_green: f64) -> Self {
        Self {
            volume,
            num_lanes,
            movement_type: MovementType::default(),
            base_saturation_flow: default_base_saturation_flow(),
            lane_width: default_lane_width(),
            heavy_vehicle_pct: 0.0,
            grade_pct: 0.0,
            parking_adjacent: false,
            parking_maneuvers_per_hour: 0.0,
            bus_stops_per_hour: 0.0,
            area_type: default_area_type(),
            left_turn_pct: 0.0,
            right_turn_pct: 0.0,
            signal_timing: SignalTiming {
                cycle_length,
                effective_green,
                control_type: SignalControlType::default(),
            },
            analysis_period_hours: default_analysis_period(),
            upstream_filtering_factor: default_upstream_filtering(),
        }
    }
}

/// 已驗證、不可變的車道群輸入。
///
/// 只能經由 [`LaneGroupInput::try_new`] 或反序列化取得，
/// 兩者都會檢查所有欄位與 `effective_green <= cycle_length`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LaneGroupParams")]
pub struct LaneGroupInput {
    volume: f64,
    num_lanes: u32,
    movement_type: MovementType,
    base_saturation_flow: f64,
    lane_width: f64,
    heavy_vehicle_pct: f64,
    grade_pct: f64,
    parking_adjacent: bool,
    parking_maneuvers_per_hour: f64,
    bus_stops_per_hour: f64,
    area_type: AreaType,
    left_turn_pct: f64,
    right_turn_pct: f64,
    signal_timing: SignalTiming,
    analysis_period_hours: f64,
    upstream_filtering_factor: f64,
}

impl LaneGroupInput {
    pub fn try_new(params: LaneGroupParams) -> Result<Self> {
        let mut v = Violations::new();

        v.at_least("volume", params.volume, 0.0);
        if !(1..=8).contains(&params.num_lanes) {
            v.push("num_lanes", params.num_lanes, "must be an integer between 1 and 8");
        }
        v.greater_than("base_saturation_flow", params.base_saturation_flow, 0.0);
        v.above_up_to("lane_width", params.lane_width, 8.0, 24.0);
        v.within("heavy_vehicle_pct", params.heavy_vehicle_pct, 0.0, 100.0);
        v.within("grade_pct", params.grade_pct, -10.0, 10.0);
        v.at_least(
            "parking_maneuvers_per_hour",
            params.parking_maneuvers_per_hour,
            0.0,
        );
        v.at_least("bus_stops_per_hour", params.bus_stops_per_hour, 0.0);
        v.within("left_turn_pct", params.left_turn_pct, 0.0, 100.0);
        v.within("right_turn_pct", params.right_turn_pct, 0.0, 100.0);

        let area_type = match params.area_type.parse::<AreaType>() {
            Ok(area) => Some(area),
            Err(reason) => {
                v.push("area_type", &params.area_type, reason);
                None
            }
        };

        let timing = params.signal_timing;
        v.above_up_to("signal_timing.cycle_length", timing.cycle_length, 0.0, 300.0);
        v.greater_than("signal_timing.effective_green", timing.effective_green, 0.0);
        if timing.effective_green.is_finite()
            && timing.cycle_length.is_finite()
            && timing.effective_green > timing.cycle_length
        {
            v.push(
                "signal_timing.effective_green",
                timing.effective_green,
                format!("cannot exceed cycle_length ({})", timing.cycle_length),
            );
        }

        v.above_up_to(
            "analysis_period_hours",
            params.analysis_period_hours,
            0.0,
            1.0,
        );
        v.within(
            "upstream_filtering_factor",
            params.upstream_filtering_factor,
            0.0,
            1.0,
        );

        v.finish()?;

        Ok(Self {
            volume: params.volume,
            num_lanes: params.num_lanes as u32,
            movement_type: params.movement_type,
            base_saturation_flow: params.base_saturation_flow,
            lane_width: params.lane_width,
            heavy_vehicle_pct: params.heavy_vehicle_pct,
            grade_pct: params.grade_pct,
            parking_adjacent: params.parking_adjacent,
            parking_maneuvers_per_hour: params.parking_maneuvers_per_hour,
            bus_stops_per_hour: params.bus_stops_per_hour,
            area_type: area_type.unwrap_or_default(),
            left_turn_pct: params.left_turn_pct,
            right_turn_pct: params.right_turn_pct,
            signal_timing: timing,
            analysis_period_hours: params.analysis_period_hours,
            upstream_filtering_factor: params.upstream_filtering_factor,
        })
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn num_lanes(&self) -> u32 {
        self.num_lanes
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn base_saturation_flow(&self) -> f64 {
        self.base_saturation_flow
    }

    pub fn lane_width(&self) -> f64 {
        self.lane_width
    }

    pub fn heavy_vehicle_pct(&self) -> f64 {
        self.heavy_vehicle_pct
    }

    pub fn grade_pct(&self) -> f64 {
        self.grade_pct
    }

    pub fn parking_adjacent(&self) -> bool {
        self.parking_adjacent
    }

    pub fn parking_maneuvers_per_hour(&self) -> f64 {
        self.parking_maneuvers_per_hour
    }

    pub fn bus_stops_per_hour(&self) -> f64 {
        self.bus_stops_per_hour
    }

    pub fn area_type(&self) -> AreaType {
        self.area_type
    }

    pub fn left_turn_pct(&self) -> f64 {
        self.left_turn_pct
    }

    pub fn right_turn_pct(&self) -> f64 {
        self.right_turn_pct
    }

    pub fn signal_timing(&self) -> &SignalTiming {
        &self.signal_timing
    }

    pub fn analysis_period_hours(&self) -> f64 {
        self.analysis_period_hours
    }

    pub fn upstream_filtering_factor(&self) -> f64 {
        self.upstream_filtering_factor
    }

    /// 輸入內容雜湊（含引擎版本），作為快取與稽核的鍵值
    pub fn content_hash(&self) -> Result<String> {
        let mut canonical = serde_json::to_vec(self)?;
        canonical.extend_from_slice(ENGINE_VERSION.as_bytes());
        Ok(format!("{:016x}", xxhash_rust::xxh3::xxh3_64(&canonical)))
    }
}

impl TryFrom<LaneGroupParams> for LaneGroupInput {
    type Error = LosError;

    fn try_from(params: LaneGroupParams) -> Result<Self> {
        LaneGroupInput::try_new(params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationFlowResult {
    pub base_saturation_flow: f64,
    pub adjusted_saturation_flow: f64,
    pub total_saturation_flow: f64,
    pub f_w: f64,
    pub f_hv: f64,
    pub f_g: f64,
    pub f_p: f64,
    pub f_bb: f64,
    pub f_a: f64,
    pub f_lt: f64,
    pub f_rt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneGroupResult {
    pub engine_version: String,
    pub volume: f64,
    pub num_lanes: u32,
    pub saturation_flow: SaturationFlowResult,
    pub capacity: f64,
    pub vc_ratio: f64,
    pub uniform_delay: f64,
    pub incremental_delay: f64,
    pub control_delay: f64,
    pub los: LevelOfService,
    pub is_oversaturated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violated_fields(err: LosError) -> Vec<String> {
        match err {
            LosError::InvalidInput { violations } => {
                violations.into_iter().map(|v| v.field).collect()
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_applied_on_deserialize() {
        let json = r#"{
            "volume": 800,
            "num_lanes": 2,
            "signal_timing": {"cycle_length": 90, "effective_green": 40}
        }"#;
        let input: LaneGroupInput = serde_json::from_str(json).unwrap();

        assert_eq!(input.base_saturation_flow(), 1900.0);
        assert_eq!(input.lane_width(), 12.0);
        assert_eq!(input.area_type(), AreaType::Other);
        assert_eq!(input.movement_type(), MovementType::Through);
        assert_eq!(input.signal_timing().control_type, SignalControlType::Pretimed);
        assert_eq!(input.analysis_period_hours(), 0.25);
        assert_eq!(input.upstream_filtering_factor(), 1.0);
    }

    #[test]
    fn test_green_exceeding_cycle_rejected() {
        let err = LaneGroupInput::try_new(LaneGroupParams::new(800.0, 2, 90.0, 100.0)).unwrap_err();
        assert_eq!(violated_fields(err), vec!["signal_timing.effective_green"]);
    }

    #[test]
    fn test_every_violation_reported() {
        let mut params = LaneGroupParams::new(-10.0, 0, 90.0, 40.0);
        params.lane_width = 30.0;
        params.area_type = "rural".to_string();

        let fields = violated_fields(LaneGroupInput::try_new(params).unwrap_err());
        assert_eq!(fields, vec!["volume", "num_lanes", "lane_width", "area_type"]);
    }

    #[test]
    fn test_lane_count_bounds() {
        assert!(LaneGroupInput::try_new(LaneGroupParams::new(100.0, 9, 90.0, 40.0)).is_err());
        assert!(LaneGroupInput::try_new(LaneGroupParams::new(100.0, 8, 90.0, 40.0)).is_ok());
    }

    #[test]
    fn test_integral_float_lane_count_accepted() {
        let json = r#"{
            "volume": 800,
            "num_lanes": 2.0,
            "signal_timing": {"cycle_length": 90, "effective_green": 40}
        }"#;
        let params: LaneGroupParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.num_lanes, 2);
        assert_eq!(LaneGroupInput::try_new(params).unwrap().num_lanes(), 2);

        let fractional = json.replace("2.0", "2.5");
        let err = serde_json::from_str::<LaneGroupParams>(&fractional).unwrap_err();
        assert!(err.to_string().contains("num_lanes must be an integer"));
    }

    #[test]
    fn test_non_finite_volume_rejected() {
        let err = LaneGroupInput::try_new(LaneGroupParams::new(f64::INFINITY, 2, 90.0, 40.0))
            .unwrap_err();
        assert_eq!(violated_fields(err), vec!["volume"]);
    }

    #[test]
    fn test_area_type_case_insensitive() {
        let mut params = LaneGroupParams::new(500.0, 1, 90.0, 40.0);
        params.area_type = "CBD".to_string();
        let input = LaneGroupInput::try_new(params).unwrap();
        assert_eq!(input.area_type(), AreaType::Cbd);
    }

    #[test]
    fn test_deserialize_routes_through_validation() {
        let json = r#"{
            "volume": 800,
            "num_lanes": 2,
            "signal_timing": {"cycle_length": 90, "effective_green": 95}
        }"#;
        let err = serde_json::from_str::<LaneGroupInput>(json).unwrap_err();
        assert!(err.to_string().contains("effective_green"));
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = LaneGroupInput::try_new(LaneGroupParams::new(800.0, 2, 90.0, 40.0)).unwrap();
        let b = LaneGroupInput::try_new(LaneGroupParams::new(800.0, 2, 90.0, 40.0)).unwrap();
        let c = LaneGroupInput::try_new(LaneGroupParams::new(801.0, 2, 90.0, 40.0)).unwrap();

        let hash = a.content_hash().unwrap();
        assert_eq!(hash.len(), 16);
        assert_eq!(hash, b.content_hash().unwrap());
        assert_ne!(hash, c.content_hash().unwrap());
    }

    #[test]
    fn test_los_parse_and_display() {
        assert_eq!("d".parse::<LevelOfService>().unwrap(), LevelOfService::D);
        assert_eq!(LevelOfService::F.to_string(), "F");
        assert!("G".parse::<LevelOfService>().is_err());
    }
}
