//! 飽和流率計算：基本流率乘上八個獨立調整係數。

use crate::hcm::models::{AreaType, LaneGroupInput, MovementType, SaturationFlowResult};
use crate::utils::numeric::round_to;

/// 大型車小客車當量
const HEAVY_VEHICLE_PCE: f64 = 2.0;

pub fn lane_width_factor(lane_width: f64) -> f64 {
    (1.0 + (lane_width - 12.0) / 30.0).clamp(0.87, 1.07)
}

pub fn heavy_vehicle_factor(heavy_vehicle_pct: f64) -> f64 {
    100.0 / (100.0 + heavy_vehicle_pct * (HEAVY_VEHICLE_PCE - 1.0))
}

/// 上坡為正，降低飽和流率
pub fn grade_factor(grade_pct: f64) -> f64 {
    1.0 - grade_pct / 200.0
}

pub fn parking_factor(parking_adjacent: bool, maneuvers_per_hour: f64, num_lanes: u32) -> f64 {
    if !parking_adjacent || maneuvers_per_hour == 0.0 {
        return 1.0;
    }
    let n = f64::from(num_lanes);
    ((n - 0.1 - 18.0 * maneuvers_per_hour / 3600.0) / n).clamp(0.05, 1.0)
}

pub fn bus_blockage_factor(bus_stops_per_hour: f64, num_lanes: u32) -> f64 {
    if bus_stops_per_hour == 0.0 {
        return 1.0;
    }
    let n = f64::from(num_lanes);
    ((n - 14.4 * bus_stops_per_hour / 3600.0) / n).clamp(0.05, 1.0)
}

pub fn area_type_factor(area_type: AreaType) -> f64 {
    match area_type {
        AreaType::Cbd => 0.90,
        AreaType::Other => 1.0,
    }
}

pub fn left_turn_factor(movement_type: MovementType, left_turn_pct: f64) -> f64 {
    match movement_type {
        MovementType::Left => 0.95,
        MovementType::ThroughLeft | MovementType::All => {
            1.0 / (1.0 + 0.05 * (left_turn_pct / 100.0))
        }
        _ => 1.0,
    }
}

pub fn right_turn_factor(movement_type: MovementType, right_turn_pct: f64) -> f64 {
    match movement_type {
        MovementType::Right => 0.85,
        MovementType::ThroughRight | MovementType::LeftRight | MovementType::All => {
            (1.0 - 0.15 * (right_turn_pct / 100.0)).max(0.05)
        }
        _ => 1.0,
    }
}

type FactorFn = fn(&LaneGroupInput) -> f64;

/// 依 f_w, f_hv, f_g, f_p, f_bb, f_a, f_lt, f_rt 的順序
const FACTORS: [FactorFn; 8] = [
    |i| lane_width_factor(i.lane_width()),
    |i| heavy_vehicle_factor(i.heavy_vehicle_pct()),
    |i| grade_factor(i.grade_pct()),
    |i| parking_factor(i.parking_adjacent(), i.parking_maneuvers_per_hour(), i.num_lanes()),
    |i| bus_blockage_factor(i.bus_stops_per_hour(), i.num_lanes()),
    |i| area_type_factor(i.area_type()),
    |i| left_turn_factor(i.movement_type(), i.left_turn_pct()),
    |i| right_turn_factor(i.movement_type(), i.right_turn_pct()),
];

pub fn compute_saturation_flow(input: &LaneGroupInput) -> SaturationFlowResult {
    let factors = FACTORS.map(|factor| factor(input));
    let s0 = input.base_saturation_flow();

    // 乘積使用未四捨五入的係數
    let s_adjusted = factors.iter().fold(s0, |acc, f| acc * f);
    let s_total = s_adjusted * f64::from(input.num_lanes());

    let [f_w, f_hv, f_g, f_p, f_bb, f_a, f_lt, f_rt] = factors.map(|f| round_to(f, 4));

    SaturationFlowResult {
        base_saturation_flow: s0,
        adjusted_saturation_flow: round_to(s_adjusted, 1),
        total_saturation_flow: round_to(s_total, 1),
        f_w,
        f_hv,
        f_g,
        f_p,
        f_bb,
        f_a,
        f_lt,
        f_rt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcm::models::LaneGroupParams;

    #[test]
    fn test_lane_width_factor_clamped() {
        assert_eq!(lane_width_factor(12.0), 1.0);
        assert!((lane_width_factor(10.0) - 0.9333).abs() < 1e-4);
        assert_eq!(lane_width_factor(9.0), 0.9);
        assert_eq!(lane_width_factor(24.0), 1.07);
        assert_eq!(lane_width_factor(8.01), 0.87);
    }

    #[test]
    fn test_heavy_vehicle_factor() {
        assert_eq!(heavy_vehicle_factor(0.0), 1.0);
        assert!((heavy_vehicle_factor(10.0) - 0.9091).abs() < 1e-4);
    }

    #[test]
    fn test_grade_factor_direction() {
        assert_eq!(grade_factor(0.0), 1.0);
        assert!(grade_factor(4.0) < 1.0);
        assert!(grade_factor(-4.0) > 1.0);
    }

    #[test]
    fn test_parking_factor_only_when_adjacent_with_maneuvers() {
        assert_eq!(parking_factor(false, 20.0, 2), 1.0);
        assert_eq!(parking_factor(true, 0.0, 2), 1.0);
        assert!((parking_factor(true, 20.0, 2) - 0.9).abs() < 1e-9);
        assert_eq!(parking_factor(true, 10_000.0, 1), 0.05);
    }

    #[test]
    fn test_bus_blockage_factor() {
        assert_eq!(bus_blockage_factor(0.0, 2), 1.0);
        assert!((bus_blockage_factor(25.0, 1) - 0.9).abs() < 1e-9);
        assert_eq!(bus_blockage_factor(1_000.0, 1), 0.05);
    }

    #[test]
    fn test_turn_factors() {
        assert_eq!(left_turn_factor(MovementType::Left, 100.0), 0.95);
        assert_eq!(left_turn_factor(MovementType::Through, 30.0), 1.0);
        assert!((left_turn_factor(MovementType::ThroughLeft, 100.0) - 1.0 / 1.05).abs() < 1e-12);

        assert_eq!(right_turn_factor(MovementType::Right, 100.0), 0.85);
        assert!((right_turn_factor(MovementType::All, 100.0) - 0.85).abs() < 1e-12);
        assert_eq!(right_turn_factor(MovementType::ThroughLeft, 50.0), 1.0);
    }

    #[test]
    fn test_base_conditions_give_base_flow() {
        let input = LaneGroupInput::try_new(LaneGroupParams::new(800.0, 2, 90.0, 40.0)).unwrap();
        let result = compute_saturation_flow(&input);

        assert_eq!(result.adjusted_saturation_flow, 1900.0);
        assert_eq!(result.total_saturation_flow, 3800.0);
        assert_eq!(result.f_w, 1.0);
        assert_eq!(result.f_rt, 1.0);
    }

    #[test]
    fn test_cbd_reduces_flow() {
        let mut params = LaneGroupParams::new(800.0, 1, 90.0, 40.0);
        params.area_type = "cbd".to_string();
        let input = LaneGroupInput::try_new(params).unwrap();
        let result = compute_saturation_flow(&input);

        assert_eq!(result.f_a, 0.9);
        assert_eq!(result.adjusted_saturation_flow, 1710.0);
    }
}
