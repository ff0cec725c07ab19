use crate::hcm::capacity::{compute_capacity, compute_vc_ratio};
use crate::hcm::delay::compute_control_delay;
use crate::hcm::los::classify_los;
use crate::hcm::models::{LaneGroupInput, LaneGroupResult};
use crate::hcm::saturation_flow::compute_saturation_flow;
use crate::hcm::ENGINE_VERSION;
use crate::utils::error::Result;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub engine_version: &'static str,
    pub description: &'static str,
}

pub fn engine_info() -> EngineInfo {
    EngineInfo {
        engine_version: ENGINE_VERSION,
        description: "HCM 6th Edition Signalized Intersection Engine",
    }
}

/// 單一車道群完整計算：飽和流率 → 容量 → v/c → 控制延滯 → 服務水準
pub fn compute_lane_group(input: &LaneGroupInput) -> Result<LaneGroupResult> {
    let timing = input.signal_timing();

    let saturation_flow = compute_saturation_flow(input);
    let capacity = compute_capacity(
        saturation_flow.total_saturation_flow,
        timing.effective_green,
        timing.cycle_length,
    )?;
    let vc_ratio = compute_vc_ratio(input.volume(), capacity)?;
    let delay = compute_control_delay(
        timing.effective_green,
        timing.cycle_length,
        vc_ratio,
        capacity,
        input.analysis_period_hours(),
        timing.control_type,
        input.upstream_filtering_factor(),
    )?;
    let los = classify_los(delay.total)?;

    tracing::debug!(
        volume = input.volume(),
        capacity,
        vc_ratio,
        control_delay = delay.total,
        los = %los,
        "lane group computed"
    );

    Ok(LaneGroupResult {
        engine_version: ENGINE_VERSION.to_string(),
        volume: input.volume(),
        num_lanes: input.num_lanes(),
        saturation_flow,
        capacity,
        vc_ratio,
        uniform_delay: delay.uniform,
        incremental_delay: delay.incremental,
        control_delay: delay.total,
        los,
        is_oversaturated: vc_ratio > 1.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcm::models::{LaneGroupParams, LevelOfService, MovementType, SignalControlType};

    fn input(volume: f64, lanes: i64, cycle: f64, green: f64) -> LaneGroupInput {
        LaneGroupInput::try_new(LaneGroupParams::new(volume, lanes, cycle, green)).unwrap()
    }

    #[test]
    fn test_undersaturated_reference_values() {
        let result = compute_lane_group(&input(800.0, 2, 90.0, 40.0)).unwrap();

        assert_eq!(result.engine_version, "HCM6-SIG-0.1.0");
        assert_eq!(result.capacity, 1688.9);
        assert_eq!(result.vc_ratio, 0.4737);
        assert_eq!(result.uniform_delay, 17.59);
        assert!((result.incremental_delay - 0.96).abs() < 0.011);
        assert_eq!(result.los, LevelOfService::B);
        assert!(!result.is_oversaturated);
    }

    #[test]
    fn test_zero_volume_still_has_red_time_delay() {
        let result = compute_lane_group(&input(0.0, 2, 90.0, 40.0)).unwrap();

        assert_eq!(result.vc_ratio, 0.0);
        assert_eq!(result.incremental_delay, 0.0);
        assert_eq!(result.control_delay, 13.89);
        assert!(matches!(result.los, LevelOfService::A | LevelOfService::B));
    }

    #[test]
    fn test_oversaturated_flag() {
        let result = compute_lane_group(&input(3000.0, 2, 90.0, 40.0)).unwrap();
        assert!(result.vc_ratio > 1.5);
        assert!(result.is_oversaturated);
        assert_eq!(result.los, LevelOfService::F);
    }

    #[test]
    fn test_exclusive_left_lane() {
        let mut params = LaneGroupParams::new(300.0, 1, 90.0, 20.0);
        params.movement_type = MovementType::Left;
        params.left_turn_pct = 100.0;
        let result = compute_lane_group(&LaneGroupInput::try_new(params).unwrap()).unwrap();

        assert_eq!(result.saturation_flow.f_lt, 0.95);
        assert_eq!(result.saturation_flow.total_saturation_flow, 1805.0);
        assert_eq!(result.capacity, 401.1);
    }

    #[test]
    fn test_coordinated_control_lowers_incremental_delay() {
        let mut params = LaneGroupParams::new(800.0, 2, 90.0, 40.0);
        params.signal_timing.control_type = SignalControlType::ActuatedCoordinated;
        let coordinated = compute_lane_group(&LaneGroupInput::try_new(params).unwrap()).unwrap();
        let pretimed = compute_lane_group(&input(800.0, 2, 90.0, 40.0)).unwrap();

        assert!(coordinated.incremental_delay < pretimed.incremental_delay);
        assert_eq!(coordinated.uniform_delay, pretimed.uniform_delay);
    }

    #[test]
    fn test_engine_info() {
        let info = engine_info();
        assert_eq!(info.engine_version, ENGINE_VERSION);
        assert!(info.description.contains("Signalized"));
    }
}
