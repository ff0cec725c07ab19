//! 控制延滯 d = d1 + d2。不含 d3（初始等候車隊延滯），僅做單一分析時段。

use crate::hcm::models::SignalControlType;
use crate::utils::error::{LosError, Result};
use crate::utils::numeric::round_to;

/// d1 分母下限
const UNIFORM_DELAY_DENOMINATOR_FLOOR: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlDelay {
    pub uniform: f64,
    pub incremental: f64,
    pub total: f64,
}

/// d1 = 0.5 C (1 - g/C)^2 / (1 - min(1, X) g/C)
pub fn compute_uniform_delay(effective_green: f64, cycle_length: f64, vc_ratio: f64) -> Result<f64> {
    if !(cycle_length > 0.0) {
        return Err(LosError::domain("cycle_length", cycle_length, "must be positive"));
    }

    let g_over_c = effective_green / cycle_length;
    let x_eff = vc_ratio.min(1.0);

    let numerator = 0.5 * cycle_length * (1.0 - g_over_c).powi(2);
    let mut denominator = 1.0 - x_eff * g_over_c;
    if denominator <= UNIFORM_DELAY_DENOMINATOR_FLOOR {
        denominator = UNIFORM_DELAY_DENOMINATOR_FLOOR;
    }

    Ok(round_to(numerator / denominator, 2))
}

pub fn incremental_delay_factor(control_type: SignalControlType) -> f64 {
    match control_type {
        SignalControlType::ActuatedCoordinated => 0.45,
        SignalControlType::Pretimed | SignalControlType::ActuatedUncoordinated => 0.50,
    }
}

/// d2 = 900 T [(X-1) + sqrt((X-1)^2 + 8kIX/(cT))]，下限 0
pub fn compute_incremental_delay(
    vc_ratio: f64,
    capacity: f64,
    analysis_period_hours: f64,
    control_type: SignalControlType,
    upstream_filtering_factor: f64,
) -> Result<f64> {
    if !(capacity > 0.0) {
        return Err(LosError::domain("capacity", capacity, "must be positive"));
    }
    if !(analysis_period_hours > 0.0) {
        return Err(LosError::domain(
            "analysis_period_hours",
            analysis_period_hours,
            "must be positive",
        ));
    }

    let x = vc_ratio;
    let t = analysis_period_hours;
    let k = incremental_delay_factor(control_type);
    let i = upstream_filtering_factor;

    let overflow = x - 1.0;
    let random = 8.0 * k * i * x / (capacity * t);
    let d2 = 900.0 * t * (overflow + (overflow.powi(2) + random).sqrt());

    Ok(round_to(d2.max(0.0), 2))
}

pub fn compute_control_delay(
    effective_green: f64,
    cycle_length: f64,
    vc_ratio: f64,
    capacity: f64,
    analysis_period_hours: f64,
    control_type: SignalControlType,
    upstream_filtering_factor: f64,
) -> Result<ControlDelay> {
    let uniform = compute_uniform_delay(effective_green, cycle_length, vc_ratio)?;
    let incremental = compute_incremental_delay(
        vc_ratio,
        capacity,
        analysis_period_hours,
        control_type,
        upstream_filtering_factor,
    )?;

    Ok(ControlDelay {
        uniform,
        incremental,
        total: round_to(uniform + incremental, 2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_delay() {
        assert_eq!(compute_uniform_delay(40.0, 90.0, 0.4737).unwrap(), 17.59);
        assert_eq!(compute_uniform_delay(40.0, 90.0, 0.0).unwrap(), 13.89);
        // X > 1 uses X = 1
        assert_eq!(
            compute_uniform_delay(40.0, 90.0, 1.7763).unwrap(),
            compute_uniform_delay(40.0, 90.0, 1.0).unwrap()
        );
        assert_eq!(compute_uniform_delay(90.0, 90.0, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_uniform_delay_rejects_zero_cycle() {
        assert!(matches!(
            compute_uniform_delay(40.0, 0.0, 0.5),
            Err(LosError::Domain { parameter: "cycle_length", .. })
        ));
    }

    #[test]
    fn test_incremental_delay_factor() {
        assert_eq!(incremental_delay_factor(SignalControlType::Pretimed), 0.5);
        assert_eq!(incremental_delay_factor(SignalControlType::ActuatedUncoordinated), 0.5);
        assert_eq!(incremental_delay_factor(SignalControlType::ActuatedCoordinated), 0.45);
    }

    #[test]
    fn test_incremental_delay_values() {
        let d2 = compute_incremental_delay(0.4737, 1688.9, 0.25, SignalControlType::Pretimed, 1.0)
            .unwrap();
        assert!((d2 - 0.96).abs() < 0.011);

        let zero = compute_incremental_delay(0.0, 1688.9, 0.25, SignalControlType::Pretimed, 1.0)
            .unwrap();
        assert_eq!(zero, 0.0);

        let coordinated =
            compute_incremental_delay(0.4737, 1688.9, 0.25, SignalControlType::ActuatedCoordinated, 1.0)
                .unwrap();
        assert!(coordinated < d2);
    }

    #[test]
    fn test_incremental_delay_grows_with_oversaturation() {
        let at_capacity =
            compute_incremental_delay(1.0, 1688.9, 0.25, SignalControlType::Pretimed, 1.0).unwrap();
        let over =
            compute_incremental_delay(1.5, 1688.9, 0.25, SignalControlType::Pretimed, 1.0).unwrap();
        let longer =
            compute_incremental_delay(1.5, 1688.9, 1.0, SignalControlType::Pretimed, 1.0).unwrap();
        assert!(over > at_capacity);
        assert!(longer > over);
    }

    #[test]
    fn test_incremental_delay_domain_errors() {
        assert!(compute_incremental_delay(0.5, 0.0, 0.25, SignalControlType::Pretimed, 1.0).is_err());
        assert!(compute_incremental_delay(0.5, 1000.0, 0.0, SignalControlType::Pretimed, 1.0).is_err());
    }

    #[test]
    fn test_control_delay_sums_components() {
        let delay = compute_control_delay(40.0, 90.0, 0.4737, 1688.9, 0.25, SignalControlType::Pretimed, 1.0)
            .unwrap();
        assert_eq!(delay.uniform, 17.59);
        assert!((delay.total - (delay.uniform + delay.incremental)).abs() < 1e-9);
    }
}
