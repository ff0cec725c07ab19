use crate::utils::error::{LosError, Result};
use crate::utils::numeric::round_to;

/// c = s * (g / C)，四捨五入至 0.1 veh/h
pub fn compute_capacity(saturation_flow: f64, effective_green: f64, cycle_length: f64) -> Result<f64> {
    if !(cycle_length > 0.0) {
        return Err(LosError::domain("cycle_length", cycle_length, "must be positive"));
    }
    if !(effective_green >= 0.0) {
        return Err(LosError::domain("effective_green", effective_green, "cannot be negative"));
    }
    if effective_green > cycle_length {
        return Err(LosError::domain(
            "effective_green",
            effective_green,
            "cannot exceed cycle_length",
        ));
    }
    if !(saturation_flow >= 0.0) {
        return Err(LosError::domain("saturation_flow", saturation_flow, "cannot be negative"));
    }

    Ok(round_to(saturation_flow * (effective_green / cycle_length), 1))
}

/// X = v / c，不設上限
pub fn compute_vc_ratio(volume: f64, capacity: f64) -> Result<f64> {
    if !(capacity > 0.0) {
        return Err(LosError::domain("capacity", capacity, "must be positive"));
    }
    if !(volume >= 0.0) {
        return Err(LosError::domain("volume", volume, "cannot be negative"));
    }

    Ok(round_to(volume / capacity, 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_basic() {
        assert_eq!(compute_capacity(3800.0, 40.0, 90.0).unwrap(), 1688.9);
        assert_eq!(compute_capacity(3800.0, 90.0, 90.0).unwrap(), 3800.0);
        assert_eq!(compute_capacity(3800.0, 0.0, 90.0).unwrap(), 0.0);
    }

    #[test]
    fn test_capacity_midpoint_rounds_to_even() {
        // 1805 * 0.25 = 451.25
        assert_eq!(compute_capacity(1805.0, 1.0, 4.0).unwrap(), 451.2);
        assert_eq!(compute_capacity(1815.0, 1.0, 4.0).unwrap(), 453.8);
    }

    #[test]
    fn test_capacity_domain_errors() {
        for (s, g, c, param) in [
            (3800.0, 40.0, 0.0, "cycle_length"),
            (3800.0, -1.0, 90.0, "effective_green"),
            (3800.0, 95.0, 90.0, "effective_green"),
            (-1.0, 40.0, 90.0, "saturation_flow"),
        ] {
            match compute_capacity(s, g, c) {
                Err(LosError::Domain { parameter, .. }) => assert_eq!(parameter, param),
                other => panic!("expected domain error for {param}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_vc_ratio() {
        assert_eq!(compute_vc_ratio(800.0, 1688.9).unwrap(), 0.4737);
        assert_eq!(compute_vc_ratio(0.0, 1688.9).unwrap(), 0.0);
        assert!(compute_vc_ratio(3000.0, 1688.9).unwrap() > 1.5);
    }

    #[test]
    fn test_vc_ratio_domain_errors() {
        assert!(compute_vc_ratio(800.0, 0.0).is_err());
        assert!(compute_vc_ratio(-1.0, 1000.0).is_err());
    }
}
