use crate::hcm::models::LevelOfService;
use crate::utils::error::{LosError, Result};

/// 各等級控制延滯上限（秒，含）；超過 E 即為 F
const LOS_THRESHOLDS: [(LevelOfService, f64); 5] = [
    (LevelOfService::A, 10.0),
    (LevelOfService::B, 20.0),
    (LevelOfService::C, 35.0),
    (LevelOfService::D, 55.0),
    (LevelOfService::E, 80.0),
];

pub fn classify_los(control_delay: f64) -> Result<LevelOfService> {
    if !(control_delay >= 0.0) {
        return Err(LosError::domain("control_delay", control_delay, "cannot be negative"));
    }

    Ok(LOS_THRESHOLDS
        .iter()
        .find(|(_, upper)| control_delay <= *upper)
        .map(|(los, _)| *los)
        .unwrap_or(LevelOfService::F))
}

impl LevelOfService {
    pub fn description(&self) -> &'static str {
        match self {
            LevelOfService::A => "Free-flow operations",
            LevelOfService::B => "Stable flow with slight delays",
            LevelOfService::C => "Stable flow with acceptable delays",
            LevelOfService::D => "Approaching unstable flow",
            LevelOfService::E => "Unstable flow, at capacity",
            LevelOfService::F => "Oversaturated, forced flow",
        }
    }

    /// 等級上限延滯，F 無上限
    pub fn max_delay(&self) -> Option<f64> {
        LOS_THRESHOLDS
            .iter()
            .find(|(los, _)| los == self)
            .map(|(_, upper)| *upper)
    }
}
