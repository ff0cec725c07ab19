//! HCM 第六版號誌化路口引擎。
//!
//! 純函式管線，無狀態、無 I/O，可由呼叫端任意平行執行。

pub mod capacity;
pub mod delay;
pub mod engine;
pub mod los;
pub mod models;
pub mod saturation_flow;

/// 結果中嵌入的公式版本
pub const ENGINE_VERSION: &str = "HCM6-SIG-0.1.0";

pub use engine::{compute_lane_group, engine_info, EngineInfo};
pub use los::classify_los;
pub use models::{
    AreaType, LaneGroupInput, LaneGroupParams, LaneGroupResult, LevelOfService, MovementType,
    SaturationFlowResult, SignalControlType, SignalTiming,
};
