pub mod config;
pub mod core;
pub mod domain;
pub mod hcm;
pub mod report;
pub mod scenario;
pub mod utils;
pub mod volume;

pub use config::{cli::LocalStorage, toml_config::StudyConfig};

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use core::{engine::AnalysisEngine, pipeline::StudyPipeline};
pub use hcm::{compute_lane_group, LaneGroupInput, LaneGroupParams, LaneGroupResult, LevelOfService};
pub use utils::error::{LosError, Result};
