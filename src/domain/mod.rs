// 領域層：研究模型與對外介面（ports）

pub mod model;
pub mod ports;

pub use model::{
    LaneGroupOutcome, ScenarioDefinition, ScenarioOutcome, StudyDefinition, StudyLaneGroup,
    StudyOutcome,
};
pub use ports::{ConfigProvider, Pipeline, Storage};
