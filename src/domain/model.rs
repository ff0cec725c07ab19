use crate::hcm::{LaneGroupParams, LaneGroupResult};
use crate::report::{AnalysisPeriod, IntersectionResult, ReportNarrative, ScenarioType};
use crate::scenario::{ScenarioChange, ScenarioChangeSet};
use crate::utils::error::{LosError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use crate::volume::{VolumeAnalysisResult, VolumeInput};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// 研究檔中的單一車道群
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyLaneGroup {
    pub name: String,
    /// 報告上顯示的轉向名稱，缺漏時採用 `params.movement_type`
    #[serde(default)]
    pub movement: Option<String>,
    #[serde(default)]
    pub queue_95th: Option<f64>,
    pub params: LaneGroupParams,
}

impl StudyLaneGroup {
    pub fn movement_label(&self) -> String {
        self.movement
            .clone()
            .unwrap_or_else(|| movement_label_of(&self.params))
    }
}

pub(crate) fn movement_label_of(params: &LaneGroupParams) -> String {
    serde_json::to_value(params.movement_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "through".to_string())
}

/// 相對於基準的情境，以變更組描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub name: String,
    #[serde(default = "default_scenario_type")]
    pub scenario_type: ScenarioType,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub changes: Vec<ScenarioChange>,
}

fn default_scenario_type() -> ScenarioType {
    ScenarioType::Build
}

fn default_baseline_name() -> String {
    "Existing".to_string()
}

/// 一份研究：一個路口的車道群、基準情境與其他情境
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub intersection: String,
    #[serde(default)]
    pub analysis_period: AnalysisPeriod,
    #[serde(default = "default_baseline_name")]
    pub baseline_name: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub lane_groups: Vec<StudyLaneGroup>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioDefinition>,
    #[serde(default)]
    pub volumes: Option<VolumeInput>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub project_trips_am: Option<u32>,
    #[serde(default)]
    pub project_trips_pm: Option<u32>,
}

impl StudyDefinition {
    pub fn lane_group(&self, name: &str) -> Option<&StudyLaneGroup> {
        self.lane_groups.iter().find(|lg| lg.name == name)
    }

    /// 情境變更套用的基準文件：以車道群名稱為鍵的參數物件
    pub fn base_document(&self) -> Result<Value> {
        let mut doc = Map::new();
        for lane_group in &self.lane_groups {
            doc.insert(lane_group.name.clone(), serde_json::to_value(&lane_group.params)?);
        }
        Ok(Value::Object(doc))
    }

    /// 以基準為父情境的變更組
    pub fn change_set(&self, scenario: &ScenarioDefinition) -> ScenarioChangeSet {
        ScenarioChangeSet {
            scenario_id: None,
            name: Some(scenario.name.clone()),
            description: scenario.description.clone(),
            changes: scenario.changes.clone(),
            parent_scenario_id: Some(self.baseline_name.clone()),
        }
    }

    /// 基準情境本身沒有變更
    pub fn baseline(&self) -> ScenarioDefinition {
        ScenarioDefinition {
            name: self.baseline_name.clone(),
            scenario_type: ScenarioType::Existing,
            year: self.year,
            description: self.description.clone(),
            changes: Vec::new(),
        }
    }
}

impl Validate for StudyDefinition {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("study.name", &self.name)?;
        validate_non_empty_string("study.intersection", &self.intersection)?;
        validate_non_empty_string("study.baseline_name", &self.baseline_name)?;

        if self.lane_groups.is_empty() {
            return Err(LosError::ConfigValidationError {
                field: "study.lane_groups".to_string(),
                message: "A study needs at least one lane group".to_string(),
            });
        }

        let mut names = HashSet::new();
        for lane_group in &self.lane_groups {
            validate_non_empty_string("lane_groups.name", &lane_group.name)?;
            // 名稱即為變更路徑的第一段
            if lane_group.name.contains('/') {
                return Err(LosError::InvalidConfigValueError {
                    field: "lane_groups.name".to_string(),
                    value: lane_group.name.clone(),
                    reason: "Lane group names cannot contain '/'".to_string(),
                });
            }
            if !names.insert(lane_group.name.as_str()) {
                return Err(LosError::InvalidConfigValueError {
                    field: "lane_groups.name".to_string(),
                    value: lane_group.name.clone(),
                    reason: "Lane group names must be unique".to_string(),
                });
            }
        }

        let mut scenario_names = HashSet::from([self.baseline_name.as_str()]);
        for scenario in &self.scenarios {
            validate_non_empty_string("scenarios.name", &scenario.name)?;
            if !scenario_names.insert(scenario.name.as_str()) {
                return Err(LosError::InvalidConfigValueError {
                    field: "scenarios.name".to_string(),
                    value: scenario.name.clone(),
                    reason: "Scenario names must be unique and differ from the baseline".to_string(),
                });
            }
        }

        if let Some(volumes) = &self.volumes {
            volumes.validate()?;
        }

        Ok(())
    }
}

/// 單一情境中單一車道群的計算結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneGroupOutcome {
    pub scenario: String,
    pub name: String,
    pub movement: String,
    pub input_hash: String,
    pub result: LaneGroupResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub scenario_type: ScenarioType,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub applied_changes: Vec<ScenarioChange>,
    pub lane_groups: Vec<LaneGroupOutcome>,
    pub intersection: IntersectionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyOutcome {
    pub study_name: String,
    pub engine_version: String,
    pub scenarios: Vec<ScenarioOutcome>,
    pub narratives: Vec<ReportNarrative>,
    pub volume_check: Option<VolumeAnalysisResult>,
}

impl StudyOutcome {
    pub fn lane_group_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.lane_groups.len()).sum()
    }

    pub fn narrative_markdown(&self) -> String {
        let mut out = format!("# {}\n\n", self.study_name);
        for narrative in &self.narratives {
            out.push_str(&narrative.to_markdown());
        }
        out
    }
}
