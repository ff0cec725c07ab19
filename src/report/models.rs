use crate::hcm::{classify_los, LaneGroupResult, LevelOfService};
use crate::utils::error::{LosError, Result};
use crate::utils::numeric::round_to;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnalysisPeriod {
    #[serde(rename = "AM Peak")]
    AmPeak,
    #[default]
    #[serde(rename = "PM Peak")]
    PmPeak,
    Weekday,
    Saturday,
    Sunday,
}

impl AnalysisPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPeriod::AmPeak => "AM Peak",
            AnalysisPeriod::PmPeak => "PM Peak",
            AnalysisPeriod::Weekday => "Weekday",
            AnalysisPeriod::Saturday => "Saturday",
            AnalysisPeriod::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for AnalysisPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScenarioType {
    #[default]
    Existing,
    Background,
    Build,
    Cumulative,
    Mitigation,
}

/// 報告用的車道群摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneGroupSummary {
    pub name: String,
    pub movement: String,
    pub volume: f64,
    pub capacity: f64,
    pub vc_ratio: f64,
    pub delay: f64,
    pub los: LevelOfService,
    #[serde(default)]
    pub queue_50th: Option<f64>,
    #[serde(default)]
    pub queue_95th: Option<f64>,
}

impl LaneGroupSummary {
    pub fn from_result(name: impl Into<String>, movement: impl Into<String>, result: &LaneGroupResult) -> Self {
        Self {
            name: name.into(),
            movement: movement.into(),
            volume: result.volume,
            capacity: result.capacity,
            vc_ratio: result.vc_ratio,
            delay: result.control_delay,
            los: result.los,
            queue_50th: None,
            queue_95th: None,
        }
    }
}

fn default_control_type() -> String {
    "Signalized".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionResult {
    pub name: String,
    #[serde(default = "default_control_type")]
    pub control_type: String,
    pub analysis_period: AnalysisPeriod,
    pub overall_los: LevelOfService,
    pub overall_delay: f64,
    #[serde(default)]
    pub overall_vc: Option<f64>,
    #[serde(default)]
    pub worst_approach_los: Option<LevelOfService>,
    #[serde(default)]
    pub worst_approach_name: Option<String>,
    #[serde(default)]
    pub worst_movement_los: Option<LevelOfService>,
    #[serde(default)]
    pub worst_movement_name: Option<String>,
    #[serde(default)]
    pub lane_groups: Vec<LaneGroupSummary>,
    #[serde(default)]
    pub cycle_length: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl IntersectionResult {
    /// 由車道群彙總路口結果。
    ///
    /// 整體延滯為以流量加權的平均（總流量為 0 時取算術平均），
    /// 整體 v/c 取最大值，最差轉向為延滯最高的車道群。
    pub fn from_lane_groups(
        name: impl Into<String>,
        analysis_period: AnalysisPeriod,
        lane_groups: Vec<LaneGroupSummary>,
        cycle_length: Option<f64>,
    ) -> Result<Self> {
        let name = name.into();
        if lane_groups.is_empty() {
            return Err(LosError::Narrative {
                message: format!("intersection '{}' has no lane groups to summarize", name),
            });
        }

        let total_volume: f64 = lane_groups.iter().map(|lg| lg.volume).sum();
        let overall_delay = if total_volume > 0.0 {
            lane_groups.iter().map(|lg| lg.delay * lg.volume).sum::<f64>() / total_volume
        } else {
            lane_groups.iter().map(|lg| lg.delay).sum::<f64>() / lane_groups.len() as f64
        };
        let overall_delay = round_to(overall_delay, 2);

        let overall_vc = lane_groups.iter().map(|lg| lg.vc_ratio).fold(0.0, f64::max);
        let worst = lane_groups
            .iter()
            .max_by(|a, b| a.delay.total_cmp(&b.delay));

        Ok(Self {
            name,
            control_type: default_control_type(),
            analysis_period,
            overall_los: classify_los(overall_delay)?,
            overall_delay,
            overall_vc: Some(overall_vc),
            worst_approach_los: None,
            worst_approach_name: None,
            worst_movement_los: worst.map(|lg| lg.los),
            worst_movement_name: worst.map(|lg| lg.name.clone()),
            lane_groups,
            cycle_length,
            notes: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_type: ScenarioType,
    pub scenario_name: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub intersections: Vec<IntersectionResult>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub baseline: ScenarioResult,
    pub proposed: ScenarioResult,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub project_trips_am: Option<u32>,
    #[serde(default)]
    pub project_trips_pm: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSection {
    pub section_id: String,
    pub title: String,
    pub content: String,
}

impl NarrativeSection {
    pub fn new(section_id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportNarrative {
    pub sections: Vec<NarrativeSection>,
    pub generated_from: String,
    pub data_hash: Option<String>,
}

impl ReportNarrative {
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("## {}\n\n{}\n\n", section.title, section.content));
        }
        if let Some(hash) = &self.data_hash {
            out.push_str(&format!("_Generated from {} (data hash {})_\n", self.generated_from, hash));
        }
        out
    }
}

/// 合規門檻只使用使用者提供的值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeOptions {
    #[serde(default)]
    pub threshold_los: Option<LevelOfService>,
    #[serde(default)]
    pub threshold_vc: Option<f64>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub include_lane_groups: bool,
}
