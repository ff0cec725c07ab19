use crate::report::models::{
    IntersectionResult, NarrativeOptions, NarrativeSection, ReportNarrative, ScenarioComparison,
    ScenarioResult,
};
use crate::report::narratives::{
    comparison_paragraph, compliance_statement, executive_summary, intersection_analysis,
    lane_group_details, single_intersection, slug,
};
use crate::utils::error::{LosError, Result};
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

/// 敘述的資料來源
#[derive(Debug, Clone, Copy)]
pub enum NarrativeSubject<'a> {
    Comparison(&'a ScenarioComparison),
    Scenario(&'a ScenarioResult),
    Intersection(&'a IntersectionResult),
}

impl<'a> NarrativeSubject<'a> {
    /// 依優先順序（比較、情境、路口）選出資料來源；全部缺漏時回傳錯誤
    pub fn from_parts(
        comparison: Option<&'a ScenarioComparison>,
        scenario: Option<&'a ScenarioResult>,
        intersection: Option<&'a IntersectionResult>,
    ) -> Result<Self> {
        comparison
            .map(NarrativeSubject::Comparison)
            .or(scenario.map(NarrativeSubject::Scenario))
            .or(intersection.map(NarrativeSubject::Intersection))
            .ok_or_else(|| LosError::Narrative {
                message: "Must provide a comparison, scenario or intersection result".to_string(),
            })
    }

    fn type_name(&self) -> &'static str {
        match self {
            NarrativeSubject::Comparison(_) => "ScenarioComparison",
            NarrativeSubject::Scenario(_) => "ScenarioResult",
            NarrativeSubject::Intersection(_) => "IntersectionResult",
        }
    }
}

pub(crate) fn data_hash<T: Serialize>(data: &T) -> Result<String> {
    let bytes = serde_json::to_vec(data)?;
    let hex = format!("{:016x}", xxh3_64(&bytes));
    Ok(hex[..12].to_string())
}

fn comparison_sections(comparison: &ScenarioComparison, options: &NarrativeOptions) -> Vec<NarrativeSection> {
    let mut sections = vec![executive_summary(comparison)];

    for scenario in [&comparison.baseline, &comparison.proposed] {
        sections.extend(
            scenario
                .intersections
                .iter()
                .map(|i| intersection_analysis(i, &scenario.scenario_name)),
        );
    }

    sections.extend(
        comparison
            .baseline
            .intersections
            .iter()
            .map(|i| comparison_paragraph(comparison, &i.name)),
    );

    if options.include_lane_groups {
        for scenario in [&comparison.baseline, &comparison.proposed] {
            sections.extend(scenario_lane_group_details(scenario));
        }
    }

    sections.push(compliance_statement(&comparison.proposed.intersections, options));
    sections
}

fn has_thresholds(options: &NarrativeOptions) -> bool {
    options.threshold_los.is_some() || options.threshold_vc.is_some_and(|v| v > 0.0)
}

fn scenario_lane_group_details(scenario: &ScenarioResult) -> Vec<NarrativeSection> {
    scenario
        .intersections
        .iter()
        .filter(|i| !i.lane_groups.is_empty())
        .map(|i| {
            lane_group_details(
                i,
                format!("lane_group_details_{}_{}", slug(&i.name), slug(&scenario.scenario_name)),
                format!("{} {} Lane Group Details", i.name, scenario.scenario_name),
            )
        })
        .collect()
}

fn scenario_sections(scenario: &ScenarioResult, options: &NarrativeOptions) -> Vec<NarrativeSection> {
    let year = scenario.year.map(|y| format!(" for year {}", y)).unwrap_or_default();
    let description = scenario
        .description
        .as_ref()
        .map(|d| format!(" {}", d))
        .unwrap_or_default();

    let intro = NarrativeSection::new(
        "introduction",
        "Introduction",
        format!(
            "The following analysis presents traffic operations for {} intersection(s) under {} conditions{}.{}",
            scenario.intersections.len(),
            scenario.scenario_name,
            year,
            description
        ),
    );

    let mut sections: Vec<NarrativeSection> = std::iter::once(intro)
        .chain(scenario.intersections.iter().map(single_intersection))
        .collect();

    if options.include_lane_groups {
        sections.extend(scenario_lane_group_details(scenario));
    }
    // 只有使用者給了門檻才評估合規
    if has_thresholds(options) {
        sections.push(compliance_statement(&scenario.intersections, options));
    }
    sections
}

fn intersection_sections(intersection: &IntersectionResult, options: &NarrativeOptions) -> Vec<NarrativeSection> {
    let mut sections = vec![single_intersection(intersection)];

    if options.include_lane_groups && !intersection.lane_groups.is_empty() {
        sections.push(lane_group_details(intersection, "lane_group_details", "Lane Group Details"));
    }

    sections
}

/// 產生報告敘述
pub fn generate_narrative(subject: NarrativeSubject<'_>, options: &NarrativeOptions) -> Result<ReportNarrative> {
    let (sections, hash) = match subject {
        NarrativeSubject::Comparison(comparison) => {
            (comparison_sections(comparison, options), data_hash(comparison)?)
        }
        NarrativeSubject::Scenario(scenario) => (scenario_sections(scenario, options), data_hash(scenario)?),
        NarrativeSubject::Intersection(intersection) => {
            (intersection_sections(intersection, options), data_hash(intersection)?)
        }
    };

    tracing::debug!(
        "Generated {} narrative section(s) from {}",
        sections.len(),
        subject.type_name()
    );

    Ok(ReportNarrative {
        sections,
        generated_from: subject.type_name().to_string(),
        data_hash: Some(hash),
    })
}

pub fn summary_table_caption(scenario: &ScenarioResult, period: &str) -> String {
    let year = scenario.year.map(|y| format!(" ({})", y)).unwrap_or_default();
    format!(
        "Table X: {}{} Intersection Level of Service Summary - {}",
        scenario.scenario_name, year, period
    )
}

pub fn queue_table_caption(intersection_name: &str, scenario_name: &str) -> String {
    format!(
        "Table X: {} Queue Analysis - {} Conditions",
        intersection_name, scenario_name
    )
}
