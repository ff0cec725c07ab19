//! 各段落敘述產生器。內容只引用輸入資料與使用者提供的門檻。

use crate::hcm::LevelOfService;
use crate::report::models::{IntersectionResult, NarrativeOptions, NarrativeSection, ScenarioComparison};

pub(crate) fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

fn delay_phrase(delay: f64) -> String {
    format!("{:.1} seconds of delay", delay)
}

fn format_change(baseline: f64, proposed: f64) -> String {
    let diff = proposed - baseline;
    if diff.abs() < 0.1 {
        "no significant change".to_string()
    } else if diff > 0.0 {
        format!("an increase of {:.1} seconds", diff)
    } else {
        format!("a decrease of {:.1} seconds", diff.abs())
    }
}

fn los_changed(baseline: LevelOfService, proposed: LevelOfService) -> String {
    if baseline == proposed {
        format!("remained at {}", baseline)
    } else {
        format!("changed from {} to {}", baseline, proposed)
    }
}

fn poor_los_count(intersections: &[IntersectionResult]) -> usize {
    intersections
        .iter()
        .filter(|i| matches!(i.overall_los, LevelOfService::E | LevelOfService::F))
        .count()
}

fn find_intersection<'a>(list: &'a [IntersectionResult], name: &str) -> Option<&'a IntersectionResult> {
    list.iter().find(|i| i.name == name)
}

pub fn executive_summary(comparison: &ScenarioComparison) -> NarrativeSection {
    let baseline = &comparison.baseline;
    let proposed = &comparison.proposed;

    let project_desc = comparison
        .project_name
        .as_ref()
        .map(|name| format!("for the {} ", name))
        .unwrap_or_default();

    let trips_desc = match (comparison.project_trips_am, comparison.project_trips_pm) {
        (Some(am), Some(pm)) if am > 0 && pm > 0 => format!(
            "The project is anticipated to generate {} trips during the AM peak hour and {} trips during the PM peak hour. ",
            am, pm
        ),
        _ => String::new(),
    };

    let before = poor_los_count(&baseline.intersections);
    let after = poor_los_count(&proposed.intersections);
    let impact = if after > before {
        format!(
            "The analysis indicates that {} additional intersection(s) would operate at LOS E or F under the {} scenario compared to {} conditions.",
            after - before,
            proposed.scenario_name,
            baseline.scenario_name
        )
    } else if after < before {
        format!(
            "The analysis indicates that {} fewer intersection(s) would operate at LOS E or F under the {} scenario compared to {} conditions.",
            before - after,
            proposed.scenario_name,
            baseline.scenario_name
        )
    } else {
        format!(
            "The analysis indicates that the number of intersections operating at LOS E or F would remain unchanged between the {} and {} scenarios.",
            baseline.scenario_name, proposed.scenario_name
        )
    };

    let content = format!(
        "A traffic analysis was conducted {}evaluating {} intersection(s) under {} and {} conditions. {}{}",
        project_desc,
        baseline.intersections.len(),
        baseline.scenario_name,
        proposed.scenario_name,
        trips_desc,
        impact
    );

    NarrativeSection::new("executive_summary", "Executive Summary", content.trim())
}

pub fn intersection_analysis(intersection: &IntersectionResult, scenario_name: &str) -> NarrativeSection {
    let mut parts = vec![format!(
        "Under {} conditions, the {} intersection ({}) operates at an overall LOS {} with {} during the {} period.",
        scenario_name,
        intersection.name,
        intersection.control_type,
        intersection.overall_los,
        delay_phrase(intersection.overall_delay),
        intersection.analysis_period
    )];

    if let Some(vc) = intersection.overall_vc {
        parts.push(format!("The critical volume-to-capacity ratio is {:.2}.", vc));
    }

    if let (Some(name), Some(los)) = (&intersection.worst_approach_name, intersection.worst_approach_los) {
        parts.push(format!(
            "The {} approach operates at LOS {}, representing the critical approach.",
            name, los
        ));
    }

    if let (Some(name), Some(los)) = (&intersection.worst_movement_name, intersection.worst_movement_los) {
        parts.push(format!("The {} movement operates at LOS {}.", name, los));
    }

    if let Some(cycle) = intersection.cycle_length.filter(|c| *c > 0.0) {
        if intersection.control_type == "Signalized" {
            parts.push(format!("The analysis assumes a {:.0}-second cycle length.", cycle));
        }
    }

    let failing: Vec<&str> = intersection
        .lane_groups
        .iter()
        .filter(|lg| lg.los == LevelOfService::F)
        .map(|lg| lg.name.as_str())
        .collect();
    if !failing.is_empty() {
        parts.push(format!(
            "The following lane group(s) operate at LOS F: {}.",
            failing.join(", ")
        ));
    }

    if let Some(notes) = intersection.notes.as_ref().filter(|n| !n.is_empty()) {
        parts.push(notes.clone());
    }

    NarrativeSection::new(
        format!("intersection_{}_{}", slug(&intersection.name), slug(scenario_name)),
        format!("{} Analysis - {}", intersection.name, scenario_name),
        parts.join(" "),
    )
}

pub fn comparison_paragraph(comparison: &ScenarioComparison, intersection_name: &str) -> NarrativeSection {
    let section_id = format!("comparison_{}", slug(intersection_name));
    let (Some(before), Some(after)) = (
        find_intersection(&comparison.baseline.intersections, intersection_name),
        find_intersection(&comparison.proposed.intersections, intersection_name),
    ) else {
        return NarrativeSection::new(
            section_id,
            format!("{} Comparison", intersection_name),
            format!("Comparison data not available for {}.", intersection_name),
        );
    };

    let mut parts = vec![
        format!(
            "At the {} intersection, the overall LOS {} between the {} and {} scenarios.",
            intersection_name,
            los_changed(before.overall_los, after.overall_los),
            comparison.baseline.scenario_name,
            comparison.proposed.scenario_name
        ),
        format!(
            "The overall intersection delay changed from {:.1} seconds to {:.1} seconds, representing {}.",
            before.overall_delay,
            after.overall_delay,
            format_change(before.overall_delay, after.overall_delay)
        ),
    ];

    if let (Some(vc_before), Some(vc_after)) = (before.overall_vc, after.overall_vc) {
        let diff = vc_after - vc_before;
        if diff.abs() < 0.01 {
            parts.push("The critical v/c ratio remained essentially unchanged.".to_string());
        } else {
            let direction = if diff > 0.0 { "increased" } else { "decreased" };
            parts.push(format!(
                "The critical v/c ratio {} from {:.2} to {:.2}.",
                direction, vc_before, vc_after
            ));
        }
    }

    if let (Some(name), Some(other)) = (&before.worst_movement_name, &after.worst_movement_name) {
        if name == other {
            if let (Some(los_before), Some(los_after)) = (before.worst_movement_los, after.worst_movement_los) {
                if los_before != los_after {
                    parts.push(format!(
                        "The critical movement ({}) LOS changed from {} to {}.",
                        name, los_before, los_after
                    ));
                }
            }
        }
    }

    NarrativeSection::new(
        section_id,
        format!("{} Scenario Comparison", intersection_name),
        parts.join(" "),
    )
}

/// 只依使用者提供的門檻判斷合規，不假設任何地方標準
pub fn compliance_statement(intersections: &[IntersectionResult], options: &NarrativeOptions) -> NarrativeSection {
    let threshold_vc = options.threshold_vc.filter(|v| *v > 0.0);
    let mut parts = Vec::new();

    if options.threshold_los.is_none() && threshold_vc.is_none() {
        parts.push(
            "No specific LOS or v/c thresholds were provided for compliance evaluation. \
             The results presented above should be compared against applicable local \
             agency requirements to determine compliance."
                .to_string(),
        );
    } else {
        parts.push(match &options.jurisdiction {
            Some(jurisdiction) => format!("Based on the provided {} thresholds:", jurisdiction),
            None => "Based on the provided thresholds:".to_string(),
        });

        for intersection in intersections {
            let mut reasons = Vec::new();

            if let Some(threshold) = options.threshold_los {
                if intersection.overall_los > threshold {
                    reasons.push(format!(
                        "LOS {} exceeds threshold of LOS {}",
                        intersection.overall_los, threshold
                    ));
                }
            }

            if let (Some(threshold), Some(vc)) = (threshold_vc, intersection.overall_vc.filter(|v| *v > 0.0)) {
                if vc > threshold {
                    reasons.push(format!(
                        "v/c ratio of {:.2} exceeds threshold of {:.2}",
                        vc, threshold
                    ));
                }
            }

            if reasons.is_empty() {
                parts.push(format!(
                    "The {} intersection meets the specified thresholds.",
                    intersection.name
                ));
            } else {
                parts.push(format!(
                    "The {} intersection does not meet the specified thresholds ({}).",
                    intersection.name,
                    reasons.join("; ")
                ));
            }
        }
    }

    NarrativeSection::new("compliance_statement", "Compliance Evaluation", parts.join(" "))
}

/// 逐一描述車道群的服務水準、延滯與 v/c
pub fn lane_group_details(
    intersection: &IntersectionResult,
    section_id: impl Into<String>,
    title: impl Into<String>,
) -> NarrativeSection {
    let details: Vec<String> = intersection
        .lane_groups
        .iter()
        .map(|lg| {
            let queue = lg
                .queue_95th
                .filter(|q| *q > 0.0)
                .map(|q| format!(" The 95th percentile queue is {:.0} feet.", q))
                .unwrap_or_default();
            format!(
                "The {} ({}) operates at {} with {:.1} seconds of delay and a v/c ratio of {:.2}.{}",
                lg.name, lg.movement, lg.los, lg.delay, lg.vc_ratio, queue
            )
        })
        .collect();

    NarrativeSection::new(section_id, title, details.join(" "))
}

pub fn single_intersection(intersection: &IntersectionResult) -> NarrativeSection {
    let mut parts = vec![
        format!(
            "The {} intersection was analyzed under {} conditions.",
            intersection.name, intersection.analysis_period
        ),
        format!(
            "The {} intersection operates at LOS {} with {}.",
            intersection.control_type.to_lowercase(),
            intersection.overall_los,
            delay_phrase(intersection.overall_delay)
        ),
    ];

    if let Some(vc) = intersection.overall_vc {
        parts.push(format!("The critical v/c ratio is {:.2}.", vc));
    }

    if let (Some(name), Some(los)) = (&intersection.worst_approach_name, intersection.worst_approach_los) {
        parts.push(format!(
            "The {} approach represents the critical approach, operating at LOS {}.",
            name, los
        ));
    }

    let longest = intersection
        .lane_groups
        .iter()
        .filter_map(|lg| lg.queue_95th.filter(|q| *q > 0.0).map(|q| (lg.name.as_str(), q)))
        .fold(None::<(&str, f64)>, |best, item| match best {
            Some(b) if b.1 >= item.1 => Some(b),
            _ => Some(item),
        });
    if let Some((name, queue)) = longest {
        parts.push(format!(
            "The maximum 95th percentile queue of {:.0} feet occurs at the {} movement.",
            queue, name
        ));
    }

    NarrativeSection::new(
        format!("analysis_{}", slug(&intersection.name)),
        format!("{} Analysis Results", intersection.name),
        parts.join(" "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::models::{AnalysisPeriod, LaneGroupSummary, ScenarioResult, ScenarioType};

    fn intersection(name: &str, los: LevelOfService, delay: f64, vc: f64) -> IntersectionResult {
        IntersectionResult {
            name: name.to_string(),
            control_type: "Signalized".to_string(),
            analysis_period: AnalysisPeriod::PmPeak,
            overall_los: los,
            overall_delay: delay,
            overall_vc: Some(vc),
            worst_approach_los: None,
            worst_approach_name: None,
            worst_movement_los: None,
            worst_movement_name: None,
            lane_groups: vec![],
            cycle_length: Some(90.0),
            notes: None,
        }
    }

    fn scenario(name: &str, scenario_type: ScenarioType, intersections: Vec<IntersectionResult>) -> ScenarioResult {
        ScenarioResult {
            scenario_type,
            scenario_name: name.to_string(),
            year: None,
            intersections,
            description: None,
        }
    }

    fn comparison() -> ScenarioComparison {
        ScenarioComparison {
            baseline: scenario(
                "Existing",
                ScenarioType::Existing,
                vec![intersection("Main St & 1st Ave", LevelOfService::C, 28.4, 0.71)],
            ),
            proposed: scenario(
                "Existing Plus Project",
                ScenarioType::Build,
                vec![intersection("Main St & 1st Ave", LevelOfService::E, 61.2, 0.96)],
            ),
            project_name: Some("Riverside Commons".to_string()),
            project_trips_am: Some(120),
            project_trips_pm: Some(145),
        }
    }

    #[test]
    fn test_executive_summary() {
        let section = executive_summary(&comparison());
        assert_eq!(section.section_id, "executive_summary");
        assert!(section.content.starts_with(
            "A traffic analysis was conducted for the Riverside Commons evaluating 1 intersection(s)"
        ));
        assert!(section.content.contains("120 trips during the AM peak hour and 145 trips"));
        assert!(section.content.contains("1 additional intersection(s) would operate at LOS E or F"));
    }

    #[test]
    fn test_trips_sentence_requires_both_peaks() {
        let mut data = comparison();
        data.project_trips_pm = None;
        assert!(!executive_summary(&data).content.contains("anticipated to generate"));
    }

    #[test]
    fn test_intersection_analysis_sentences() {
        let mut data = intersection("Main St & 1st Ave", LevelOfService::F, 92.3, 1.12);
        data.lane_groups = vec![LaneGroupSummary {
            name: "EBL".to_string(),
            movement: "left".to_string(),
            volume: 300.0,
            capacity: 250.0,
            vc_ratio: 1.2,
            delay: 140.0,
            los: LevelOfService::F,
            queue_50th: None,
            queue_95th: None,
        }];
        let section = intersection_analysis(&data, "Existing Plus Project");

        assert_eq!(section.section_id, "intersection_main_st_&_1st_ave_existing_plus_project");
        assert_eq!(section.title, "Main St & 1st Ave Analysis - Existing Plus Project");
        assert!(section.content.contains("operates at an overall LOS F with 92.3 seconds of delay during the PM Peak period."));
        assert!(section.content.contains("The critical volume-to-capacity ratio is 1.12."));
        assert!(section.content.contains("assumes a 90-second cycle length"));
        assert!(section.content.contains("operate at LOS F: EBL."));
    }

    #[test]
    fn test_comparison_paragraph() {
        let section = comparison_paragraph(&comparison(), "Main St & 1st Ave");
        assert_eq!(section.title, "Main St & 1st Ave Scenario Comparison");
        assert!(section.content.contains("the overall LOS changed from C to E"));
        assert!(section.content.contains("representing an increase of 32.8 seconds"));
        assert!(section.content.contains("The critical v/c ratio increased from 0.71 to 0.96."));

        let missing = comparison_paragraph(&comparison(), "Elm St");
        assert_eq!(missing.title, "Elm St Comparison");
        assert_eq!(missing.content, "Comparison data not available for Elm St.");
    }

    #[test]
    fn test_small_delay_change_not_significant() {
        assert_eq!(format_change(20.0, 20.05), "no significant change");
        assert_eq!(format_change(20.0, 18.5), "a decrease of 1.5 seconds");
    }

    #[test]
    fn test_compliance_without_thresholds() {
        let section = compliance_statement(&comparison().proposed.intersections, &NarrativeOptions::default());
        assert!(section.content.starts_with("No specific LOS or v/c thresholds were provided"));
    }

    #[test]
    fn test_compliance_with_thresholds() {
        let options = NarrativeOptions {
            threshold_los: Some(LevelOfService::D),
            threshold_vc: Some(0.90),
            jurisdiction: Some("City of Springfield".to_string()),
            include_lane_groups: false,
        };
        let section = compliance_statement(&comparison().proposed.intersections, &options);
        assert!(section.content.starts_with("Based on the provided City of Springfield thresholds:"));
        assert!(section.content.contains(
            "does not meet the specified thresholds (LOS E exceeds threshold of LOS D; v/c ratio of 0.96 exceeds threshold of 0.90)"
        ));
    }

    #[test]
    fn test_single_intersection_queue() {
        let mut data = intersection("Oak Ave", LevelOfService::B, 14.2, 0.48);
        data.lane_groups = ["NBT", "SBT"]
            .iter()
            .zip([180.0, 240.0])
            .map(|(name, queue)| LaneGroupSummary {
                name: name.to_string(),
                movement: "through".to_string(),
                volume: 500.0,
                capacity: 1200.0,
                vc_ratio: 0.42,
                delay: 14.0,
                los: LevelOfService::B,
                queue_50th: None,
                queue_95th: Some(queue),
            })
            .collect();

        let section = single_intersection(&data);
        assert_eq!(section.section_id, "analysis_oak_ave");
        assert!(section.content.contains("The signalized intersection operates at LOS B with 14.2 seconds of delay."));
        assert!(section.content.contains("queue of 240 feet occurs at the SBT movement."));
    }
}
