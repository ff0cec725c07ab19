use crate::core::{ConfigProvider, Pipeline, Storage, StudyDefinition, StudyOutcome};
use crate::domain::model::{movement_label_of, LaneGroupOutcome, ScenarioDefinition, ScenarioOutcome};
use crate::hcm::{
    compute_lane_group, LaneGroupInput, LaneGroupParams, LaneGroupResult, LevelOfService, ENGINE_VERSION,
};
use crate::report::{
    generate_narrative, IntersectionResult, LaneGroupSummary, NarrativeOptions, NarrativeSubject,
    ReportNarrative, ScenarioComparison, ScenarioResult,
};
use crate::scenario::{apply_changes, ScenarioChange};
use crate::utils::error::{LosError, Result};
use crate::utils::validation::Validate;
use crate::volume::analyze_volumes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const RESULTS_JSON: &str = "results.json";
pub const RESULTS_CSV: &str = "results.csv";
pub const NARRATIVE_MD: &str = "narrative.md";
pub const VOLUME_CHECK_JSON: &str = "volume_check.json";
pub const MANIFEST_JSON: &str = "manifest.json";

/// 輸出清單，記錄引擎版本與每個車道群輸入的雜湊
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub study_name: String,
    pub engine_version: String,
    pub generated_at: DateTime<Utc>,
    pub files: Vec<String>,
    pub input_hashes: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    scenario: &'a str,
    lane_group: &'a str,
    movement: &'a str,
    volume: f64,
    num_lanes: u32,
    saturation_flow: f64,
    capacity: f64,
    vc_ratio: f64,
    uniform_delay: f64,
    incremental_delay: f64,
    control_delay: f64,
    los: LevelOfService,
    oversaturated: bool,
}

struct PreparedLaneGroup {
    name: String,
    movement: String,
    queue_95th: Option<f64>,
    input: LaneGroupInput,
}

struct PreparedScenario {
    definition: ScenarioDefinition,
    applied_changes: Vec<ScenarioChange>,
    lane_groups: Vec<PreparedLaneGroup>,
}

pub struct StudyPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> StudyPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    /// 平行計算所有車道群，結果依輸入順序排列
    async fn compute_all(&self, inputs: Vec<LaneGroupInput>) -> Result<Vec<LaneGroupResult>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel().max(1)));
        let mut tasks = JoinSet::new();

        for (index, input) in inputs.into_iter().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| LosError::internal(format!("Worker pool closed: {}", e)))?;
            tasks.spawn_blocking(move || {
                let _permit = permit;
                (index, compute_lane_group(&input))
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, result) =
                joined.map_err(|e| LosError::internal(format!("Lane group worker failed: {}", e)))?;
            results.push((index, result?));
        }

        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    fn render_outputs(&self, outcome: &StudyOutcome) -> Result<Vec<(&'static str, Vec<u8>)>> {
        let mut files = Vec::new();

        if self.config.wants_format("json") {
            files.push((RESULTS_JSON, serde_json::to_vec_pretty(outcome)?));
            if let Some(volume_check) = &outcome.volume_check {
                files.push((VOLUME_CHECK_JSON, serde_json::to_vec_pretty(volume_check)?));
            }
        }
        if self.config.wants_format("csv") {
            files.push((RESULTS_CSV, render_csv(outcome)?));
        }
        if self.config.wants_format("md") {
            files.push((NARRATIVE_MD, outcome.narrative_markdown().into_bytes()));
        }

        let manifest = RunManifest {
            study_name: outcome.study_name.clone(),
            engine_version: outcome.engine_version.clone(),
            generated_at: Utc::now(),
            files: files.iter().map(|(name, _)| name.to_string()).collect(),
            input_hashes: outcome
                .scenarios
                .iter()
                .flat_map(|s| s.lane_groups.iter())
                .map(|lg| (format!("{}/{}", lg.scenario, lg.name), lg.input_hash.clone()))
                .collect(),
        };
        files.push((MANIFEST_JSON, serde_json::to_vec_pretty(&manifest)?));

        Ok(files)
    }
}

fn render_csv(outcome: &StudyOutcome) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for lane_group in outcome.scenarios.iter().flat_map(|s| s.lane_groups.iter()) {
        let result = &lane_group.result;
        writer.serialize(CsvRow {
            scenario: &lane_group.scenario,
            lane_group: &lane_group.name,
            movement: &lane_group.movement,
            volume: result.volume,
            num_lanes: result.num_lanes,
            saturation_flow: result.saturation_flow.total_saturation_flow,
            capacity: result.capacity,
            vc_ratio: result.vc_ratio,
            uniform_delay: result.uniform_delay,
            incremental_delay: result.incremental_delay,
            control_delay: result.control_delay,
            los: result.los,
            oversaturated: result.is_oversaturated,
        })?;
    }
    writer.into_inner().map_err(|e| LosError::IoError(e.into_error()))
}

fn bundle_zip(files: &[(&'static str, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file(*name, SimpleFileOptions::default())?;
        zip.write_all(data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// 驗證錯誤的欄位名稱加上情境與車道群前綴
fn qualify(err: LosError, scenario: &str, lane_group: &str) -> LosError {
    match err {
        LosError::InvalidInput { violations } => LosError::InvalidInput {
            violations: violations
                .into_iter()
                .map(|mut v| {
                    v.field = format!("{}/{}.{}", scenario, lane_group, v.field);
                    v
                })
                .collect(),
        },
        other => other,
    }
}

fn prepare_scenario(study: &StudyDefinition, base: &Value, definition: &ScenarioDefinition) -> Result<PreparedScenario> {
    let (document, applied_changes) = apply_changes(base, &study.change_set(definition), true).into_result()?;
    let entries = document
        .as_object()
        .ok_or_else(|| LosError::internal("Scenario document is no longer an object"))?;

    // 先依研究檔順序，再接情境新增的車道群
    let known = study.lane_groups.iter().map(|lg| lg.name.as_str());
    let added = entries
        .keys()
        .map(String::as_str)
        .filter(|name| study.lane_group(name).is_none());

    let mut lane_groups = Vec::new();
    for name in known.chain(added) {
        let Some(value) = entries.get(name) else {
            continue;
        };
        let params: LaneGroupParams = serde_json::from_value(value.clone())?;
        let base_group = study.lane_group(name);
        let movement = base_group
            .map(|lg| lg.movement_label())
            .unwrap_or_else(|| movement_label_of(&params));
        let input = LaneGroupInput::try_new(params).map_err(|e| qualify(e, &definition.name, name))?;

        lane_groups.push(PreparedLaneGroup {
            name: name.to_string(),
            movement,
            queue_95th: base_group.and_then(|lg| lg.queue_95th),
            input,
        });
    }

    if lane_groups.is_empty() {
        return Err(LosError::Scenario {
            errors: vec![format!("scenario '{}' leaves no lane groups to analyze", definition.name)],
        });
    }

    Ok(PreparedScenario {
        definition: definition.clone(),
        applied_changes,
        lane_groups,
    })
}

fn scenario_result(outcome: &ScenarioOutcome) -> ScenarioResult {
    ScenarioResult {
        scenario_type: outcome.scenario_type,
        scenario_name: outcome.name.clone(),
        year: outcome.year,
        intersections: vec![outcome.intersection.clone()],
        description: outcome.description.clone(),
    }
}

/// 有其他情境時逐一與基準比較，否則只描述基準
fn build_narratives(
    study: &StudyDefinition,
    scenarios: &[ScenarioOutcome],
    options: &NarrativeOptions,
) -> Result<Vec<ReportNarrative>> {
    let results: Vec<ScenarioResult> = scenarios.iter().map(scenario_result).collect();
    let (baseline, others) = results
        .split_first()
        .ok_or_else(|| LosError::internal("Study produced no scenarios"))?;

    if others.is_empty() {
        return Ok(vec![generate_narrative(NarrativeSubject::Scenario(baseline), options)?]);
    }

    others
        .iter()
        .map(|proposed| {
            let comparison = ScenarioComparison {
                baseline: baseline.clone(),
                proposed: proposed.clone(),
                project_name: study.project_name.clone(),
                project_trips_am: study.project_trips_am,
                project_trips_pm: study.project_trips_pm,
            };
            generate_narrative(NarrativeSubject::Comparison(&comparison), options)
        })
        .collect()
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for StudyPipeline<S, C> {
    async fn extract(&self) -> Result<StudyDefinition> {
        tracing::debug!("Reading study file: {}", self.config.input_path());
        let data = self.storage.read_file(self.config.input_path()).await?;
        let study: StudyDefinition = serde_json::from_slice(&data)?;
        study.validate()?;
        Ok(study)
    }

    async fn transform(&self, study: StudyDefinition) -> Result<StudyOutcome> {
        let base = study.base_document()?;
        let baseline = study.baseline();

        let prepared = std::iter::once(&baseline)
            .chain(study.scenarios.iter())
            .map(|definition| prepare_scenario(&study, &base, definition))
            .collect::<Result<Vec<_>>>()?;

        for scenario in &prepared {
            tracing::debug!(
                "Scenario '{}': {} change(s), {} lane group(s)",
                scenario.definition.name,
                scenario.applied_changes.len(),
                scenario.lane_groups.len()
            );
        }

        let inputs: Vec<LaneGroupInput> = prepared
            .iter()
            .flat_map(|s| s.lane_groups.iter().map(|lg| lg.input.clone()))
            .collect();
        let mut results = self.compute_all(inputs).await?.into_iter();

        let mut scenarios = Vec::with_capacity(prepared.len());
        for scenario in prepared {
            let definition = scenario.definition;
            let cycle_length = scenario
                .lane_groups
                .first()
                .map(|lg| lg.input.signal_timing().cycle_length);

            let mut lane_groups = Vec::with_capacity(scenario.lane_groups.len());
            let mut summaries = Vec::with_capacity(scenario.lane_groups.len());
            for lane_group in scenario.lane_groups {
                let result = results
                    .next()
                    .ok_or_else(|| LosError::internal("Missing lane group result"))?;

                let mut summary = LaneGroupSummary::from_result(&lane_group.name, &lane_group.movement, &result);
                summary.queue_95th = lane_group.queue_95th;
                summaries.push(summary);

                lane_groups.push(LaneGroupOutcome {
                    scenario: definition.name.clone(),
                    input_hash: lane_group.input.content_hash()?,
                    name: lane_group.name,
                    movement: lane_group.movement,
                    result,
                });
            }

            let intersection = IntersectionResult::from_lane_groups(
                study.intersection.clone(),
                study.analysis_period,
                summaries,
                cycle_length,
            )?;
            tracing::info!(
                "📊 {}: LOS {} ({:.1} s/veh)",
                definition.name,
                intersection.overall_los,
                intersection.overall_delay
            );

            scenarios.push(ScenarioOutcome {
                name: definition.name,
                scenario_type: definition.scenario_type,
                year: definition.year,
                description: definition.description,
                applied_changes: scenario.applied_changes,
                lane_groups,
                intersection,
            });
        }

        let volume_check = study.volumes.as_ref().map(analyze_volumes);
        let narratives = build_narratives(&study, &scenarios, &self.config.narrative_options())?;

        Ok(StudyOutcome {
            study_name: study.name,
            engine_version: ENGINE_VERSION.to_string(),
            scenarios,
            narratives,
            volume_check,
        })
    }

    async fn load(&self, outcome: StudyOutcome) -> Result<String> {
        let files = self.render_outputs(&outcome)?;

        if let Some(archive) = self.config.archive_name() {
            tracing::debug!("Creating ZIP file with {} files", files.len());
            let zip_data = bundle_zip(&files)?;
            let path = self.output_file(archive);
            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(&path, &zip_data).await?;
            return Ok(path);
        }

        for (name, data) in &files {
            self.storage.write_file(&self.output_file(name), data).await?;
        }
        Ok(self.config.output_path().to_string())
    }
}
