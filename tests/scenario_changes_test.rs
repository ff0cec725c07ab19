use intersection_los::scenario::{
    apply_changes, compute_diff, validate_changes, ChangeOperation, ScenarioChangeSet,
};
use intersection_los::{LaneGroupInput, LaneGroupParams, LosError};
use serde_json::{json, Value};

fn intersection_document() -> Value {
    json!({
        "NBT": serde_json::to_value(LaneGroupParams::new(800.0, 2, 90.0, 40.0)).unwrap(),
        "NBL": serde_json::to_value(LaneGroupParams::new(300.0, 1, 90.0, 20.0)).unwrap()
    })
}

#[test]
fn test_project_trips_flow_into_engine_input() {
    let doc = intersection_document();
    let set = ScenarioChangeSet::new("Existing Plus Project", "Adds site traffic", None)
        .add_change(ChangeOperation::ModifyVolume, "/NBT", Some(json!("+200")))
        .unwrap()
        .add_change(ChangeOperation::AddLane, "/NBL", None)
        .unwrap()
        .add_change(
            ChangeOperation::ModifyTiming,
            "/NBL/signal_timing",
            Some(json!({"effective_green": 25})),
        )
        .unwrap();

    let result = apply_changes(&doc, &set, true);
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.changes_applied, 3);

    let modified = result.modified_object.unwrap();
    assert_eq!(modified["NBT"]["volume"], json!(1000));
    assert_eq!(modified["NBL"]["num_lanes"], json!(2));
    assert_eq!(modified["NBL"]["signal_timing"]["effective_green"], json!(25));
    assert_eq!(modified["NBL"]["signal_timing"]["cycle_length"], json!(90.0));

    // 原文件不受影響
    assert_eq!(doc, intersection_document());

    let audit = &result.applied_changes;
    assert_eq!(audit[0].previous_value, Some(json!(800.0)));
    assert_eq!(audit[1].previous_value, Some(json!(1)));

    let params: LaneGroupParams = serde_json::from_value(modified["NBL"].clone()).unwrap();
    let input = LaneGroupInput::try_new(params).unwrap();
    assert_eq!(input.num_lanes(), 2);
}

#[test]
fn test_failed_change_set_leaves_nothing_applied() {
    let doc = intersection_document();
    let set = ScenarioChangeSet::default()
        .add_change(ChangeOperation::ModifyVolume, "/NBT", Some(json!("*1.1")))
        .unwrap()
        .add_change(ChangeOperation::Remove, "/EBT", None)
        .unwrap();

    let result = apply_changes(&doc, &set, true);
    assert!(!result.success);
    assert!(result.modified_object.is_none());
    assert_eq!(result.changes_applied, 0);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].change_index, 1);
    assert_eq!(result.errors[0].path, "/EBT");

    let err = result.into_result().unwrap_err();
    assert!(matches!(err, LosError::Scenario { .. }));
}

#[test]
fn test_validation_simulates_changes_in_order() {
    let doc = intersection_document();

    // 第二個變更只在第一個變更之後才有效
    let set = ScenarioChangeSet::default()
        .add_change(
            ChangeOperation::Add,
            "/SBT",
            Some(serde_json::to_value(LaneGroupParams::new(500.0, 2, 90.0, 40.0)).unwrap()),
        )
        .unwrap()
        .add_change(ChangeOperation::AddLane, "/SBT", None)
        .unwrap();
    assert!(validate_changes(&doc, &set).is_empty());

    let reversed = ScenarioChangeSet {
        changes: set.changes.iter().rev().cloned().collect(),
        ..ScenarioChangeSet::default()
    };
    let errors = validate_changes(&doc, &reversed);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].change_index, 0);
}

#[test]
fn test_invalid_paths_and_values_are_reported() {
    assert!(serde_json::from_value::<ScenarioChangeSet>(json!({
        "changes": [{"op": "replace", "path": "NBT/volume", "value": 1}]
    }))
    .is_err());

    let doc = intersection_document();
    let set = ScenarioChangeSet::default()
        .add_change(ChangeOperation::Replace, "/NBT/volume", None)
        .unwrap()
        .add_change(ChangeOperation::ModifyVolume, "/NBT", Some(json!("lots")))
        .unwrap();

    let errors = validate_changes(&doc, &set);
    let indexes: Vec<usize> = errors.iter().map(|e| e.change_index).collect();
    assert!(indexes.contains(&0));
    assert!(indexes.contains(&1));
}

#[test]
fn test_diff_recovers_applied_changes() {
    let doc = intersection_document();
    let set = ScenarioChangeSet::default()
        .add_change(ChangeOperation::Replace, "/NBT/volume", Some(json!(950.0)))
        .unwrap()
        .add_change(ChangeOperation::Remove, "/NBL", None)
        .unwrap();

    let modified = apply_changes(&doc, &set, true).modified_object.unwrap();
    let diff = compute_diff(&doc, &modified);

    let summary: Vec<(ChangeOperation, &str)> = diff.iter().map(|c| (c.op, c.path.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            (ChangeOperation::Remove, "/NBL"),
            (ChangeOperation::Replace, "/NBT/volume"),
        ]
    );
    assert_eq!(diff[1].previous_value, Some(json!(800.0)));

    let replay = ScenarioChangeSet {
        changes: diff,
        ..ScenarioChangeSet::default()
    };
    let replayed = apply_changes(&doc, &replay, true).modified_object.unwrap();
    assert_eq!(replayed, modified);
}

#[test]
fn test_identical_documents_have_empty_diff() {
    let doc = intersection_document();
    assert!(compute_diff(&doc, &doc.clone()).is_empty());
}
