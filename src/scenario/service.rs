use crate::scenario::models::{
    ChangeOperation, ChangeResult, ChangeValidationError, ScenarioChange, ScenarioChangeSet,
};
use crate::scenario::operations::apply_operation;
use crate::scenario::validation::validate_change;
use serde_json::Value;
use std::collections::BTreeSet;

/// 不修改輸入，模擬依序套用以找出連鎖錯誤
pub fn validate_changes(doc: &Value, change_set: &ScenarioChangeSet) -> Vec<ChangeValidationError> {
    let mut all_errors = Vec::new();
    let mut current = doc.clone();

    for (index, change) in change_set.changes.iter().enumerate() {
        let errors = validate_change(&current, change, index);
        if errors.is_empty() {
            let mut next = current.clone();
            match apply_operation(&mut next, change) {
                Ok(_) => current = next,
                Err(e) => all_errors.push(ChangeValidationError::new(
                    &change.path,
                    format!("Simulation failed: {}", e),
                    index,
                )),
            }
        } else {
            all_errors.extend(errors);
        }
    }

    all_errors
}

/// 原子地套用變更組；任一變更失敗則不產生修改後的文件
pub fn apply_changes(doc: &Value, change_set: &ScenarioChangeSet, validate: bool) -> ChangeResult {
    if validate {
        let errors = validate_changes(doc, change_set);
        if !errors.is_empty() {
            tracing::debug!("change set rejected with {} error(s)", errors.len());
            return ChangeResult::rejected(errors, Vec::new());
        }
    }

    let mut current = doc.clone();
    let mut applied = Vec::with_capacity(change_set.changes.len());

    for (index, change) in change_set.changes.iter().enumerate() {
        match apply_operation(&mut current, change) {
            Ok(previous) => applied.push(ScenarioChange::recorded(
                change.op,
                change.path.clone(),
                change.value.clone(),
                previous,
            )),
            Err(e) => {
                let error = ChangeValidationError::new(&change.path, e.to_string(), index);
                return ChangeResult::rejected(vec![error], applied);
            }
        }
    }

    ChangeResult {
        success: true,
        changes_applied: applied.len(),
        errors: Vec::new(),
        modified_object: Some(current),
        applied_changes: applied,
    }
}

/// 計算將 `original` 轉為 `modified` 所需的變更清單
pub fn compute_diff(original: &Value, modified: &Value) -> Vec<ScenarioChange> {
    let mut changes = Vec::new();
    diff_into(original, modified, "", &mut changes);
    changes
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn diff_into(original: &Value, modified: &Value, path: &str, changes: &mut Vec<ScenarioChange>) {
    if !same_kind(original, modified) {
        changes.push(ScenarioChange::recorded(
            ChangeOperation::Replace,
            display_path(path),
            Some(modified.clone()),
            Some(original.clone()),
        ));
        return;
    }

    match (original, modified) {
        (Value::Object(before), Value::Object(after)) => {
            let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
            for key in keys {
                let key_path = format!("{}/{}", path, key);
                match (before.get(key), after.get(key)) {
                    (None, Some(added)) => changes.push(ScenarioChange::recorded(
                        ChangeOperation::Add,
                        key_path,
                        Some(added.clone()),
                        None,
                    )),
                    (Some(removed), None) => changes.push(ScenarioChange::recorded(
                        ChangeOperation::Remove,
                        key_path,
                        None,
                        Some(removed.clone()),
                    )),
                    (Some(a), Some(b)) => diff_into(a, b, &key_path, changes),
                    (None, None) => {}
                }
            }
        }
        (Value::Array(before), Value::Array(after)) => {
            for index in 0..before.len().max(after.len()) {
                let item_path = format!("{}/{}", path, index);
                match (before.get(index), after.get(index)) {
                    (None, Some(added)) => changes.push(ScenarioChange::recorded(
                        ChangeOperation::Add,
                        item_path,
                        Some(added.clone()),
                        None,
                    )),
                    (Some(removed), None) => changes.push(ScenarioChange::recorded(
                        ChangeOperation::Remove,
                        item_path,
                        None,
                        Some(removed.clone()),
                    )),
                    (Some(a), Some(b)) => diff_into(a, b, &item_path, changes),
                    (None, None) => {}
                }
            }
        }
        _ => {
            if original != modified {
                changes.push(ScenarioChange::recorded(
                    ChangeOperation::Replace,
                    display_path(path),
                    Some(modified.clone()),
                    Some(original.clone()),
                ));
            }
        }
    }
}
