use crate::scenario::models::{ChangeOperation, ChangeValidationError, ScenarioChange};
use crate::scenario::pointer::{self, parse_path};
use serde_json::Value;

fn path_exists(doc: &Value, change: &ScenarioChange, index: usize) -> Option<ChangeValidationError> {
    pointer::get(doc, &change.path).err().map(|e| {
        ChangeValidationError::new(&change.path, format!("Path does not exist: {}", e), index)
    })
}

fn parent_exists(doc: &Value, change: &ScenarioChange, index: usize) -> Option<ChangeValidationError> {
    let segments = parse_path(&change.path);
    if segments.len() <= 1 {
        return None;
    }
    let parent = format!("/{}", segments[..segments.len() - 1].join("/"));
    pointer::get(doc, &parent).err().map(|e| {
        ChangeValidationError::new(&change.path, format!("Parent path does not exist: {}", e), index)
    })
}

fn lanes_value(change: &ScenarioChange, index: usize) -> Option<ChangeValidationError> {
    let message = match change.value.as_ref().and_then(Value::as_i64) {
        Some(lanes) if lanes > 8 => "Number of lanes cannot exceed 8",
        Some(lanes) if lanes >= 1 => return None,
        _ => "Number of lanes must be a positive integer",
    };
    Some(ChangeValidationError::new(&change.path, message, index))
}

fn is_number(text: &str) -> bool {
    text.trim().parse::<f64>().is_ok()
}

fn volume_value(change: &ScenarioChange, index: usize) -> Option<ChangeValidationError> {
    let message = match &change.value {
        Some(Value::String(s)) => match s.chars().next() {
            Some('+' | '-' | '*') if is_number(&s[1..]) => return None,
            Some('+' | '-' | '*') => format!("Invalid relative volume value: {}", s),
            _ if is_number(s) => return None,
            _ => format!("Invalid volume value: {}", s),
        },
        Some(Value::Number(n)) if n.as_f64().is_some_and(|v| v < 0.0) => {
            "Volume cannot be negative".to_string()
        }
        Some(Value::Number(_)) => return None,
        _ => "Volume must be a number or relative string".to_string(),
    };
    Some(ChangeValidationError::new(&change.path, message, index))
}

fn timing_value(change: &ScenarioChange, index: usize) -> Option<ChangeValidationError> {
    let Some(Value::Object(timing)) = &change.value else {
        return Some(ChangeValidationError::new(
            &change.path,
            "Timing value must be a dictionary",
            index,
        ));
    };

    if let Some(cycle) = timing.get("cycle_length") {
        if !cycle.as_f64().is_some_and(|c| c > 0.0 && c <= 300.0) {
            return Some(ChangeValidationError::new(
                &change.path,
                "cycle_length must be between 0 and 300",
                index,
            ));
        }
    }
    if let Some(green) = timing.get("effective_green") {
        if !green.as_f64().is_some_and(|g| g > 0.0) {
            return Some(ChangeValidationError::new(
                &change.path,
                "effective_green must be positive",
                index,
            ));
        }
    }
    None
}

/// 以目前文件狀態檢查單一變更，回傳所有錯誤
pub fn validate_change(doc: &Value, change: &ScenarioChange, index: usize) -> Vec<ChangeValidationError> {
    let mut errors = Vec::new();

    if change.op.requires_value() && change.value.is_none() {
        errors.push(ChangeValidationError::new(
            &change.path,
            format!("Operation '{}' requires a value", change.op),
            index,
        ));
    }

    if change.op.requires_existing_path() {
        errors.extend(path_exists(doc, change, index));
    }
    if change.op == ChangeOperation::Add {
        errors.extend(parent_exists(doc, change, index));
    }

    let domain_check = match change.op {
        ChangeOperation::ModifyLanes => lanes_value(change, index),
        ChangeOperation::ModifyVolume => volume_value(change, index),
        ChangeOperation::ModifyTiming => timing_value(change, index),
        _ => None,
    };
    errors.extend(domain_check);

    errors
}
