use crate::scenario::models::{ChangeOperation, ScenarioChange};
use crate::scenario::pointer::{self, kind_of, ChangeError};
use serde_json::{json, Map, Number, Value};

const LANES_KEY: &str = "num_lanes";
const VOLUME_KEY: &str = "volume";

/// 套用單一變更於文件上，回傳被取代的原值
pub fn apply_operation(doc: &mut Value, change: &ScenarioChange) -> Result<Option<Value>, ChangeError> {
    match change.op {
        ChangeOperation::Replace => pointer::set(doc, &change.path, value_or_null(change)),
        ChangeOperation::Add => {
            pointer::insert(doc, &change.path, value_or_null(change))?;
            Ok(None)
        }
        ChangeOperation::Remove => pointer::delete(doc, &change.path).map(Some),
        ChangeOperation::AddLane => adjust_lanes(doc, &change.path, |n| n + 1),
        ChangeOperation::RemoveLane => adjust_lanes(doc, &change.path, |n| (n - 1).max(1)),
        ChangeOperation::ModifyLanes => {
            let group = lane_group(doc, &change.path)?;
            let previous = group.get(LANES_KEY).cloned().unwrap_or_else(|| json!(1));
            group.insert(LANES_KEY.to_string(), value_or_null(change));
            Ok(Some(previous))
        }
        ChangeOperation::ModifyVolume => modify_volume(doc, change),
        ChangeOperation::ModifyTiming => {
            let timing = pointer::get_mut(doc, &change.path)?;
            let previous = timing.clone();
            if let Some(Value::Object(updates)) = &change.value {
                let target = timing
                    .as_object_mut()
                    .ok_or_else(|| ChangeError::NotAnObject(change.path.clone()))?;
                for (key, value) in updates {
                    target.insert(key.clone(), value.clone());
                }
            }
            Ok(Some(previous))
        }
    }
}

fn value_or_null(change: &ScenarioChange) -> Value {
    change.value.clone().unwrap_or(Value::Null)
}

fn lane_group<'a>(doc: &'a mut Value, path: &str) -> Result<&'a mut Map<String, Value>, ChangeError> {
    pointer::get_mut(doc, path)?
        .as_object_mut()
        .ok_or_else(|| ChangeError::NotAnObject(path.to_string()))
}

fn adjust_lanes(
    doc: &mut Value,
    path: &str,
    adjust: impl Fn(i64) -> i64,
) -> Result<Option<Value>, ChangeError> {
    let group = lane_group(doc, path)?;
    let previous = match group.get(LANES_KEY) {
        None => 1,
        Some(value) => lane_count(value).ok_or_else(|| {
            ChangeError::InvalidValue(format!("num_lanes at '{}' is not an integer: {}", path, value))
        })?,
    };
    group.insert(LANES_KEY.to_string(), json!(adjust(previous)));
    Ok(Some(json!(previous)))
}

/// 2 與 2.0 同樣視為整數車道數
fn lane_count(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// 解析流量變更值："+n"、"-n"、"*n" 為相對值，其餘為絕對值
pub fn resolve_volume(previous: f64, value: &Value) -> Result<f64, ChangeError> {
    let parse = |text: &str| {
        text.trim()
            .parse::<f64>()
            .map_err(|_| ChangeError::InvalidValue(format!("invalid volume value: {}", value)))
    };

    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ChangeError::InvalidValue(format!("invalid volume value: {}", n))),
        Value::String(s) => {
            if let Some(rest) = s.strip_prefix('+') {
                Ok(previous + parse(rest)?)
            } else if let Some(rest) = s.strip_prefix('-') {
                Ok(previous - parse(rest)?)
            } else if let Some(rest) = s.strip_prefix('*') {
                Ok(previous * parse(rest)?)
            } else {
                parse(s)
            }
        }
        other => Err(ChangeError::InvalidValue(format!(
            "volume must be a number or relative string, got {}",
            kind_of(other)
        ))),
    }
}

/// 整數結果保留為整數，避免 800 變成 800.0
fn volume_number(volume: f64) -> Value {
    if volume.fract() == 0.0 && volume.abs() < 1e15 {
        json!(volume as i64)
    } else {
        Number::from_f64(volume).map_or(Value::Null, Value::Number)
    }
}

fn modify_volume(doc: &mut Value, change: &ScenarioChange) -> Result<Option<Value>, ChangeError> {
    let requested = change
        .value
        .as_ref()
        .ok_or_else(|| ChangeError::InvalidValue("modify_volume requires a value".to_string()))?;

    let segments = pointer::parse_path(&change.path);
    // 路徑指向車道群物件時，改其 volume 欄位
    let points_to_group = pointer::get(doc, &change.path).is_ok_and(Value::is_object);
    let (parents, last) = match segments.split_last() {
        _ if points_to_group => (&segments[..], VOLUME_KEY),
        Some((last, parents)) => (parents, *last),
        None => (&segments[..0], VOLUME_KEY),
    };

    let target = pointer::walk_mut(doc, parents)?;
    let previous = match target {
        Value::Object(map) => {
            let key = if map.contains_key(last) { last } else { VOLUME_KEY };
            let previous = map.get(key).cloned().unwrap_or_else(|| json!(0));
            let new_volume = resolve_volume(number_of(&previous, key)?, requested)?;
            map.insert(key.to_string(), volume_number(new_volume.max(0.0)));
            previous
        }
        Value::Array(items) => {
            let index = last
                .parse::<usize>()
                .map_err(|_| ChangeError::InvalidIndex(last.to_string()))?;
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(ChangeError::IndexOutOfRange { index, len })?;
            let previous = slot.clone();
            let new_volume = resolve_volume(number_of(&previous, last)?, requested)?;
            *slot = volume_number(new_volume.max(0.0));
            previous
        }
        other => {
            return Err(ChangeError::NotContainer {
                kind: kind_of(other),
                segment: last.to_string(),
            })
        }
    };

    Ok(Some(previous))
}

fn number_of(value: &Value, key: &str) -> Result<f64, ChangeError> {
    value
        .as_f64()
        .ok_or_else(|| ChangeError::InvalidValue(format!("existing '{}' is not a number: {}", key, value)))
}
