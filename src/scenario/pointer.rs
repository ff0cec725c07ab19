//! `serde_json::Value` 上的 JSON Pointer 操作。
//!
//! 路徑片段不做 RFC 6901 跳脫（`~0`、`~1` 視為一般字元）。

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChangeError {
    #[error("key '{0}' not found")]
    MissingKey(String),

    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("'{0}' is not a valid array index")]
    InvalidIndex(String),

    #[error("cannot traverse into {kind} at '{segment}'")]
    NotContainer { kind: &'static str, segment: String },

    #[error("cannot {0} the root document")]
    Root(&'static str),

    #[error("target at '{0}' is not an object")]
    NotAnObject(String),

    #[error("{0}")]
    InvalidValue(String),
}

pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// "/" 代表根，回傳空片段
pub fn parse_path(path: &str) -> Vec<&str> {
    if path == "/" {
        return Vec::new();
    }
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}

fn parse_index(segment: &str) -> Result<usize, ChangeError> {
    segment
        .parse::<usize>()
        .map_err(|_| ChangeError::InvalidIndex(segment.to_string()))
}

fn step<'a>(current: &'a Value, segment: &str) -> Result<&'a Value, ChangeError> {
    match current {
        Value::Array(items) => {
            let index = parse_index(segment)?;
            items.get(index).ok_or(ChangeError::IndexOutOfRange {
                index,
                len: items.len(),
            })
        }
        Value::Object(map) => map
            .get(segment)
            .ok_or_else(|| ChangeError::MissingKey(segment.to_string())),
        other => Err(ChangeError::NotContainer {
            kind: kind_of(other),
            segment: segment.to_string(),
        }),
    }
}

fn step_mut<'a>(current: &'a mut Value, segment: &str) -> Result<&'a mut Value, ChangeError> {
    match current {
        Value::Array(items) => {
            let index = parse_index(segment)?;
            let len = items.len();
            items
                .get_mut(index)
                .ok_or(ChangeError::IndexOutOfRange { index, len })
        }
        Value::Object(map) => map
            .get_mut(segment)
            .ok_or_else(|| ChangeError::MissingKey(segment.to_string())),
        other => Err(ChangeError::NotContainer {
            kind: kind_of(other),
            segment: segment.to_string(),
        }),
    }
}

pub(crate) fn walk_mut<'a>(doc: &'a mut Value, segments: &[&str]) -> Result<&'a mut Value, ChangeError> {
    segments
        .iter()
        .try_fold(doc, |current, segment| step_mut(current, segment))
}

pub fn get<'a>(doc: &'a Value, path: &str) -> Result<&'a Value, ChangeError> {
    parse_path(path)
        .into_iter()
        .try_fold(doc, |current, segment| step(current, segment))
}

pub fn get_mut<'a>(doc: &'a mut Value, path: &str) -> Result<&'a mut Value, ChangeError> {
    walk_mut(doc, &parse_path(path))
}

/// 設定值並回傳原值；物件中不存在的鍵會被新增，原值為 `None`
pub fn set(doc: &mut Value, path: &str, value: Value) -> Result<Option<Value>, ChangeError> {
    let segments = parse_path(path);
    let (last, parents) = segments.split_last().ok_or(ChangeError::Root("replace"))?;

    match walk_mut(doc, parents)? {
        Value::Array(items) => {
            let index = parse_index(last)?;
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(ChangeError::IndexOutOfRange { index, len })?;
            Ok(Some(std::mem::replace(slot, value)))
        }
        Value::Object(map) => Ok(map.insert(last.to_string(), value)),
        other => Err(ChangeError::NotContainer {
            kind: kind_of(other),
            segment: last.to_string(),
        }),
    }
}

pub fn delete(doc: &mut Value, path: &str) -> Result<Value, ChangeError> {
    let segments = parse_path(path);
    let (last, parents) = segments.split_last().ok_or(ChangeError::Root("delete"))?;

    match walk_mut(doc, parents)? {
        Value::Array(items) => {
            let index = parse_index(last)?;
            if index >= items.len() {
                return Err(ChangeError::IndexOutOfRange {
                    index,
                    len: items.len(),
                });
            }
            Ok(items.remove(index))
        }
        Value::Object(map) => map
            .remove(*last)
            .ok_or_else(|| ChangeError::MissingKey(last.to_string())),
        other => Err(ChangeError::NotContainer {
            kind: kind_of(other),
            segment: last.to_string(),
        }),
    }
}

/// 陣列："-" 附加於尾端，索引超出長度時同樣附加；物件：設定鍵值
pub fn insert(doc: &mut Value, path: &str, value: Value) -> Result<(), ChangeError> {
    let segments = parse_path(path);
    let (last, parents) = segments.split_last().ok_or(ChangeError::Root("insert at"))?;

    match walk_mut(doc, parents)? {
        Value::Array(items) => {
            if *last == "-" {
                items.push(value);
            } else {
                let index = parse_index(last)?.min(items.len());
                items.insert(index, value);
            }
            Ok(())
        }
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        other => Err(ChangeError::NotContainer {
            kind: kind_of(other),
            segment: last.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "name": "Main St & 1st Ave",
            "lane_groups": [
                {"num_lanes": 2, "volume": 800},
                {"num_lanes": 1, "volume": 250}
            ]
        })
    }

    #[test]
    fn test_parse_path() {
        assert!(parse_path("/").is_empty());
        assert_eq!(parse_path("/lane_groups/0/num_lanes"), vec!["lane_groups", "0", "num_lanes"]);
        assert_eq!(parse_path("/a~1b"), vec!["a~1b"]);
    }

    #[test]
    fn test_get_nested_and_missing() {
        let d = doc();
        assert_eq!(get(&d, "/lane_groups/1/volume").unwrap(), &json!(250));
        assert_eq!(get(&d, "/").unwrap(), &d);
        assert_eq!(
            get(&d, "/lane_groups/5").unwrap_err(),
            ChangeError::IndexOutOfRange { index: 5, len: 2 }
        );
        assert!(matches!(get(&d, "/name/x"), Err(ChangeError::NotContainer { kind: "string", .. })));
    }

    #[test]
    fn test_set_returns_previous() {
        let mut d = doc();
        let previous = set(&mut d, "/lane_groups/0/volume", json!(900)).unwrap();
        assert_eq!(previous, Some(json!(800)));
        assert_eq!(d["lane_groups"][0]["volume"], json!(900));

        let added = set(&mut d, "/lane_groups/0/grade_pct", json!(2)).unwrap();
        assert_eq!(added, None);
    }

    #[test]
    fn test_root_operations_rejected() {
        let mut d = doc();
        assert_eq!(set(&mut d, "/", json!(1)).unwrap_err(), ChangeError::Root("replace"));
        assert_eq!(delete(&mut d, "/").unwrap_err(), ChangeError::Root("delete"));
        assert!(insert(&mut d, "/", json!(1)).is_err());
    }

    #[test]
    fn test_delete_and_insert() {
        let mut d = doc();
        let removed = delete(&mut d, "/lane_groups/0").unwrap();
        assert_eq!(removed["volume"], json!(800));
        assert_eq!(d["lane_groups"].as_array().unwrap().len(), 1);

        insert(&mut d, "/lane_groups/-", json!({"num_lanes": 3})).unwrap();
        insert(&mut d, "/lane_groups/0", json!({"num_lanes": 4})).unwrap();
        assert_eq!(d["lane_groups"][0]["num_lanes"], json!(4));
        assert_eq!(d["lane_groups"][2]["num_lanes"], json!(3));
    }
}
