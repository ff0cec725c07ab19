use crate::utils::error::{FieldViolation, LosError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// 變更操作：前三個為 JSON Patch 風格，其餘為車道群專用捷徑
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    Replace,
    Add,
    Remove,
    AddLane,
    RemoveLane,
    ModifyLanes,
    ModifyVolume,
    ModifyTiming,
}

impl ChangeOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOperation::Replace => "replace",
            ChangeOperation::Add => "add",
            ChangeOperation::Remove => "remove",
            ChangeOperation::AddLane => "add_lane",
            ChangeOperation::RemoveLane => "remove_lane",
            ChangeOperation::ModifyLanes => "modify_lanes",
            ChangeOperation::ModifyVolume => "modify_volume",
            ChangeOperation::ModifyTiming => "modify_timing",
        }
    }

    pub fn requires_value(&self) -> bool {
        matches!(
            self,
            ChangeOperation::Replace
                | ChangeOperation::Add
                | ChangeOperation::ModifyLanes
                | ChangeOperation::ModifyVolume
                | ChangeOperation::ModifyTiming
        )
    }

    pub fn requires_existing_path(&self) -> bool {
        matches!(
            self,
            ChangeOperation::Replace
                | ChangeOperation::Remove
                | ChangeOperation::AddLane
                | ChangeOperation::RemoveLane
                | ChangeOperation::ModifyLanes
                | ChangeOperation::ModifyTiming
        )
    }
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn check_pointer(path: &str) -> Result<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(LosError::InvalidInput {
            violations: vec![FieldViolation::new("path", path, "must start with '/'")],
        })
    }
}

fn deserialize_pointer<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let path = String::deserialize(deserializer)?;
    check_pointer(&path).map_err(serde::de::Error::custom)?;
    Ok(path)
}

/// 單一變更；套用後 `previous_value` 記錄原值供稽核
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioChange {
    pub op: ChangeOperation,
    #[serde(deserialize_with = "deserialize_pointer")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<Value>,
}

impl ScenarioChange {
    pub fn new(op: ChangeOperation, path: impl Into<String>, value: Option<Value>) -> Result<Self> {
        let path = path.into();
        check_pointer(&path)?;
        Ok(Self {
            op,
            path,
            value,
            previous_value: None,
        })
    }

    pub(crate) fn recorded(
        op: ChangeOperation,
        path: String,
        value: Option<Value>,
        previous_value: Option<Value>,
    ) -> Self {
        Self {
            op,
            path,
            value,
            previous_value,
        }
    }
}

/// 依序且原子地套用的一組變更
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioChangeSet {
    #[serde(default)]
    pub scenario_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub changes: Vec<ScenarioChange>,
    #[serde(default)]
    pub parent_scenario_id: Option<String>,
}

impl ScenarioChangeSet {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        scenario_id: Option<String>,
    ) -> Self {
        Self {
            scenario_id,
            name: Some(name.into()),
            description: Some(description.into()),
            changes: Vec::new(),
            parent_scenario_id: None,
        }
    }

    pub fn add_change(
        mut self,
        op: ChangeOperation,
        path: impl Into<String>,
        value: Option<Value>,
    ) -> Result<Self> {
        self.changes.push(ScenarioChange::new(op, path, value)?);
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeValidationError {
    pub path: String,
    pub message: String,
    pub change_index: usize,
}

impl ChangeValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>, change_index: usize) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            change_index,
        }
    }
}

impl fmt::Display for ChangeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "change #{} at {}: {}", self.change_index, self.path, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeResult {
    pub success: bool,
    pub changes_applied: usize,
    pub errors: Vec<ChangeValidationError>,
    pub modified_object: Option<Value>,
    pub applied_changes: Vec<ScenarioChange>,
}

impl ChangeResult {
    pub(crate) fn rejected(errors: Vec<ChangeValidationError>, applied_changes: Vec<ScenarioChange>) -> Self {
        Self {
            success: false,
            changes_applied: applied_changes.len(),
            errors,
            modified_object: None,
            applied_changes,
        }
    }

    /// 失敗時轉為 crate 錯誤
    pub fn into_result(self) -> Result<(Value, Vec<ScenarioChange>)> {
        match self.modified_object {
            Some(modified) if self.success => Ok((modified, self.applied_changes)),
            _ => Err(LosError::Scenario {
                errors: self.errors.iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_must_start_with_slash() {
        assert!(ScenarioChange::new(ChangeOperation::Replace, "volume", Some(json!(1))).is_err());
        assert!(ScenarioChange::new(ChangeOperation::Replace, "/volume", Some(json!(1))).is_ok());
    }

    #[test]
    fn test_deserialize_rejects_relative_path() {
        let err = serde_json::from_value::<ScenarioChange>(json!({"op": "remove", "path": "volume"}))
            .unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }

    #[test]
    fn test_fluent_builder() {
        let set = ScenarioChangeSet::new("Build 2030", "Projected volumes", Some("s-1".into()))
            .add_change(ChangeOperation::ModifyVolume, "/volume", Some(json!("*1.1")))
            .unwrap()
            .add_change(ChangeOperation::AddLane, "/lane_groups/0", None)
            .unwrap();

        assert_eq!(set.name.as_deref(), Some("Build 2030"));
        assert_eq!(set.changes.len(), 2);
        assert_eq!(set.changes[1].op, ChangeOperation::AddLane);
    }

    #[test]
    fn test_operation_serde_names() {
        let op: ChangeOperation = serde_json::from_value(json!("modify_timing")).unwrap();
        assert_eq!(op, ChangeOperation::ModifyTiming);
        assert_eq!(op.to_string(), "modify_timing");
    }
}
