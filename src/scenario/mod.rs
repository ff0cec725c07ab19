//! 情境變更組：以 JSON Pointer 描述對車道群文件的修改，原子套用並保留稽核紀錄。

pub mod models;
pub mod operations;
pub mod pointer;
pub mod service;
pub mod validation;

pub use models::{
    ChangeOperation, ChangeResult, ChangeValidationError, ScenarioChange, ScenarioChangeSet,
};
pub use pointer::ChangeError;
pub use service::{apply_changes, compute_diff, validate_changes};
