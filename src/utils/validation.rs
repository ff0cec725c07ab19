use crate::utils::error::{FieldViolation, LosError, Result};
use std::fmt::Display;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(LosError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(LosError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(LosError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LosError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(LosError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Unsupported value. Valid values: {}", allowed.join(", ")),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(LosError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// 收集所有欄位錯誤，一次回報，不在第一個錯誤就中止
#[derive(Debug, Default)]
pub struct Violations {
    items: Vec<FieldViolation>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, value: impl Display, reason: impl Into<String>) {
        self.items.push(FieldViolation::new(field, value, reason));
    }

    fn finite(&mut self, field: &str, value: f64) -> bool {
        if value.is_finite() {
            true
        } else {
            self.push(field, value, "must be a finite number");
            false
        }
    }

    /// min <= value <= max
    pub fn within(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if self.finite(field, value) && (value < min || value > max) {
            self.push(field, value, format!("must be between {} and {}", min, max));
        }
    }

    /// min < value <= max
    pub fn above_up_to(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if self.finite(field, value) && (value <= min || value > max) {
            self.push(field, value, format!("must be greater than {} and at most {}", min, max));
        }
    }

    pub fn at_least(&mut self, field: &str, value: f64, min: f64) {
        if self.finite(field, value) && value < min {
            self.push(field, value, format!("must be >= {}", min));
        }
    }

    pub fn greater_than(&mut self, field: &str, value: f64, min: f64) {
        if self.finite(field, value) && value <= min {
            self.push(field, value, format!("must be > {}", min));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<FieldViolation> {
        self.items
    }

    pub fn finish(self) -> Result<()> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(LosError::InvalidInput { violations: self.items })
        }
    }
}
