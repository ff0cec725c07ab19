use crate::config::SUPPORTED_FORMATS;
use crate::core::ConfigProvider;
use crate::hcm::LevelOfService;
use crate::report::NarrativeOptions;
use crate::utils::error::{LosError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_path, validate_positive_number,
    validate_range, Validate,
};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    pub study: StudySection,
    #[serde(default)]
    pub engine: EngineSection,
    pub output: OutputSection,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub monitoring: MonitoringSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySection {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 研究定義 JSON 檔路徑
    pub input: String,
}

fn default_max_parallel() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
        }
    }
}

fn default_formats() -> Vec<String> {
    SUPPORTED_FORMATS.iter().map(|f| f.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    pub path: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    #[serde(default)]
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSection {
    #[serde(default)]
    pub threshold_los: Option<LevelOfService>,
    #[serde(default)]
    pub threshold_vc: Option<f64>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub include_lane_groups: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringSection {
    #[serde(default)]
    pub enabled: bool,
}

impl StudyConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    /// 替換環境變數 (例如 ${STUDY_DIR})；未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LosError::internal(e.to_string()))?;

        let result = re.replace_all(content, |caps: &Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("study.name", &self.study.name)?;
        validate_path("study.input", &self.study.input)?;
        validate_path("output.path", &self.output.path)?;
        validate_positive_number("engine.max_parallel", self.engine.max_parallel, 1)?;

        for format in &self.output.formats {
            validate_one_of("output.formats", format, &SUPPORTED_FORMATS)?;
        }

        if let Some(compression) = self.output.compression.as_ref().filter(|c| c.enabled) {
            validate_non_empty_string("output.compression.filename", &compression.filename)?;
        }

        if let Some(vc) = self.report.threshold_vc {
            validate_range("report.threshold_vc", vc, 0.01, 5.0)?;
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl ConfigProvider for StudyConfig {
    fn input_path(&self) -> &str {
        &self.study.input
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn max_parallel(&self) -> usize {
        self.engine.max_parallel
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn archive_name(&self) -> Option<&str> {
        self.output
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_str())
    }

    fn narrative_options(&self) -> NarrativeOptions {
        NarrativeOptions {
            threshold_los: self.report.threshold_los,
            threshold_vc: self.report.threshold_vc,
            jurisdiction: self.report.jurisdiction.clone(),
            include_lane_groups: self.report.include_lane_groups,
        }
    }
}

impl Validate for StudyConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[study]
name = "Riverside Commons TIS"
description = "PM peak impact study"
input = "studies/riverside.json"

[engine]
max_parallel = 8

[output]
path = "./reports"
formats = ["json", "md"]
compression = { enabled = true, filename = "riverside.zip" }

[report]
threshold_los = "D"
threshold_vc = 0.95
jurisdiction = "City of Springfield"

[monitoring]
enabled = true
"#;

        let config = StudyConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.study.name, "Riverside Commons TIS");
        assert_eq!(config.max_parallel(), 8);
        assert_eq!(config.archive_name(), Some("riverside.zip"));
        assert!(config.monitoring_enabled());
        assert!(!config.wants_format("csv"));

        let options = config.narrative_options();
        assert_eq!(options.threshold_los, Some(LevelOfService::D));
        assert_eq!(options.jurisdiction.as_deref(), Some("City of Springfield"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = StudyConfig::from_toml_str(
            r#"
[study]
name = "minimal"
input = "study.json"

[output]
path = "./output"
"#,
        )
        .unwrap();

        assert_eq!(config.max_parallel(), 4);
        assert_eq!(config.output.formats, vec!["json", "csv", "md"]);
        assert_eq!(config.archive_name(), None);
        assert!(!config.monitoring_enabled());
        assert_eq!(config.narrative_options(), NarrativeOptions::default());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LOS_TEST_STUDY_DIR", "/data/studies");

        let config = StudyConfig::from_toml_str(
            r#"
[study]
name = "env"
input = "${LOS_TEST_STUDY_DIR}/main.json"

[output]
path = "${LOS_TEST_UNSET_VAR}/out"
"#,
        )
        .unwrap();

        assert_eq!(config.study.input, "/data/studies/main.json");
        assert_eq!(config.output.path, "${LOS_TEST_UNSET_VAR}/out");

        std::env::remove_var("LOS_TEST_STUDY_DIR");
    }

    #[test]
    fn test_config_validation() {
        let config = StudyConfig::from_toml_str(
            r#"
[study]
name = "bad"
input = "study.json"

[engine]
max_parallel = 0

[output]
path = "./output"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = StudyConfig::from_toml_str(
            r#"
[study]
name = "bad"
input = "study.json"

[output]
path = "./output"
formats = ["pdf"]
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = StudyConfig::from_toml_str("[study\nname = ").unwrap_err();
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::Configuration);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(
                br#"
[study]
name = "file-test"
input = "study.json"

[output]
path = "./output"
"#,
            )
            .unwrap();

        let config = StudyConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.study.name, "file-test");
    }
}
