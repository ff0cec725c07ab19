pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use args::CliConfig;

pub const SUPPORTED_FORMATS: [&str; 3] = ["json", "csv", "md"];

#[cfg(feature = "cli")]
mod args {
    use super::SUPPORTED_FORMATS;
    use crate::core::ConfigProvider;
    use crate::hcm::LevelOfService;
    use crate::report::NarrativeOptions;
    use crate::utils::error::Result;
    use crate::utils::validation::{
        validate_non_empty_string, validate_one_of, validate_path, validate_positive_number,
        validate_range, Validate,
    };
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "intersection-los")]
    #[command(about = "HCM signalized intersection level-of-service studies")]
    pub struct CliConfig {
        /// Study definition (JSON)
        #[arg(short, long, default_value = "study.json")]
        pub input: String,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        #[arg(long, default_value = "4")]
        pub max_parallel: usize,

        #[arg(long, value_delimiter = ',', default_value = "json,csv,md")]
        pub formats: Vec<String>,

        /// Bundle all outputs into a single zip archive
        #[arg(long)]
        pub compress: bool,

        #[arg(long, default_value = "study_results.zip")]
        pub archive_name: String,

        /// Worst acceptable LOS for the compliance statement (A-F)
        #[arg(long)]
        pub threshold_los: Option<LevelOfService>,

        #[arg(long)]
        pub threshold_vc: Option<f64>,

        #[arg(long)]
        pub jurisdiction: Option<String>,

        #[arg(long)]
        pub include_lane_groups: bool,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log process memory and phase timings")]
        pub monitor: bool,

        #[arg(long, help = "Emit JSON log lines")]
        pub json_logs: bool,
    }

    impl ConfigProvider for CliConfig {
        fn input_path(&self) -> &str {
            &self.input
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn max_parallel(&self) -> usize {
            self.max_parallel
        }

        fn output_formats(&self) -> &[String] {
            &self.formats
        }

        fn archive_name(&self) -> Option<&str> {
            self.compress.then_some(self.archive_name.as_str())
        }

        fn narrative_options(&self) -> NarrativeOptions {
            NarrativeOptions {
                threshold_los: self.threshold_los,
                threshold_vc: self.threshold_vc,
                jurisdiction: self.jurisdiction.clone(),
                include_lane_groups: self.include_lane_groups,
            }
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_path("input", &self.input)?;
            validate_path("output_path", &self.output_path)?;
            validate_positive_number("max_parallel", self.max_parallel, 1)?;

            for format in &self.formats {
                validate_one_of("formats", format, &SUPPORTED_FORMATS)?;
            }
            if self.compress {
                validate_non_empty_string("archive_name", &self.archive_name)?;
            }
            if let Some(vc) = self.threshold_vc {
                validate_range("threshold_vc", vc, 0.01, 5.0)?;
            }
            Ok(())
        }
    }

}
