use crate::domain::model::{StudyDefinition, StudyOutcome};
use crate::report::NarrativeOptions;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 研究執行所需的設定，CLI 與 TOML 兩種來源皆實作
pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn max_parallel(&self) -> usize;
    fn output_formats(&self) -> &[String];
    /// 壓縮檔名；`None` 表示不壓縮
    fn archive_name(&self) -> Option<&str>;
    fn narrative_options(&self) -> NarrativeOptions;

    fn wants_format(&self, format: &str) -> bool {
        self.output_formats().iter().any(|f| f == format)
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<StudyDefinition>;
    async fn transform(&self, study: StudyDefinition) -> Result<StudyOutcome>;
    async fn load(&self, outcome: StudyOutcome) -> Result<String>;
}
