use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

/// 依序執行研究管道的三個階段
pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting intersection LOS study");

        // 讀取研究定義
        tracing::info!("📥 Reading study definition...");
        let study = self.pipeline.extract().await?;
        tracing::info!(
            "Loaded study '{}' with {} lane group(s) and {} scenario(s)",
            study.name,
            study.lane_groups.len(),
            study.scenarios.len()
        );
        self.monitor.log_phase("Extract");

        // 計算
        tracing::info!("🧮 Computing lane groups...");
        let outcome = self.pipeline.transform(study).await?;
        tracing::info!(
            "Computed {} lane group result(s) across {} scenario(s)",
            outcome.lane_group_count(),
            outcome.scenarios.len()
        );
        self.monitor.log_phase("Transform");

        // 輸出
        tracing::info!("💾 Writing results...");
        let output_path = self.pipeline.load(outcome).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_phase("Load");

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
