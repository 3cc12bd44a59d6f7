use crate::core::Pipeline;
use crate::utils::error::Result;

/// Drives a pipeline through extract, transform and load.
pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting PAR build...");

        tracing::info!("📥 Extracting tables...");
        let tables = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} tables ({} rows)",
            tables.len(),
            tables.total_rows()
        );

        tracing::info!("🔄 Rendering report...");
        let output = self.pipeline.transform(tables).await?;
        let summary = &output.summary;
        tracing::info!(
            "Rendered {} offerings, {} developments, {} current and {} graduated advisees, {} publications",
            summary.offerings,
            summary.developments,
            summary.current_advisees,
            summary.graduated_advisees,
            summary.publications
        );

        tracing::info!("💾 Writing output...");
        let output_path = self.pipeline.load(output).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}
