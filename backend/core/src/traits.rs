use async_trait::async_trait;

use crate::error::Result;
use crate::types::AnalysisRequest;

/// Anything that can turn a crop image into a free-text disease analysis.
///
/// The gateway service holds one of these; production uses the multimodal
/// completion client, tests plug in a stub.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Analyzer name for logs (e.g., "ai-gateway").
    fn name(&self) -> &str;

    /// Analyze one image and return the model's raw text answer.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String>;
}
