pub mod error;
pub mod report;
pub mod traits;
pub mod types;

pub use error::{AgroError, Result};
pub use report::{ConfidenceLevel, DiagnosticReport};
pub use traits::ImageAnalyzer;
pub use types::{AnalysisRequest, AnalysisResult, DEFAULT_IMAGE_MIME, UNANALYZED_PREDICTION};
