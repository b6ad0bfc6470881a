use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// MIME type assumed when an upload does not declare one.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Prediction text used when the model (or the gateway) returns nothing usable.
pub const UNANALYZED_PREDICTION: &str = "Unable to analyze image";

/// One image on its way to the analyzer. Lives for a single upload call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image_bytes: Bytes,
    pub filename: String,
    /// Declared content type, if the uploader supplied one.
    pub mime_type: Option<String>,
}

impl AnalysisRequest {
    pub fn new(image_bytes: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        Self {
            image_bytes: image_bytes.into(),
            filename: filename.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// The declared MIME type, or `image/jpeg` when absent or blank.
    pub fn effective_mime_type(&self) -> &str {
        match self.mime_type.as_deref() {
            Some(mime) if !mime.trim().is_empty() => mime,
            _ => DEFAULT_IMAGE_MIME,
        }
    }
}

/// Outcome of a crop-detect call, as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub filename: String,
    pub prediction: String,
    pub success: bool,
}

impl AnalysisResult {
    pub fn success(filename: impl Into<String>, prediction: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            prediction: prediction.into(),
            success: true,
        }
    }
}
