use std::path::Path;

use agrolens_core::AnalysisRequest;
use anyhow::{Context, Result, bail};
use bytes::Bytes;
use tracing::{debug, warn};

pub mod mime_detect;

pub use mime_detect::{detect_mime_type, is_image};

/// Read an image from disk into an upload-ready request.
///
/// The MIME type comes from the file extension. Unknown extensions are sent
/// without a declared type so the gateway applies its own default.
pub async fn load_image(path: impl AsRef<Path>) -> Result<AnalysisRequest> {
    let path = path.as_ref();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("not a file path: {}", path.display()))?;

    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("cannot open {}", path.display()))?;
    if !metadata.is_file() {
        bail!("{} is not a regular file", path.display());
    }

    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    debug!(file = %filename, bytes = data.len(), "Loaded image");

    let mut request = AnalysisRequest::new(Bytes::from(data), filename);
    let mime = detect_mime_type(path);
    if is_image(mime) {
        request = request.with_mime_type(mime);
    } else {
        warn!(file = %request.filename, mime, "File does not look like an image; sending without a content type");
    }
    Ok(request)
}
