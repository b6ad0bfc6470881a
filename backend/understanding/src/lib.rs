pub mod report;
pub mod vision;

pub use report::parse_report;
pub use vision::{CROP_PATHOLOGIST_PROMPT, VisionGateway};
