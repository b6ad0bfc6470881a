//! Structured view of a free-text crop disease analysis.
//!
//! A `DiagnosticReport` is never stored. It is rebuilt from the model's
//! prediction text every time it is displayed.

use serde::{Deserialize, Serialize};

/// Coarse confidence category derived from the model's confidence text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    Unknown,
}

impl ConfidenceLevel {
    /// Classify free text by case-insensitive substring, checking high, medium, low in order.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("high") {
            Self::High
        } else if lower.contains("medium") {
            Self::Medium
        } else if lower.contains("low") {
            Self::Low
        } else {
            Self::Unknown
        }
    }

    /// Display percentage for the bucket. Presentation only.
    pub fn percentage(self) -> Option<&'static str> {
        match self {
            Self::High => Some("95%"),
            Self::Medium => Some("75%"),
            Self::Low => Some("50%"),
            Self::Unknown => None,
        }
    }
}

/// Diagnostic fields extracted from a model answer. Every field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub disease: String,
    pub confidence: String,
    pub symptoms: Vec<String>,
    pub treatment: String,
    pub prevention: String,
}

impl DiagnosticReport {
    /// True when the diagnosis mentions "healthy" in any case.
    pub fn is_healthy(&self) -> bool {
        self.disease.to_lowercase().contains("healthy")
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::classify(&self.confidence)
    }

    /// "95%" / "75%" / "50%" for recognised levels, otherwise the confidence text unchanged.
    pub fn confidence_display(&self) -> String {
        match self.confidence_level().percentage() {
            Some(pct) => pct.to_string(),
            None => self.confidence.clone(),
        }
    }

    /// Parsing is considered failed when neither a disease nor a treatment was found.
    /// Callers show the raw prediction text instead.
    pub fn is_unparsed(&self) -> bool {
        self.disease.is_empty() && self.treatment.is_empty()
    }
}
