//! Report parser: pulls diagnostic fields out of a model's free-text answer.
//!
//! The model is asked for five bold, numbered sections but nothing forces it
//! to comply, so every field is optional and the parser never fails.

use agrolens_core::DiagnosticReport;
use once_cell::sync::Lazy;
use regex::Regex;

// --- Compiled regexes ---

const DISEASE: &str = "Disease/Condition";
const CONFIDENCE: &str = "Confidence";
const SYMPTOMS: &str = "Symptoms Observed";
const TREATMENT: &str = "Recommended Treatment";
const PREVENTION: &str = "Prevention Tips";

const LABELS: [&str; 5] = [DISEASE, CONFIDENCE, SYMPTOMS, TREATMENT, PREVENTION];

static DISEASE_RE: Lazy<Regex> = Lazy::new(|| line_marker(DISEASE));

static CONFIDENCE_RE: Lazy<Regex> = Lazy::new(|| line_marker(CONFIDENCE));

static SYMPTOMS_RE: Lazy<Regex> = Lazy::new(|| section_marker(SYMPTOMS));

static TREATMENT_RE: Lazy<Regex> = Lazy::new(|| section_marker(TREATMENT));

static PREVENTION_RE: Lazy<Regex> = Lazy::new(|| section_marker(PREVENTION));

/// Dash or bullet (plus trailing whitespace), or a line break.
static SYMPTOM_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-•]\s*|\n").unwrap());

/// A label at the start of a line, optionally numbered (`3.`) and bold.
fn header(label: &str) -> String {
    format!(
        r"^[ \t]*(?:\d+\.[ \t]*)?(?:\*\*)?{}(?:\*\*)?:",
        regex::escape(label)
    )
}

/// Header followed by the rest of its line, or of the next line when the
/// header line is otherwise empty.
fn line_marker(label: &str) -> Regex {
    let pattern = format!(r"(?im){}\s*(.+?)[ \t]*$", header(label));
    Regex::new(&pattern).unwrap()
}

/// Header followed by everything up to the next numbered item, bold
/// header, known section label, or end of input. Spans lines.
fn section_marker(label: &str) -> Regex {
    let known = LABELS
        .iter()
        .map(|l| regex::escape(l))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(
        r"(?ims){}\s*(.+?)(?:\n[ \t]*\d+\.|\n[ \t]*\*\*|\n[ \t]*(?:{}):|\z)",
        header(label),
        known
    );
    Regex::new(&pattern).unwrap()
}

fn capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn split_symptoms(block: &str) -> Vec<String> {
    SYMPTOM_SPLIT_RE
        .split(block)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with("**"))
        .map(str::to_string)
        .collect()
}

/// Parse a model answer into a `DiagnosticReport`.
///
/// Pure and total: the same text always yields the same report, and a
/// missing section just leaves its field empty.
pub fn parse_report(text: &str) -> DiagnosticReport {
    let symptoms_block = capture(&SYMPTOMS_RE, text);

    DiagnosticReport {
        disease: capture(&DISEASE_RE, text),
        confidence: capture(&CONFIDENCE_RE, text),
        symptoms: split_symptoms(&symptoms_block),
        treatment: capture(&TREATMENT_RE, text),
        prevention: capture(&PREVENTION_RE, text),
    }
}
