//! Terminal rendering of a crop analysis result.

use std::fmt::Write;

use agrolens_core::{AnalysisResult, DiagnosticReport};
use agrolens_understanding::parse_report;
use chrono::NaiveDateTime;

use crate::terminal_output::{Style, BOLD, CYAN, DIM, GREEN, RED, YELLOW};

/// Title from an upload filename: extension dropped, `-`/`_` as spaces, words capitalised.
pub fn display_title(filename: &str) -> String {
    let stem = match filename.rfind('.') {
        Some(idx) if !filename[idx + 1..].is_empty() && !filename[idx + 1..].contains('/') => {
            &filename[..idx]
        }
        _ => filename,
    };
    let title = stem
        .replace(['-', '_'], " ")
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    if title.trim().is_empty() {
        "Crop Analysis".to_string()
    } else {
        title
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Render the analysis card. The report is re-parsed from the prediction on every call.
pub fn render_result(result: &AnalysisResult, at: NaiveDateTime, style: Style) -> String {
    let report = parse_report(&result.prediction);
    render_report(result, &report, at, style)
}

fn render_report(
    result: &AnalysisResult,
    report: &DiagnosticReport,
    at: NaiveDateTime,
    style: Style,
) -> String {
    let mut out = String::new();
    let healthy = report.is_healthy();

    let badge = if healthy {
        style.paint(GREEN, "[Healthy]")
    } else {
        style.paint(RED, "[Disease Detected]")
    };
    let _ = writeln!(
        out,
        "{}  {}",
        style.paint(BOLD, &display_title(&result.filename)),
        badge
    );
    let _ = writeln!(
        out,
        "{}",
        style.paint(DIM, &format!("⏱ {}", at.format("%b %-d, %Y at %-I:%M %p")))
    );

    let disease = if report.disease.is_empty() {
        "Unknown"
    } else {
        report.disease.as_str()
    };
    let diagnosis_color = if healthy { GREEN } else { RED };
    let _ = write!(out, "\nDiagnosis: {}", style.paint(diagnosis_color, disease));
    if !report.confidence.is_empty() {
        let _ = write!(out, " - {} confidence", report.confidence_display());
    }
    out.push('\n');

    if !report.symptoms.is_empty() {
        let _ = writeln!(out, "\n{}", style.paint(BOLD, "Symptoms Identified:"));
        for symptom in &report.symptoms {
            let _ = writeln!(out, "  {} {symptom}", style.paint(CYAN, "•"));
        }
    }

    if !report.treatment.is_empty() {
        let _ = writeln!(out, "\n{}", style.paint(BOLD, "Treatment:"));
        let _ = writeln!(out, "{}", indent(&report.treatment));
        if !report.prevention.is_empty() {
            let _ = writeln!(out, "\n{}", style.paint(BOLD, "Prevention:"));
            let _ = writeln!(out, "{}", indent(&report.prevention));
        }
    }

    if report.is_unparsed() {
        let _ = writeln!(out, "\n{}", style.paint(YELLOW, "Raw analysis:"));
        let _ = writeln!(out, "{}", result.prediction);
    }

    out
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
