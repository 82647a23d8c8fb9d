//! External text-generation service for the dashboard summary.
//!
//! The service turns a [`SummaryRequest`] into a short executive summary.
//! Its contract is that it never fails: a missing credential, a network
//! error or an empty answer all come back as a human-readable message, which
//! the dashboard shows like any other summary text.
//!
//! # Services
//!
//! - [`gemini`]: Google Gemini `generateContent` REST API

pub mod gemini;

pub use gemini::GeminiClient;

use std::future::Future;

use crate::dashboard::SummaryRequest;

/// Shown when no API key is configured.
pub const MISSING_KEY_MESSAGE: &str =
    "API Key not configured. Please set SINFUGAS_GEMINI_API_KEY to use AI insights.";

/// Shown when the request fails for any reason.
pub const UNAVAILABLE_MESSAGE: &str =
    "Unable to generate AI analysis at this time. Please try again later.";

/// Shown when the service answers without any text.
pub const EMPTY_MESSAGE: &str = "No analysis generated.";

/// A collaborator that writes prose about the current incident statistics.
pub trait SummaryService {
    /// Produce summary text. Failures are reported as fallback text, never
    /// as an error.
    fn summarize(&self, request: &SummaryRequest) -> impl Future<Output = String> + Send;
}

/// Render the prompt sent to the text-generation model.
pub fn build_prompt(request: &SummaryRequest) -> String {
    let stats = &request.stats;

    let sample = if request.sample.is_empty() {
        "- (no active incidents)".to_string()
    } else {
        request
            .sample
            .iter()
            .map(|s| format!("- [{}] {} (Severity: {})", s.status, s.address, s.severity.label()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are an expert urban infrastructure analyst for the city of Querétaro, Mexico.\n\
         Analyze the following water leak data for the \"Qro sin fugas\" dashboard.\n\
         \n\
         Statistics:\n\
         - Total Incidents: {}\n\
         - Active Leaks: {}\n\
         - Under Repair: {}\n\
         - Repaired: {}\n\
         - Average Repair Time: {:.1} hours\n\
         \n\
         Active Incident Sample (up to {}):\n\
         {}\n\
         \n\
         Provide a concise, professional executive summary (max 150 words) focusing on \
         efficiency trends, critical zones, and recommended actions. \
         Use a formal but modern tone. Format as Markdown.",
        stats.total,
        stats.active,
        stats.repairing,
        stats.repaired,
        stats.avg_repair_time_hours,
        crate::dashboard::SUMMARY_SAMPLE_SIZE,
        sample
    )
}
