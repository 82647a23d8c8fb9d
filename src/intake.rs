//! Report intake: validation and defaults for citizen leak reports.
//!
//! A report consists of a map coordinate (captured by clicking the map while
//! in reporting mode) plus a free-text address and description. Everything
//! else about the new incident is a fixed default, because there is no
//! geocoding, no reporter identity and no upload pipeline.

use std::str::FromStr;

use crate::error::IntakeError;
use crate::model::{Coordinate, NewIncident, Severity};

/// Zone assigned to every citizen report until geocoding exists.
pub const REPORTED_ZONE: &str = "Reported Zone";

/// Reporter name assigned to every citizen report.
pub const ANONYMOUS_REPORTER: &str = "Anonymous User";

/// Severity assigned to every citizen report.
pub const DEFAULT_SEVERITY: Severity = Severity::Medium;

pub const ADDRESS_PLACEHOLDER: &str = "Address not provided";
pub const DESCRIPTION_PLACEHOLDER: &str = "No description provided";

/// What to do when a required text field is blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyFieldPolicy {
    /// Refuse the report with an [`IntakeError`].
    #[default]
    Reject,
    /// Accept the report and fill in a placeholder string.
    Substitute,
}

impl FromStr for EmptyFieldPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(EmptyFieldPolicy::Reject),
            "substitute" => Ok(EmptyFieldPolicy::Substitute),
            other => Err(format!("unknown empty-field policy '{}'", other)),
        }
    }
}

/// Validate user input and build the fields of a new incident.
///
/// Text is trimmed. A blank address or description is handled according to
/// `policy`. The returned fields carry an empty `image_url`; the store fills
/// it in once the incident id is known (see [`evidence_image_url`]).
pub fn prepare_report(
    coordinate: Coordinate,
    address: &str,
    description: &str,
    policy: EmptyFieldPolicy,
) -> Result<NewIncident, IntakeError> {
    if !coordinate.is_valid() {
        return Err(IntakeError::InvalidCoordinate {
            lat: coordinate.lat,
            lng: coordinate.lng,
        });
    }

    let address = required_text(address, ADDRESS_PLACEHOLDER, policy)
        .ok_or(IntakeError::EmptyAddress)?;
    let description = required_text(description, DESCRIPTION_PLACEHOLDER, policy)
        .ok_or(IntakeError::EmptyDescription)?;

    Ok(NewIncident {
        position: coordinate,
        address,
        zone: REPORTED_ZONE.to_string(),
        description,
        reporter_name: ANONYMOUS_REPORTER.to_string(),
        severity: DEFAULT_SEVERITY,
        image_url: String::new(),
    })
}

/// Placeholder evidence image for an incident.
pub fn evidence_image_url(incident_id: &str) -> String {
    format!(
        "https://picsum.photos/300/200?random={}",
        urlencoding::encode(incident_id)
    )
}

fn required_text(value: &str, placeholder: &str, policy: EmptyFieldPolicy) -> Option<String> {
    let trimmed = value.trim();
    if !trimmed.is_empty() {
        return Some(trimmed.to_string());
    }
    match policy {
        EmptyFieldPolicy::Reject => None,
        EmptyFieldPolicy::Substitute => Some(placeholder.to_string()),
    }
}
