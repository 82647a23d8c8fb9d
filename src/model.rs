//! Data models for Qro sin fugas.
//!
//! The central entity is [`Incident`]: a single reported water leak. Its
//! fields are private so that the pairing between `status` and
//! `repaired_at` can only change through [`Incident::transition`].
//!
//! The remaining types are derived views (statistics, zone counts, trend
//! points, heatmap points) that are recomputed from the collection and
//! never stored.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{TransitionError, UnknownStatus};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite and within the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Lifecycle stage of a leak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeakStatus {
    /// Reported and not yet attended.
    Active,
    /// A crew is working on it.
    Repairing,
    /// Fixed. The incident carries a `repaired_at` timestamp.
    Repaired,
}

impl LeakStatus {
    /// Every status, in display order.
    pub const ALL: [LeakStatus; 3] = [
        LeakStatus::Active,
        LeakStatus::Repairing,
        LeakStatus::Repaired,
    ];

    /// Wire/display code, e.g. `"ACTIVE"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeakStatus::Active => "ACTIVE",
            LeakStatus::Repairing => "REPAIRING",
            LeakStatus::Repaired => "REPAIRED",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            LeakStatus::Active => "Active",
            LeakStatus::Repairing => "Repairing",
            LeakStatus::Repaired => "Repaired",
        }
    }

    /// Hex colour used for markers and charts.
    pub fn color(&self) -> &'static str {
        match self {
            LeakStatus::Active => "#ef4444",
            LeakStatus::Repairing => "#eab308",
            LeakStatus::Repaired => "#22c55e",
        }
    }
}

impl fmt::Display for LeakStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeakStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeakStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Qualitative impact rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

/// The sidebar status selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(LeakStatus),
}

impl StatusFilter {
    /// Every selectable filter, in sidebar order.
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Only(LeakStatus::Active),
        StatusFilter::Only(LeakStatus::Repairing),
        StatusFilter::Only(LeakStatus::Repaired),
    ];

    /// Membership predicate.
    pub fn matches(&self, status: LeakStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "ALL",
            StatusFilter::Only(status) => status.as_str(),
        }
    }
}

impl From<LeakStatus> for StatusFilter {
    fn from(status: LeakStatus) -> Self {
        StatusFilter::Only(status)
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ALL") {
            return Ok(StatusFilter::All);
        }
        s.parse::<LeakStatus>().map(StatusFilter::Only)
    }
}

impl Serialize for StatusFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Caller-supplied fields for a new incident.
///
/// Everything except the id and the report timestamp, which are assigned at
/// creation time.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub position: Coordinate,
    pub address: String,
    pub zone: String,
    pub description: String,
    pub reporter_name: String,
    pub severity: Severity,
    pub image_url: String,
}

/// A single reported water leak.
///
/// # Invariants
///
/// - `id`, `position` and `reported_at` never change after creation.
/// - `repaired_at` is `Some` exactly when `status == Repaired`, and is never
///   earlier than `reported_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    id: String,
    position: Coordinate,
    status: LeakStatus,
    address: String,
    zone: String,
    description: String,
    reporter_name: String,
    severity: Severity,
    reported_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repaired_at: Option<DateTime<Utc>>,
    image_url: String,
}

impl Incident {
    /// Create a new, active incident.
    ///
    /// Uniqueness of `id` within a collection is the caller's concern; the
    /// store allocates ids from an [`IdSequence`].
    pub fn new(id: impl Into<String>, fields: NewIncident, reported_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            position: fields.position,
            status: LeakStatus::Active,
            address: fields.address,
            zone: fields.zone,
            description: fields.description,
            reporter_name: fields.reporter_name,
            severity: fields.severity,
            reported_at,
            repaired_at: None,
            image_url: fields.image_url,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Coordinate {
        self.position
    }

    pub fn status(&self) -> LeakStatus {
        self.status
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn reporter_name(&self) -> &str {
        &self.reporter_name
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn reported_at(&self) -> DateTime<Utc> {
        self.reported_at
    }

    pub fn repaired_at(&self) -> Option<DateTime<Utc>> {
        self.repaired_at
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    /// Time from report to repair, for repaired incidents.
    pub fn repair_duration(&self) -> Option<Duration> {
        match (self.status, self.repaired_at) {
            (LeakStatus::Repaired, Some(repaired_at)) => Some(repaired_at - self.reported_at),
            _ => None,
        }
    }

    /// Move the incident to `status` at time `at`.
    ///
    /// Entering `Repaired` stamps `repaired_at = at`; leaving it clears the
    /// stamp. Setting the current status again is a no-op.
    ///
    /// Returns whether anything changed.
    pub fn transition(&mut self, status: LeakStatus, at: DateTime<Utc>) -> Result<bool, TransitionError> {
        if status == self.status {
            return Ok(false);
        }

        if status == LeakStatus::Repaired {
            if at < self.reported_at {
                return Err(TransitionError::RepairBeforeReport(self.id.clone()));
            }
            self.repaired_at = Some(at);
        } else {
            self.repaired_at = None;
        }

        self.status = status;
        Ok(true)
    }
}

/// Allocator for incident ids.
///
/// Ids are `LK-<n>` with a strictly increasing `n`, so an id handed out once
/// is never produced again by the same sequence.
#[derive(Debug, Clone)]
pub struct IdSequence {
    next: u64,
}

/// First sequence number used by seed data.
pub const FIRST_SEQUENCE: u64 = 1000;

impl Default for IdSequence {
    fn default() -> Self {
        Self::starting_at(FIRST_SEQUENCE)
    }
}

impl IdSequence {
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Format the id for sequence number `n`.
    pub fn format(n: u64) -> String {
        format!("LK-{}", n)
    }

    /// Hand out the next id for which `taken` returns false.
    pub fn next_id(&mut self, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = Self::format(self.next);
            self.next += 1;
            if !taken(&id) {
                return id;
            }
        }
    }
}

/// Summary statistics for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub active: usize,
    pub repairing: usize,
    pub repaired: usize,
    /// Mean report-to-repair time in hours; 0 when nothing has been repaired.
    pub avg_repair_time_hours: f64,
}

/// A zone with its incident count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneCount {
    pub zone: String,
    pub count: usize,
}

/// Incidents reported on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    /// Short weekday label, e.g. "Mon".
    pub label: String,
    pub count: usize,
}

/// A weighted point for the heatmap layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lng: f64,
    pub intensity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(reported_at: DateTime<Utc>) -> Incident {
        Incident::new(
            "LK-1",
            NewIncident {
                position: Coordinate::new(20.5888, -100.3899),
                address: "Zaragoza #12".to_string(),
                zone: "Centro Histórico".to_string(),
                description: "Minor dripping.".to_string(),
                reporter_name: "Citizen 1".to_string(),
                severity: Severity::Low,
                image_url: "https://picsum.photos/300/200?random=1".to_string(),
            },
            reported_at,
        )
    }

    #[test]
    fn test_new_incident_is_active_without_repair_stamp() {
        let incident = sample(Utc::now());
        assert_eq!(incident.status(), LeakStatus::Active);
        assert_eq!(incident.repaired_at(), None);
        assert_eq!(incident.repair_duration(), None);
    }

    #[test]
    fn test_transition_into_repaired_stamps_time() {
        let reported = Utc::now();
        let mut incident = sample(reported);
        let repaired = reported + Duration::hours(10);

        assert_eq!(incident.transition(LeakStatus::Repairing, reported), Ok(true));
        assert_eq!(incident.repaired_at(), None);

        assert_eq!(incident.transition(LeakStatus::Repaired, repaired), Ok(true));
        assert_eq!(incident.repaired_at(), Some(repaired));
        assert_eq!(incident.repair_duration(), Some(Duration::hours(10)));
    }

    #[test]
    fn test_transition_out_of_repaired_clears_stamp() {
        let reported = Utc::now();
        let mut incident = sample(reported);
        incident
            .transition(LeakStatus::Repaired, reported + Duration::hours(1))
            .unwrap();

        assert_eq!(incident.transition(LeakStatus::Active, reported), Ok(true));
        assert_eq!(incident.status(), LeakStatus::Active);
        assert_eq!(incident.repaired_at(), None);
    }

    #[test]
    fn test_transition_to_same_status_is_noop() {
        let reported = Utc::now();
        let mut incident = sample(reported);
        incident
            .transition(LeakStatus::Repaired, reported + Duration::hours(3))
            .unwrap();

        assert_eq!(
            incident.transition(LeakStatus::Repaired, reported + Duration::hours(9)),
            Ok(false)
        );
        assert_eq!(incident.repaired_at(), Some(reported + Duration::hours(3)));
    }

    #[test]
    fn test_repair_before_report_rejected() {
        let reported = Utc::now();
        let mut incident = sample(reported);

        let result = incident.transition(LeakStatus::Repaired, reported - Duration::minutes(1));

        assert_eq!(result, Err(TransitionError::RepairBeforeReport("LK-1".to_string())));
        assert_eq!(incident.status(), LeakStatus::Active);
        assert_eq!(incident.repaired_at(), None);
    }

    #[test]
    fn test_status_and_filter_parsing() {
        assert_eq!("ACTIVE".parse::<LeakStatus>(), Ok(LeakStatus::Active));
        assert_eq!("repaired".parse::<LeakStatus>(), Ok(LeakStatus::Repaired));
        assert_eq!("ALL".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!(
            "REPAIRING".parse::<StatusFilter>(),
            Ok(StatusFilter::Only(LeakStatus::Repairing))
        );
        assert!("FLOODED".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        assert!(StatusFilter::All.matches(LeakStatus::Repaired));
        assert!(StatusFilter::Only(LeakStatus::Active).matches(LeakStatus::Active));
        assert!(!StatusFilter::Only(LeakStatus::Active).matches(LeakStatus::Repairing));
    }

    #[test]
    fn test_id_sequence_skips_taken_ids() {
        let mut ids = IdSequence::starting_at(1000);
        let first = ids.next_id(|id| id == "LK-1000" || id == "LK-1001");
        assert_eq!(first, "LK-1002");
        assert_eq!(ids.next_id(|_| false), "LK-1003");
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(20.5888, -100.3899).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert_eq!(
            Coordinate::new(20.5888, -100.3899).to_string(),
            "20.588800, -100.389900"
        );
    }

    #[test]
    fn test_serialization_shape() {
        let incident = sample(Utc::now());
        let json = serde_json::to_value(&incident).unwrap();

        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["severity"], "Low");
        assert!(json.get("repaired_at").is_none());
        assert_eq!(
            serde_json::to_value(StatusFilter::Only(LeakStatus::Repaired)).unwrap(),
            "REPAIRED"
        );
    }
}
