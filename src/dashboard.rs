//! Operational dashboard: statistics snapshot and the AI summary session.
//!
//! The snapshot is rebuilt from the incident collection every time the
//! dashboard is rendered. The prose summary is the only asynchronous piece of
//! the system. It runs at most once per dashboard session:
//!
//! ```text
//! NotStarted --begin_summary--> InFlight --complete_summary--> Completed(text)
//! ```
//!
//! The trigger is refused unless the session is `NotStarted`, so two requests
//! can never be in flight for the same session. Closing the dashboard ends the
//! session; a result that arrives afterwards is dropped.
//!
//! # Usage
//!
//! ```ignore
//! let store = Mutex::new(store);
//! store.lock()?.open_dashboard();
//! let text = generate_summary(&store, &gemini).await;
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregation::{compute_stats, compute_trend, compute_zone_ranking};
use crate::model::{DashboardStats, Incident, LeakStatus, Severity, TrendPoint, ZoneCount};
use crate::store::IncidentStore;
use crate::summary::SummaryService;

/// Maximum number of active incidents sent along with the statistics.
pub const SUMMARY_SAMPLE_SIZE: usize = 3;

/// Progress of the summary request for one dashboard session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum SummaryState {
    #[default]
    NotStarted,
    InFlight,
    /// Finished. Holds either generated prose or a fallback message.
    Completed(String),
}

impl SummaryState {
    /// Whether the "Generate Report" trigger should be offered.
    pub fn can_start(&self) -> bool {
        matches!(self, SummaryState::NotStarted)
    }
}

/// One slice of the status distribution chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSlice {
    pub status: LeakStatus,
    pub name: &'static str,
    pub value: usize,
    pub color: &'static str,
}

/// Everything the dashboard charts need, computed from one collection snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// When this snapshot was built.
    pub generated_at: DateTime<Utc>,

    /// KPI cards.
    pub stats: DashboardStats,

    /// Status distribution, in Active/Repairing/Repaired order.
    pub status_distribution: Vec<StatusSlice>,

    /// Zones with the most incidents.
    pub top_zones: Vec<ZoneCount>,

    /// Daily report counts for the trailing week.
    pub trend: Vec<TrendPoint>,
}

impl DashboardSnapshot {
    /// Build the snapshot for `incidents` as of `now`.
    pub fn build(incidents: &[Incident], top_zones: usize, now: DateTime<Utc>) -> Self {
        let stats = compute_stats(incidents);

        let status_distribution = LeakStatus::ALL
            .into_iter()
            .map(|status| StatusSlice {
                status,
                name: status.label(),
                value: match status {
                    LeakStatus::Active => stats.active,
                    LeakStatus::Repairing => stats.repairing,
                    LeakStatus::Repaired => stats.repaired,
                },
                color: status.color(),
            })
            .collect();

        Self {
            generated_at: now,
            status_distribution,
            top_zones: compute_zone_ranking(incidents, top_zones),
            trend: compute_trend(incidents, now.date_naive()),
            stats,
        }
    }
}

/// The dashboard overlay: snapshot plus the summary panel state.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub snapshot: DashboardSnapshot,
    pub summary: SummaryState,
}

/// The fields of an incident shared with the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentSample {
    pub address: String,
    pub severity: Severity,
    pub status: LeakStatus,
}

/// Payload for one summary request.
///
/// Owns copies of everything it needs, so the collection can keep changing
/// while the request is in flight.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRequest {
    #[serde(skip)]
    session: u64,
    pub stats: DashboardStats,
    pub sample: Vec<IncidentSample>,
}

impl SummaryRequest {
    /// Build a request for `incidents`: full statistics plus the first few
    /// active incidents.
    pub fn new(session: u64, incidents: &[Incident]) -> Self {
        let sample = incidents
            .iter()
            .filter(|incident| incident.status() == LeakStatus::Active)
            .take(SUMMARY_SAMPLE_SIZE)
            .map(|incident| IncidentSample {
                address: incident.address().to_string(),
                severity: incident.severity(),
                status: incident.status(),
            })
            .collect();

        Self {
            session,
            stats: compute_stats(incidents),
            sample,
        }
    }

    /// The dashboard session this request belongs to.
    pub fn session(&self) -> u64 {
        self.session
    }
}

/// Run the summary request for the open dashboard session.
///
/// The store is locked only to start and to finish the request, never while
/// the service is working, so other events (filter changes, closing the
/// dashboard) are handled in the meantime. If the returned future is dropped
/// before the service answers, the session goes back to `NotStarted` and the
/// trigger is offered again.
///
/// # Arguments
///
/// * `store` - The shared incident store
/// * `service` - Text-generation service
///
/// # Returns
///
/// The text stored in the session, or `None` when the trigger was refused
/// (dashboard closed, request already in flight or completed) or the session
/// ended before the service answered.
pub async fn generate_summary<S: SummaryService>(
    store: &Mutex<IncidentStore>,
    service: &S,
) -> Option<String> {
    let request = lock(store).begin_summary()?;
    let session = request.session();
    info!(
        session,
        total = request.stats.total,
        sample = request.sample.len(),
        "Requesting dashboard summary"
    );

    let mut pending = PendingSummary {
        store,
        session,
        finished: false,
    };
    let text = service.summarize(&request).await;
    pending.finished = true;

    if lock(store).complete_summary(session, text.clone()) {
        Some(text)
    } else {
        debug!(session, "Summary arrived after session ended");
        None
    }
}

/// Abandons the request of `session` when dropped before it finished.
struct PendingSummary<'a> {
    store: &'a Mutex<IncidentStore>,
    session: u64,
    finished: bool,
}

impl Drop for PendingSummary<'_> {
    fn drop(&mut self) {
        if !self.finished {
            lock(self.store).abandon_summary(self.session);
        }
    }
}

/// Lock the store, recovering from poisoning.
fn lock(store: &Mutex<IncidentStore>) -> MutexGuard<'_, IncidentStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
