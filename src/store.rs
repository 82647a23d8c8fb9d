//! The incident store: the single owner of all mutable dashboard state.
//!
//! It holds the incident collection (newest first), the sidebar filter, the
//! map layer and the interaction mode. Views borrow it immutably; every
//! mutation goes through a method here, which is where the mode rules are
//! enforced:
//!
//! - `Reporting` clears any selection, turns the heatmap off, refuses
//!   selection and refuses opening the dashboard.
//! - The heatmap layer refuses selection (heat blobs are not clickable).
//! - The dashboard overlay refuses selection.
//!
//! Methods that can be refused return `bool` (whether the change happened)
//! and log the refusal at debug level.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dashboard::{SummaryRequest, SummaryState};
use crate::error::{IntakeError, TransitionError};
use crate::filter::{apply_filter, resolve_selection};
use crate::intake::{EmptyFieldPolicy, evidence_image_url, prepare_report};
use crate::model::{Coordinate, FIRST_SEQUENCE, IdSequence, Incident, LeakStatus, StatusFilter};

/// Which visual variant the map is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapLayer {
    #[default]
    Standard,
    /// Tilted 3D perspective. Markers remain clickable.
    Perspective3d,
    /// Aggregated heat blobs instead of markers.
    Heatmap,
}

/// Mutually exclusive interaction modes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionMode {
    /// Browsing the map and list with nothing selected.
    #[default]
    Idle,
    /// Waiting for a map click (then a form) to report a new leak.
    Reporting { pending: Option<Coordinate> },
    /// The detail panel is open for an incident id.
    DetailOpen { id: String },
    /// The statistics overlay is open.
    DashboardOpen { session: u64, summary: SummaryState },
}

/// Events emitted by the map collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// A click on empty map area.
    Click(Coordinate),
    /// A click on an incident marker.
    MarkerClick(String),
}

/// Owner of the incident collection and the interaction state.
#[derive(Debug, Clone)]
pub struct IncidentStore {
    incidents: Vec<Incident>,
    ids: IdSequence,
    filter: StatusFilter,
    layer: MapLayer,
    mode: InteractionMode,
    empty_fields: EmptyFieldPolicy,
    dashboard_sessions: u64,
}

impl Default for IncidentStore {
    fn default() -> Self {
        Self::new(EmptyFieldPolicy::default())
    }
}

impl IncidentStore {
    /// An empty store.
    pub fn new(empty_fields: EmptyFieldPolicy) -> Self {
        Self {
            incidents: Vec::new(),
            ids: IdSequence::starting_at(first_free_sequence(0)),
            filter: StatusFilter::default(),
            layer: MapLayer::default(),
            mode: InteractionMode::default(),
            empty_fields,
            dashboard_sessions: 0,
        }
    }

    /// A store seeded with an existing collection (newest first).
    ///
    /// Incidents whose id already appeared earlier in `incidents` are
    /// dropped. New ids continue after the seed so they never collide.
    pub fn with_incidents(incidents: Vec<Incident>, empty_fields: EmptyFieldPolicy) -> Self {
        let mut store = Self::new(empty_fields);
        for incident in incidents {
            if store.get(incident.id()).is_some() {
                warn!(id = %incident.id(), "Dropping seed incident with duplicate id");
                continue;
            }
            store.incidents.push(incident);
        }
        store.ids = IdSequence::starting_at(first_free_sequence(store.incidents.len()));
        store
    }

    /// All incidents, newest first.
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Incident> {
        resolve_selection(&self.incidents, id)
    }

    pub fn empty_field_policy(&self) -> EmptyFieldPolicy {
        self.empty_fields
    }

    // ========================================================================
    // Filter
    // ========================================================================

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        debug!(filter = filter.as_str(), "Filter changed");
        self.filter = filter;
    }

    /// Incidents passing the current filter, in collection order.
    pub fn visible(&self) -> Vec<&Incident> {
        apply_filter(&self.incidents, self.filter)
    }

    // ========================================================================
    // Modes and selection
    // ========================================================================

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn layer(&self) -> MapLayer {
        self.layer
    }

    pub fn is_reporting(&self) -> bool {
        matches!(self.mode, InteractionMode::Reporting { .. })
    }

    /// The selected id, which may no longer resolve to an incident.
    pub fn selected_id(&self) -> Option<&str> {
        match &self.mode {
            InteractionMode::DetailOpen { id } => Some(id),
            _ => None,
        }
    }

    /// The selected incident, or `None` when nothing is selected or the id is stale.
    pub fn selected(&self) -> Option<&Incident> {
        self.selected_id()
            .and_then(|id| resolve_selection(&self.incidents, id))
    }

    /// Select an incident by id and open its detail panel.
    ///
    /// Refused while reporting, while the dashboard is open, and in the
    /// heatmap layer.
    pub fn select(&mut self, id: &str) -> bool {
        if self.layer == MapLayer::Heatmap {
            debug!(id, "Selection ignored in heatmap layer");
            return false;
        }
        match self.mode {
            InteractionMode::Reporting { .. } | InteractionMode::DashboardOpen { .. } => {
                debug!(id, "Selection ignored in current mode");
                false
            }
            InteractionMode::Idle | InteractionMode::DetailOpen { .. } => {
                info!(id, "Incident selected");
                self.mode = InteractionMode::DetailOpen { id: id.to_string() };
                true
            }
        }
    }

    /// Close the detail panel. No effect in other modes.
    pub fn clear_selection(&mut self) {
        if matches!(self.mode, InteractionMode::DetailOpen { .. }) {
            debug!("Selection cleared");
            self.mode = InteractionMode::Idle;
        }
    }

    /// Switch between the standard and heatmap layers.
    ///
    /// Entering the heatmap drops the current selection. Refused while
    /// reporting.
    pub fn toggle_heatmap(&mut self) -> bool {
        if self.is_reporting() {
            return false;
        }
        self.layer = if self.layer == MapLayer::Heatmap {
            MapLayer::Standard
        } else {
            self.clear_selection();
            MapLayer::Heatmap
        };
        debug!(layer = ?self.layer, "Map layer changed");
        true
    }

    /// Switch between the standard and 3D perspective layers. Refused while reporting.
    pub fn toggle_perspective(&mut self) -> bool {
        if self.is_reporting() {
            return false;
        }
        self.layer = if self.layer == MapLayer::Perspective3d {
            MapLayer::Standard
        } else {
            MapLayer::Perspective3d
        };
        debug!(layer = ?self.layer, "Map layer changed");
        true
    }

    /// Feed an event from the map collaborator.
    ///
    /// Returns whether the state changed.
    pub fn handle_map_event(&mut self, event: MapEvent) -> bool {
        match event {
            MapEvent::Click(coordinate) => self.capture_location(coordinate),
            MapEvent::MarkerClick(id) => self.select(&id),
        }
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    /// Enter reporting mode from any mode.
    pub fn begin_reporting(&mut self) {
        if self.layer == MapLayer::Heatmap {
            self.layer = MapLayer::Standard;
        }
        if !self.is_reporting() {
            info!("Reporting mode entered");
            self.mode = InteractionMode::Reporting { pending: None };
        }
    }

    /// Record where the new leak is. Only meaningful while reporting.
    pub fn capture_location(&mut self, coordinate: Coordinate) -> bool {
        match &mut self.mode {
            InteractionMode::Reporting { pending } if coordinate.is_valid() => {
                debug!(lat = coordinate.lat, lng = coordinate.lng, "Report location captured");
                *pending = Some(coordinate);
                true
            }
            InteractionMode::Reporting { .. } => {
                warn!(lat = coordinate.lat, lng = coordinate.lng, "Ignoring invalid map coordinate");
                false
            }
            _ => false,
        }
    }

    /// The coordinate captured for the report being filed, if any.
    pub fn pending_location(&self) -> Option<Coordinate> {
        match &self.mode {
            InteractionMode::Reporting { pending } => *pending,
            _ => None,
        }
    }

    /// Leave reporting mode and discard the pending coordinate.
    pub fn cancel_reporting(&mut self) {
        if self.is_reporting() {
            info!("Reporting cancelled");
            self.mode = InteractionMode::Idle;
        }
    }

    /// File a new report at the current time. See [`Self::submit_report_at`].
    pub fn submit_report(
        &mut self,
        coordinate: Coordinate,
        address: &str,
        description: &str,
    ) -> Result<&Incident, IntakeError> {
        self.submit_report_at(coordinate, address, description, Utc::now())
    }

    /// File the report for the coordinate captured in reporting mode.
    pub fn submit_pending_report(
        &mut self,
        address: &str,
        description: &str,
    ) -> Result<&Incident, IntakeError> {
        let coordinate = self
            .pending_location()
            .ok_or(IntakeError::NoPendingLocation)?;
        self.submit_report(coordinate, address, description)
    }

    /// Validate and file a new report, stamped `now`.
    ///
    /// On success the incident is prepended to the collection, reporting
    /// mode ends, and the new incident is selected (unless the heatmap layer
    /// is showing). On failure nothing changes.
    ///
    /// # Arguments
    ///
    /// * `coordinate` - Where the leak is
    /// * `address` - Free-text address or landmark
    /// * `description` - Free-text description of the leak
    /// * `now` - Report timestamp
    ///
    /// # Returns
    ///
    /// The new `Active` incident, or the [`IntakeError`] that refused it.
    pub fn submit_report_at(
        &mut self,
        coordinate: Coordinate,
        address: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<&Incident, IntakeError> {
        let mut fields = match prepare_report(coordinate, address, description, self.empty_fields) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(reason = %e, "Leak report rejected");
                return Err(e);
            }
        };

        let incidents = &self.incidents;
        let id = self
            .ids
            .next_id(|candidate| incidents.iter().any(|i| i.id() == candidate));
        fields.image_url = evidence_image_url(&id);

        let incident = Incident::new(id.clone(), fields, now);
        info!(id = %id, zone = %incident.zone(), "Leak report filed");
        self.incidents.insert(0, incident);

        if self.is_reporting() {
            self.mode = InteractionMode::Idle;
        }
        self.select(&id);

        Ok(&self.incidents[0])
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Move an incident to a new status at time `now`.
    pub fn transition_status(
        &mut self,
        id: &str,
        status: LeakStatus,
        now: DateTime<Utc>,
    ) -> Result<&Incident, TransitionError> {
        let incident = self
            .incidents
            .iter_mut()
            .find(|incident| incident.id() == id)
            .ok_or_else(|| TransitionError::UnknownIncident(id.to_string()))?;

        let from = incident.status();
        if incident.transition(status, now)? {
            info!(id, from = %from, to = %status, "Incident status changed");
        }
        Ok(&*incident)
    }

    // ========================================================================
    // Dashboard
    // ========================================================================

    /// Open the statistics overlay, starting a fresh summary session.
    ///
    /// Refused while reporting. Reopening an already open dashboard keeps
    /// its session.
    pub fn open_dashboard(&mut self) -> bool {
        match self.mode {
            InteractionMode::Reporting { .. } => false,
            InteractionMode::DashboardOpen { .. } => true,
            InteractionMode::Idle | InteractionMode::DetailOpen { .. } => {
                self.dashboard_sessions += 1;
                info!(session = self.dashboard_sessions, "Dashboard opened");
                self.mode = InteractionMode::DashboardOpen {
                    session: self.dashboard_sessions,
                    summary: SummaryState::NotStarted,
                };
                true
            }
        }
    }

    pub fn close_dashboard(&mut self) {
        if let InteractionMode::DashboardOpen { session, .. } = self.mode {
            info!(session, "Dashboard closed");
            self.mode = InteractionMode::Idle;
        }
    }

    pub fn is_dashboard_open(&self) -> bool {
        matches!(self.mode, InteractionMode::DashboardOpen { .. })
    }

    /// Summary state of the open dashboard session.
    pub fn summary_state(&self) -> Option<&SummaryState> {
        match &self.mode {
            InteractionMode::DashboardOpen { summary, .. } => Some(summary),
            _ => None,
        }
    }

    /// Start the summary request for the open session.
    ///
    /// Returns `None` unless the dashboard is open and its summary has not
    /// been started yet, so at most one request exists per session.
    pub fn begin_summary(&mut self) -> Option<SummaryRequest> {
        match &mut self.mode {
            InteractionMode::DashboardOpen { session, summary } if summary.can_start() => {
                *summary = SummaryState::InFlight;
                Some(SummaryRequest::new(*session, &self.incidents))
            }
            _ => {
                debug!("Summary trigger ignored");
                None
            }
        }
    }

    /// Return an unfinished request of `session` to `NotStarted`, so the
    /// trigger is offered again.
    ///
    /// Returns false when that session is closed or its request is not in
    /// flight.
    pub fn abandon_summary(&mut self, session: u64) -> bool {
        match &mut self.mode {
            InteractionMode::DashboardOpen {
                session: open,
                summary: summary @ SummaryState::InFlight,
            } if *open == session => {
                debug!(session, "Summary request abandoned");
                *summary = SummaryState::NotStarted;
                true
            }
            _ => false,
        }
    }

    /// Store the result of the request started for `session`.
    ///
    /// Returns false (and drops `text`) when that session is no longer open.
    pub fn complete_summary(&mut self, session: u64, text: String) -> bool {
        match &mut self.mode {
            InteractionMode::DashboardOpen {
                session: open,
                summary: summary @ SummaryState::InFlight,
            } if *open == session => {
                *summary = SummaryState::Completed(text);
                true
            }
            _ => false,
        }
    }
}

/// First sequence number that is free after `seeded` seed incidents.
fn first_free_sequence(seeded: usize) -> u64 {
    FIRST_SEQUENCE + seeded as u64 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn qro() -> Coordinate {
        Coordinate::new(20.5888, -100.3899)
    }

    fn store_with_reports(n: usize) -> IncidentStore {
        let mut store = IncidentStore::new(EmptyFieldPolicy::Reject);
        for i in 0..n {
            store
                .submit_report(qro(), &format!("Zaragoza #{}", i), "Leak")
                .unwrap();
        }
        store.clear_selection();
        store
    }

    #[test]
    fn test_submit_prepends_and_keeps_order() {
        let mut store = store_with_reports(3);
        let before: Vec<String> = store.incidents().iter().map(|i| i.id().to_string()).collect();

        let id = store
            .submit_report(qro(), "Pasteur #9", "Water on the street")
            .unwrap()
            .id()
            .to_string();

        assert_eq!(store.incidents()[0].id(), id);
        let after: Vec<String> = store.incidents()[1..]
            .iter()
            .map(|i| i.id().to_string())
            .collect();
        assert_eq!(after, before);
        assert_eq!(store.incidents()[0].status(), LeakStatus::Active);
    }

    #[test]
    fn test_ids_are_unique_and_never_reused() {
        let store = store_with_reports(5);
        let mut ids: Vec<&str> = store.incidents().iter().map(|i| i.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_rejected_report_changes_nothing() {
        let mut store = IncidentStore::new(EmptyFieldPolicy::Reject);
        store.begin_reporting();
        store.capture_location(qro());

        let err = store.submit_pending_report("", "Leak").unwrap_err();

        assert_eq!(err, IntakeError::EmptyAddress);
        assert!(store.is_empty());
        assert!(store.is_reporting());
        assert_eq!(store.pending_location(), Some(qro()));
    }

    #[test]
    fn test_submit_pending_requires_location() {
        let mut store = IncidentStore::new(EmptyFieldPolicy::Reject);
        store.begin_reporting();

        assert_eq!(
            store.submit_pending_report("Zaragoza #1", "Leak").unwrap_err(),
            IntakeError::NoPendingLocation
        );
    }

    #[test]
    fn test_reporting_flow_clears_transient_state() {
        let mut store = IncidentStore::new(EmptyFieldPolicy::Reject);
        store.begin_reporting();
        assert!(store.handle_map_event(MapEvent::Click(qro())));

        let id = store
            .submit_pending_report("Bernardo Quintana #300", "Broken pipe")
            .unwrap()
            .id()
            .to_string();

        assert!(!store.is_reporting());
        assert_eq!(store.pending_location(), None);
        assert_eq!(store.selected_id(), Some(id.as_str()));
    }

    #[test]
    fn test_map_click_ignored_outside_reporting() {
        let mut store = IncidentStore::new(EmptyFieldPolicy::Reject);

        assert!(!store.handle_map_event(MapEvent::Click(qro())));
        assert_eq!(store.mode(), &InteractionMode::Idle);
    }

    #[test]
    fn test_entering_reporting_clears_selection_and_heatmap() {
        let mut store = store_with_reports(1);
        let id = store.incidents()[0].id().to_string();
        assert!(store.select(&id));
        store.toggle_perspective();
        store.toggle_heatmap();
        assert_eq!(store.layer(), MapLayer::Heatmap);

        store.begin_reporting();

        assert_eq!(store.selected_id(), None);
        assert_eq!(store.layer(), MapLayer::Standard);
        assert!(!store.select(&id));
        assert!(!store.handle_map_event(MapEvent::MarkerClick(id)));
        assert!(!store.toggle_heatmap());
    }

    #[test]
    fn test_heatmap_suppresses_selection() {
        let mut store = store_with_reports(2);
        let id = store.incidents()[1].id().to_string();
        store.select(&id);

        assert!(store.toggle_heatmap());
        assert_eq!(store.selected_id(), None);
        assert!(!store.select(&id));

        assert!(store.toggle_heatmap());
        assert!(store.select(&id));
    }

    #[test]
    fn test_perspective_and_heatmap_exclusive() {
        let mut store = IncidentStore::default();
        store.toggle_perspective();
        assert_eq!(store.layer(), MapLayer::Perspective3d);
        store.toggle_heatmap();
        assert_eq!(store.layer(), MapLayer::Heatmap);
        store.toggle_perspective();
        assert_eq!(store.layer(), MapLayer::Perspective3d);
        store.toggle_perspective();
        assert_eq!(store.layer(), MapLayer::Standard);
    }

    #[test]
    fn test_stale_selection_resolves_to_none() {
        let mut store = store_with_reports(1);
        assert!(store.select("LK-4242"));

        assert_eq!(store.selected_id(), Some("LK-4242"));
        assert!(store.selected().is_none());
    }

    #[test]
    fn test_cancel_reporting() {
        let mut store = IncidentStore::default();
        store.begin_reporting();
        store.capture_location(qro());

        store.cancel_reporting();

        assert_eq!(store.mode(), &InteractionMode::Idle);
        assert_eq!(store.pending_location(), None);
    }

    #[test]
    fn test_invalid_click_not_captured() {
        let mut store = IncidentStore::default();
        store.begin_reporting();

        assert!(!store.capture_location(Coordinate::new(f64::NAN, 1.0)));
        assert_eq!(store.pending_location(), None);
    }

    #[test]
    fn test_with_incidents_drops_duplicates_and_continues_ids() {
        let seed = store_with_reports(2);
        let mut incidents = seed.incidents().to_vec();
        incidents.push(incidents[0].clone());

        let mut store = IncidentStore::with_incidents(incidents, EmptyFieldPolicy::Reject);
        assert_eq!(store.len(), 2);

        let id = store
            .submit_report(qro(), "Corregidora #5", "Leak")
            .unwrap()
            .id()
            .to_string();
        assert_eq!(
            store.incidents().iter().filter(|i| i.id() == id).count(),
            1
        );
    }

    #[test]
    fn test_transition_status() {
        let mut store = store_with_reports(1);
        let id = store.incidents()[0].id().to_string();
        let reported = store.incidents()[0].reported_at();

        let repaired = store
            .transition_status(&id, LeakStatus::Repaired, reported + Duration::hours(6))
            .unwrap();
        assert_eq!(repaired.repaired_at(), Some(reported + Duration::hours(6)));

        assert_eq!(
            store
                .transition_status("LK-1", LeakStatus::Repairing, Utc::now())
                .unwrap_err(),
            TransitionError::UnknownIncident("LK-1".to_string())
        );
    }

    #[test]
    fn test_dashboard_blocks_selection_and_reporting_blocks_dashboard() {
        let mut store = store_with_reports(1);
        let id = store.incidents()[0].id().to_string();
        store.select(&id);

        assert!(store.open_dashboard());
        assert_eq!(store.selected_id(), None);
        assert!(!store.select(&id));

        store.close_dashboard();
        store.begin_reporting();
        assert!(!store.open_dashboard());
    }

    #[test]
    fn test_summary_single_in_flight_per_session() {
        let mut store = store_with_reports(2);
        assert!(store.begin_summary().is_none());

        store.open_dashboard();
        let request = store.begin_summary().unwrap();
        assert_eq!(store.summary_state(), Some(&SummaryState::InFlight));
        assert!(store.begin_summary().is_none());

        assert!(store.complete_summary(request.session(), "All good".to_string()));
        assert_eq!(
            store.summary_state(),
            Some(&SummaryState::Completed("All good".to_string()))
        );
        assert!(store.begin_summary().is_none());
    }

    #[test]
    fn test_summary_result_dropped_after_session_ends() {
        let mut store = store_with_reports(1);
        store.open_dashboard();
        let request = store.begin_summary().unwrap();

        store.close_dashboard();
        store.open_dashboard();

        assert!(!store.complete_summary(request.session(), "late".to_string()));
        assert_eq!(store.summary_state(), Some(&SummaryState::NotStarted));
    }

    #[test]
    fn test_empty_stores_allocate_the_same_first_id() {
        let mut fresh = IncidentStore::new(EmptyFieldPolicy::Reject);
        let mut seeded = IncidentStore::with_incidents(Vec::new(), EmptyFieldPolicy::Reject);
        let mut default = IncidentStore::default();

        let a = fresh.submit_report(qro(), "Zaragoza #1", "Leak").unwrap().id().to_string();
        let b = seeded.submit_report(qro(), "Zaragoza #1", "Leak").unwrap().id().to_string();
        let c = default.submit_report(qro(), "Zaragoza #1", "Leak").unwrap().id().to_string();

        assert_eq!(a, "LK-1001");
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_abandoned_summary_can_be_retriggered() {
        let mut store = store_with_reports(1);
        store.open_dashboard();
        let request = store.begin_summary().unwrap();

        assert!(store.abandon_summary(request.session()));
        assert_eq!(store.summary_state(), Some(&SummaryState::NotStarted));
        assert!(!store.abandon_summary(request.session()));

        let retry = store.begin_summary().unwrap();
        assert_eq!(retry.session(), request.session());
        assert!(store.complete_summary(retry.session(), "Done".to_string()));
        assert!(!store.abandon_summary(retry.session()));
        assert_eq!(
            store.summary_state(),
            Some(&SummaryState::Completed("Done".to_string()))
        );
    }
}
