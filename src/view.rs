//! View-model projections for the map, sidebar and detail panel.
//!
//! Rendering (tiles, icons, widgets) belongs to the front end. These structs
//! are everything it needs, derived one-way from an [`IncidentStore`] and
//! rebuilt after every change. None of them hold references back into the
//! store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::aggregation::{count_matching, heatmap_points};
use crate::dashboard::{DashboardSnapshot, DashboardView};
use crate::model::{Coordinate, HeatPoint, Incident, LeakStatus, Severity, StatusFilter};
use crate::seed::MAP_CENTER;
use crate::store::{IncidentStore, MapLayer};

/// Zoom level of the city overview.
pub const MAP_ZOOM: u8 = 13;

/// Zoom level used when focusing a selected incident.
pub const FOCUS_ZOOM: u8 = 15;

pub const EMPTY_LIST_MESSAGE: &str = "No leaks found matching filters.";

/// A clickable incident marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerView {
    pub id: String,
    pub position: Coordinate,
    pub status: LeakStatus,
    pub color: &'static str,
    /// Active leaks are drawn with a pulsing animation.
    pub pulsing: bool,
    pub selected: bool,
}

/// Everything the map collaborator consumes.
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub center: Coordinate,
    pub zoom: u8,
    pub layer: MapLayer,
    /// Empty in the heatmap layer.
    pub markers: Vec<MarkerView>,
    /// Only populated in the heatmap layer.
    pub heat_points: Vec<HeatPoint>,
    pub selected_id: Option<String>,
    pub reporting: bool,
    pub pending_location: Option<Coordinate>,
}

impl MapView {
    /// Project the visible incidents of `store` onto the map.
    ///
    /// The map centres on the selected incident when it resolves, and on the
    /// city otherwise.
    pub fn build(store: &IncidentStore) -> Self {
        let visible = store.visible();
        let selected_id = store.selected_id();

        let (center, zoom) = match store.selected() {
            Some(incident) => (incident.position(), FOCUS_ZOOM),
            None => (MAP_CENTER, MAP_ZOOM),
        };

        let (markers, heat_points) = if store.layer() == MapLayer::Heatmap {
            (Vec::new(), heatmap_points(visible.iter().copied()))
        } else {
            let markers = visible
                .iter()
                .map(|incident| MarkerView {
                    id: incident.id().to_string(),
                    position: incident.position(),
                    status: incident.status(),
                    color: incident.status().color(),
                    pulsing: incident.status() == LeakStatus::Active,
                    selected: selected_id == Some(incident.id()),
                })
                .collect();
            (markers, Vec::new())
        };

        Self {
            center,
            zoom,
            layer: store.layer(),
            markers,
            heat_points,
            selected_id: selected_id.map(str::to_string),
            reporting: store.is_reporting(),
            pending_location: store.pending_location(),
        }
    }
}

/// A filter button with its badge count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterTab {
    pub filter: StatusFilter,
    pub count: usize,
    pub active: bool,
}

/// One row of the sidebar list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidebarRow {
    pub id: String,
    pub address: String,
    pub zone: String,
    pub status: LeakStatus,
    pub severity: Severity,
    pub reported_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidebarView {
    pub tabs: Vec<FilterTab>,
    pub rows: Vec<SidebarRow>,
    /// Set when `rows` is empty.
    pub empty_message: Option<&'static str>,
}

impl SidebarView {
    pub fn build(store: &IncidentStore) -> Self {
        let tabs = StatusFilter::ALL
            .into_iter()
            .map(|filter| FilterTab {
                filter,
                count: count_matching(store.incidents(), filter),
                active: filter == store.filter(),
            })
            .collect();

        let rows: Vec<SidebarRow> = store
            .visible()
            .into_iter()
            .map(|incident| SidebarRow {
                id: incident.id().to_string(),
                address: incident.address().to_string(),
                zone: incident.zone().to_string(),
                status: incident.status(),
                severity: incident.severity(),
                reported_on: incident.reported_at().date_naive(),
            })
            .collect();

        Self {
            tabs,
            empty_message: rows.is_empty().then_some(EMPTY_LIST_MESSAGE),
            rows,
        }
    }
}

/// The detail panel for the selected incident.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub id: String,
    pub status: LeakStatus,
    pub status_color: &'static str,
    pub address: String,
    pub zone: String,
    pub description: String,
    pub reporter_name: String,
    pub severity: Severity,
    pub reported_at: DateTime<Utc>,
    pub repaired_at: Option<DateTime<Utc>>,
    /// `lat, lng` with six decimals.
    pub coordinates: String,
    pub image_url: String,
    /// Offered only while the leak is still active.
    pub can_request_crew: bool,
}

impl DetailView {
    /// The panel for the current selection; `None` renders nothing.
    pub fn build(store: &IncidentStore) -> Option<Self> {
        store.selected().map(Self::from_incident)
    }

    pub fn from_incident(incident: &Incident) -> Self {
        Self {
            id: incident.id().to_string(),
            status: incident.status(),
            status_color: incident.status().color(),
            address: incident.address().to_string(),
            zone: incident.zone().to_string(),
            description: incident.description().to_string(),
            reporter_name: incident.reporter_name().to_string(),
            severity: incident.severity(),
            reported_at: incident.reported_at(),
            repaired_at: incident.repaired_at(),
            coordinates: incident.position().to_string(),
            image_url: incident.image_url().to_string(),
            can_request_crew: incident.status() == LeakStatus::Active,
        }
    }
}

/// The dashboard overlay, when open.
pub fn dashboard_view(store: &IncidentStore, top_zones: usize, now: DateTime<Utc>) -> Option<DashboardView> {
    let summary = store.summary_state()?.clone();
    Some(DashboardView {
        snapshot: DashboardSnapshot::build(store.incidents(), top_zones, now),
        summary,
    })
}
