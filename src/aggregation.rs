//! Aggregation logic for dashboard statistics.
//!
//! Every function here is a pure function of the incident slice it is given
//! (plus an explicit reference date for the trend). Empty input produces
//! zero counts or empty sequences, never an error.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};

use crate::model::{
    DashboardStats, HeatPoint, Incident, LeakStatus, StatusFilter, TrendPoint, ZoneCount,
};

/// Number of zones shown in the "top zones" chart.
pub const DEFAULT_TOP_ZONES: usize = 5;

/// Length of the trailing trend window, in days (including today).
pub const TREND_DAYS: u64 = 7;

/// Heat intensity of an active leak; every other status uses half of it.
const ACTIVE_HEAT: f64 = 1.0;
const SETTLED_HEAT: f64 = 0.5;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Compute total, per-status counts and the average repair time.
///
/// The average is taken over incidents that are `Repaired` and carry a
/// `repaired_at` stamp. With no such incidents it is `0.0`.
pub fn compute_stats(incidents: &[Incident]) -> DashboardStats {
    let mut active = 0;
    let mut repairing = 0;
    let mut repaired = 0;

    let mut repaired_with_time = 0usize;
    let mut total_hours = 0.0;

    for incident in incidents {
        match incident.status() {
            LeakStatus::Active => active += 1,
            LeakStatus::Repairing => repairing += 1,
            LeakStatus::Repaired => repaired += 1,
        }

        if let Some(duration) = incident.repair_duration() {
            repaired_with_time += 1;
            total_hours += duration.num_milliseconds() as f64 / MILLIS_PER_HOUR;
        }
    }

    let avg_repair_time_hours = if repaired_with_time > 0 {
        total_hours / repaired_with_time as f64
    } else {
        0.0
    };

    DashboardStats {
        total: incidents.len(),
        active,
        repairing,
        repaired,
        avg_repair_time_hours,
    }
}

/// Count incidents matching `filter`.
pub fn count_matching(incidents: &[Incident], filter: StatusFilter) -> usize {
    incidents
        .iter()
        .filter(|incident| filter.matches(incident.status()))
        .count()
}

/// Rank zones by incident count.
///
/// Zones with equal counts keep the order in which they first appear in
/// `incidents`.
///
/// # Arguments
///
/// * `incidents` - The incident collection
/// * `top_n` - Maximum number of zones to return
///
/// # Returns
///
/// At most `top_n` zones with their counts, sorted by count descending.
pub fn compute_zone_ranking(incidents: &[Incident], top_n: usize) -> Vec<ZoneCount> {
    let mut ranking: Vec<ZoneCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for incident in incidents {
        match index.get(incident.zone()) {
            Some(&slot) => ranking[slot].count += 1,
            None => {
                index.insert(incident.zone(), ranking.len());
                ranking.push(ZoneCount {
                    zone: incident.zone().to_string(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable, which gives the first-appearance tie-break
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    ranking.truncate(top_n);
    ranking
}

/// Daily report counts for the trailing week ending on `today`.
///
/// Always returns [`TREND_DAYS`] points, oldest first. Incidents are
/// bucketed by the UTC calendar day of `reported_at`; reports outside the
/// window are ignored.
pub fn compute_trend(incidents: &[Incident], today: NaiveDate) -> Vec<TrendPoint> {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for incident in incidents {
        *per_day.entry(incident.reported_at().date_naive()).or_insert(0) += 1;
    }

    (0..TREND_DAYS)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|date| TrendPoint {
            date,
            label: date.format("%a").to_string(),
            count: per_day.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

/// Weighted points for the heatmap layer.
pub fn heatmap_points<'a>(incidents: impl IntoIterator<Item = &'a Incident>) -> Vec<HeatPoint> {
    incidents
        .into_iter()
        .map(|incident| {
            let position = incident.position();
            HeatPoint {
                lat: position.lat,
                lng: position.lng,
                intensity: if incident.status() == LeakStatus::Active {
                    ACTIVE_HEAT
                } else {
                    SETTLED_HEAT
                },
            }
        })
        .collect()
}
