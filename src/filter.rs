//! Status filtering and selection lookup over an incident collection.

use crate::model::{Incident, StatusFilter};

/// The incidents that pass `filter`, in their original order.
pub fn apply_filter(incidents: &[Incident], filter: StatusFilter) -> Vec<&Incident> {
    incidents
        .iter()
        .filter(|incident| filter.matches(incident.status()))
        .collect()
}

/// Look up the incident a selection id refers to.
///
/// Selections hold ids, not records, so an id can outlive its incident
/// (for example after the collection is replaced). That is not an error:
/// the selection simply resolves to nothing.
pub fn resolve_selection<'a>(incidents: &'a [Incident], id: &str) -> Option<&'a Incident> {
    incidents.iter().find(|incident| incident.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, LeakStatus, NewIncident, Severity};
    use chrono::{Duration, Utc};

    fn collection() -> Vec<Incident> {
        let now = Utc::now();
        let statuses = [
            LeakStatus::Repaired,
            LeakStatus::Active,
            LeakStatus::Repairing,
            LeakStatus::Repaired,
        ];

        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut incident = Incident::new(
                    format!("LK-{}", 2000 + i),
                    NewIncident {
                        position: Coordinate::new(20.6, -100.4),
                        address: format!("Corregidora #{}", i),
                        zone: "Centro Histórico".to_string(),
                        description: "Minor dripping.".to_string(),
                        reporter_name: format!("Citizen {}", i + 1),
                        severity: Severity::High,
                        image_url: String::new(),
                    },
                    now - Duration::hours(24),
                );
                incident.transition(*status, now).unwrap();
                incident
            })
            .collect()
    }

    #[test]
    fn test_all_filter_is_identity() {
        let incidents = collection();
        let visible = apply_filter(&incidents, StatusFilter::All);

        assert_eq!(visible.len(), incidents.len());
        assert!(visible.iter().zip(&incidents).all(|(a, b)| *a == b));
    }

    #[test]
    fn test_status_filter_keeps_relative_order() {
        let incidents = collection();

        for status in LeakStatus::ALL {
            let visible = apply_filter(&incidents, StatusFilter::Only(status));
            assert!(visible.iter().all(|i| i.status() == status));
            let expected: Vec<&str> = incidents
                .iter()
                .filter(|i| i.status() == status)
                .map(|i| i.id())
                .collect();
            let actual: Vec<&str> = visible.iter().map(|i| i.id()).collect();
            assert_eq!(actual, expected);
        }

        let repaired = apply_filter(&incidents, StatusFilter::Only(LeakStatus::Repaired));
        assert_eq!(
            repaired.iter().map(|i| i.id()).collect::<Vec<_>>(),
            vec!["LK-2000", "LK-2003"]
        );
    }

    #[test]
    fn test_single_active_incident() {
        let incidents = collection();
        let filter: StatusFilter = "ACTIVE".parse().unwrap();

        let visible = apply_filter(&incidents, filter);

        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id(), "LK-2001");
    }

    #[test]
    fn test_resolve_selection() {
        let incidents = collection();

        assert_eq!(
            resolve_selection(&incidents, "LK-2002").map(|i| i.id()),
            Some("LK-2002")
        );
        assert!(resolve_selection(&incidents, "LK-9999").is_none());
        assert!(resolve_selection(&[], "LK-2002").is_none());
    }
}
