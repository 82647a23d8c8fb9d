//! Demo incidents for Querétaro.
//!
//! The generator is deterministic: the same `count` and `now` always give the
//! same incidents. Spread comes from a fixed integer hash of the index, so
//! tests can rely on the output without a random number generator.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::model::{
    Coordinate, FIRST_SEQUENCE, IdSequence, Incident, LeakStatus, NewIncident, Severity,
};

/// Centre of Querétaro City.
pub const MAP_CENTER: Coordinate = Coordinate {
    lat: 20.5888,
    lng: -100.3899,
};

pub const ZONES: [&str; 6] = [
    "Centro Histórico",
    "Juriquilla",
    "El Pueblito",
    "Candiles",
    "Milenio III",
    "Álamos",
];

pub const STREETS: [&str; 6] = [
    "Av. Constituyentes",
    "Bernardo Quintana",
    "Av. 5 de Febrero",
    "Zaragoza",
    "Pasteur",
    "Corregidora",
];

/// Default size of the demo collection.
pub const DEFAULT_SEED_COUNT: usize = 45;

const LAT_SPREAD: f64 = 0.1;
const LNG_SPREAD: f64 = 0.12;
const MAX_AGE_DAYS: u64 = 14;
const MIN_REPAIR_HOURS: u64 = 4;
const REPAIR_HOURS_RANGE: u64 = 48;

/// Generate `count` demo incidents as of `now`, with ids `LK-1000` upward.
///
/// Reports fall within the last two weeks. Repairing and repaired states are
/// reached through [`Incident::transition`], so every seed incident satisfies
/// the same invariants as a live one. Repairs take 4–51 hours but are never
/// stamped later than `now`.
pub fn generate_incidents(count: usize, now: DateTime<Utc>) -> Vec<Incident> {
    (0..count as u64)
        .map(|i| {
            let status = LeakStatus::ALL[(mix(i, 1) % 3) as usize];
            let reported_at = now - Duration::days((mix(i, 2) % MAX_AGE_DAYS) as i64);

            let severity = if unit(i, 3) > 0.7 {
                Severity::High
            } else if unit(i, 4) > 0.4 {
                Severity::Medium
            } else {
                Severity::Low
            };

            let flow = if unit(i, 5) > 0.5 {
                "Significant flow."
            } else {
                "Minor dripping."
            };

            let fields = NewIncident {
                position: Coordinate::new(
                    MAP_CENTER.lat + (unit(i, 6) - 0.5) * LAT_SPREAD,
                    MAP_CENTER.lng + (unit(i, 7) - 0.5) * LNG_SPREAD,
                ),
                address: format!(
                    "{} #{}",
                    STREETS[(mix(i, 8) % STREETS.len() as u64) as usize],
                    mix(i, 9) % 500
                ),
                zone: ZONES[(mix(i, 10) % ZONES.len() as u64) as usize].to_string(),
                description: format!("Reported water leak on the sidewalk. {}", flow),
                reporter_name: format!("Citizen {}", i + 1),
                severity,
                image_url: format!("https://picsum.photos/300/200?random={}", i),
            };

            let mut incident =
                Incident::new(IdSequence::format(FIRST_SEQUENCE + i), fields, reported_at);

            let transitioned_at = match status {
                LeakStatus::Repaired => {
                    let hours = MIN_REPAIR_HOURS + mix(i, 11) % REPAIR_HOURS_RANGE;
                    (reported_at + Duration::hours(hours as i64)).min(now)
                }
                _ => reported_at,
            };
            if let Err(e) = incident.transition(status, transitioned_at) {
                warn!(error = %e, "Seed incident left active");
            }

            incident
        })
        .collect()
}

/// SplitMix64 finaliser over (index, salt).
fn mix(index: u64, salt: u64) -> u64 {
    let mut z = index
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(salt.wrapping_mul(0xD1B5_4A32_D192_ED03));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// `mix` mapped into [0, 1).
fn unit(index: u64, salt: u64) -> f64 {
    (mix(index, salt) >> 11) as f64 / (1u64 << 53) as f64
}
