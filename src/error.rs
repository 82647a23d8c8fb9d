//! Error types for the incident core.
//!
//! Only two operations can fail: report intake (validation) and status
//! transitions. Lookup misses are modelled as `Option`, and the summary
//! service converts its own failures into fallback text.

use thiserror::Error;

/// Why a leak report was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntakeError {
    /// The address/landmark field was empty after trimming.
    #[error("address is required")]
    EmptyAddress,

    /// The description field was empty after trimming.
    #[error("description is required")]
    EmptyDescription,

    /// The coordinate is not a finite latitude/longitude pair.
    #[error("coordinate ({lat}, {lng}) is not a valid latitude/longitude")]
    InvalidCoordinate { lat: f64, lng: f64 },

    /// A submission was attempted before a map location was captured.
    #[error("no location has been selected on the map")]
    NoPendingLocation,
}

/// Why a status transition was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("incident {0} does not exist")]
    UnknownIncident(String),

    #[error("incident {0} cannot be marked repaired before it was reported")]
    RepairBeforeReport(String),
}

/// A status or filter name that does not match any known value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);
