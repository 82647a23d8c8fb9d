//! Qro sin fugas - incident state core for a citizen water-leak dashboard.
//!
//! # Overview
//!
//! Residents of Querétaro report water leaks by dropping a pin on a map.
//! This crate owns everything behind the map: the incident collection, the
//! report intake rules, the status filter and selection, the statistics shown
//! on the operational dashboard, and the one outbound call that asks a
//! text-generation service for a short executive summary.
//!
//! Rendering is left to the front end. The [`view`] module projects the
//! store into plain structs the map, sidebar and panels draw from.
//!
//! # Modules
//!
//! - [`model`]: Incident record, statuses, severities and dashboard types
//! - [`store`]: The single owner of incidents and interaction state
//! - [`intake`]: Validation and defaults for new reports
//! - [`filter`]: Status filtering and selection lookup
//! - [`aggregation`]: Statistics, zone ranking, weekly trend, heatmap
//! - [`dashboard`]: Dashboard snapshot and the summary session
//! - [`summary`]: Text-generation service and its Gemini client
//! - [`view`]: Map, sidebar and detail projections
//! - [`seed`]: Deterministic demo incidents
//! - [`config`]: Environment configuration
//! - [`error`]: Error types

pub mod aggregation;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod intake;
pub mod model;
pub mod seed;
pub mod store;
pub mod summary;
pub mod view;
