//! Qro sin fugas - demo driver for the incident state core.
//!
//! Seeds a store with demo incidents for Querétaro, prints the dashboard
//! snapshot as JSON and then requests the AI summary once.
//!
//! # Environment
//!
//! - `SINFUGAS_GEMINI_API_KEY` - Gemini API key (fallback: `API_KEY`)
//! - `SINFUGAS_GEMINI_MODEL` - Model name
//! - `SINFUGAS_GEMINI_BASE_URL` - API base URL
//! - `SINFUGAS_SEED_COUNT` - Number of demo incidents
//! - `SINFUGAS_TOP_ZONES` - Zone ranking size
//! - `SINFUGAS_EMPTY_FIELDS` - `reject` or `substitute`

use std::sync::Mutex;

use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use sinfugas::config::AppConfig;
use sinfugas::dashboard::generate_summary;
use sinfugas::seed::generate_incidents;
use sinfugas::store::IncidentStore;
use sinfugas::view::dashboard_view;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default log level is INFO; report text is never logged
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("sinfugas=info".parse()?))
        .init();

    let config = AppConfig::from_env();
    info!(
        seed_count = config.seed_count,
        top_zones = config.top_zones,
        model = %config.gemini_model,
        api_key = config.gemini_api_key.is_some(),
        "Starting Qro sin fugas"
    );

    let now = Utc::now();
    let mut store =
        IncidentStore::with_incidents(generate_incidents(config.seed_count, now), config.empty_fields);
    info!(incidents = store.len(), "Store seeded");

    store.open_dashboard();
    if let Some(view) = dashboard_view(&store, config.top_zones, now) {
        println!("{}", serde_json::to_string_pretty(&view.snapshot)?);
    }

    let store = Mutex::new(store);
    let client = config.gemini_client();
    match generate_summary(&store, &client).await {
        Some(text) => println!("\n{}", text),
        None => warn!("Summary request was not started"),
    }

    Ok(())
}
