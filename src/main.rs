use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api_rest::{AppState, Evaluator};
use greencard_core::config::{identifiers_from_env_value, u32_from_env_value};
use greencard_core::constants::{DEFAULT_ADHERENCE_WINDOW_DAYS, DEFAULT_ART_THRESHOLD_MONTHS};
use greencard_core::{CoreConfig, InMemoryFactSource};

/// `RUST_LOG` directives plus info level for the greencard crates and the REST layer.
fn log_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("greencard=info".parse()?)
        .add_directive("api_rest=info".parse()?))
}

/// Main entry point for the greencard service
///
/// Loads the patient record document once, then serves the greencard questions over REST.
///
/// # Environment Variables
/// - `GREENCARD_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `GREENCARD_DATA_FILE`: Patient record YAML document (required)
/// - `GREENCARD_IDENTIFIERS_FILE`: YAML overrides for concept and metadata identifiers
/// - `GREENCARD_ADHERENCE_WINDOW_DAYS`: Adherence look-back window (default: 182)
/// - `GREENCARD_ART_THRESHOLD_MONTHS`: Months on ART before `hasBeenOnART` holds (default: 3)
/// - `API_KEY`: When set, required in the `x-api-key` header on patient routes
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter()?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("GREENCARD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_file: PathBuf = std::env::var("GREENCARD_DATA_FILE")
        .context("GREENCARD_DATA_FILE must point at a patient record YAML document")?
        .into();

    let identifiers = identifiers_from_env_value(std::env::var("GREENCARD_IDENTIFIERS_FILE").ok())?;
    let adherence_window_days = u32_from_env_value(
        "GREENCARD_ADHERENCE_WINDOW_DAYS",
        std::env::var("GREENCARD_ADHERENCE_WINDOW_DAYS").ok(),
        DEFAULT_ADHERENCE_WINDOW_DAYS,
    )?;
    let art_threshold_months = u32_from_env_value(
        "GREENCARD_ART_THRESHOLD_MONTHS",
        std::env::var("GREENCARD_ART_THRESHOLD_MONTHS").ok(),
        DEFAULT_ART_THRESHOLD_MONTHS,
    )?;

    let source = InMemoryFactSource::from_path(&data_file, &identifiers)
        .with_context(|| format!("loading {}", data_file.display()))?;
    let cfg = CoreConfig::new(identifiers, adherence_window_days, art_threshold_months)?;
    tracing::info!(
        "++ Loaded {} patients from {}",
        source.patient_ids().len(),
        data_file.display()
    );

    let evaluator = Evaluator::new(Arc::new(source), Arc::new(cfg));
    let app = api_rest::router(AppState::new(evaluator, std::env::var("API_KEY").ok()));

    tracing::info!("++ Starting greencard REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_covers_rest_layer() {
        let filter = log_filter().unwrap().to_string().to_lowercase();
        assert!(filter.contains("greencard=info"), "{filter}");
        assert!(filter.contains("api_rest=info"), "{filter}");
    }
}
