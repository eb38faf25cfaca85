mod config;
mod error;
mod feedback;
mod trust;
mod web;

use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::trust::TrustScorer;
use crate::web::server::WebServer;

const DEFAULT_CONFIG_PATH: &str = "bunker-trust.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bunker_trust=info,tower_http=info".into()),
        )
        .init();

    info!("🛡️ bunker-trust v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load config. An explicit path must exist; the default one may not.
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let config = Config::load(&path)?;
            info!("Config loaded from {}", path);
            config
        }
        None => {
            let (config, from_file) = Config::load_or_default(DEFAULT_CONFIG_PATH)?;
            if from_file {
                info!("Config loaded from {}", DEFAULT_CONFIG_PATH);
            } else {
                info!("{} not found, using built-in scoring defaults", DEFAULT_CONFIG_PATH);
            }
            config
        }
    };

    let weights = &config.scoring.weights;
    info!(
        "Weights: tenure={} referrals={} clean_record={} training={} contributions={}",
        weights.years_in_network,
        weights.referrals,
        weights.discipline_incidents,
        weights.training_level,
        weights.community_contributions,
    );

    let config = Arc::new(config);
    let scorer = Arc::new(TrustScorer::new(&config.scoring));

    WebServer::new(scorer, config).run().await
}
