use std::sync::Arc;

use tokio::time::{MissedTickBehavior, interval};

use backend::{config::AppConfig, engine::Engine, views::ViewKind};
use common::logger::init_logger;
use feeds::HttpMarketFeed;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("meridian-backend");

    tracing::info!("starting meridian backend");

    let cfg = AppConfig::from_env();
    let refresh_every = cfg.refresh_interval;

    let feed = Arc::new(HttpMarketFeed::new(cfg.feed_base_url.clone())?);
    let engine = Arc::new(Engine::new(cfg, feed)?);

    // Background command-center refresh. The HTTP layer reads through
    // the same cache, so this keeps the hot view warm.
    let refresher = Arc::clone(&engine);
    tokio::spawn(async move {
        let mut ticker = interval(refresh_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match refresher.aggregated_view(ViewKind::CommandCenter, false).await {
                Ok(view) => {
                    let top: Vec<&str> = view
                        .top_drivers(3)
                        .iter()
                        .map(|d| d.name.as_str())
                        .collect();

                    tracing::info!(
                        session = %view.session.key,
                        bias = ?view.net_bias.direction,
                        confidence = view.net_bias.confidence,
                        stale = view.stale,
                        top_drivers = ?top,
                        "command center refreshed"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "command center refresh failed");
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    Ok(())
}
