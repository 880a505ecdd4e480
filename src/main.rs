use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulsebs::api::router;
use pulsebs::config::AppConfig;
use pulsebs::services::DailySummaryScheduler;
use pulsebs::state::AppState;
use pulsebs::{db, email};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pulsebs=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = db::connect(&config.database_url).await?;

    if let Some(path) = &config.seed_script {
        let script = tokio::fs::read_to_string(path).await?;
        db::prepare(&pool, &script).await?;
        info!("database seeded from {}", path);
    }

    let mailer = email::from_config(&config.smtp);
    if !config.smtp.enabled {
        warn!("SMTP disabled, emails will only be logged");
    }

    if config.daily_summary {
        let scheduler = DailySummaryScheduler::new(pool.clone(), mailer.clone());
        tokio::spawn(async move {
            scheduler.start().await;
        });
    }

    let state = AppState::new(pool, mailer, &config);
    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
