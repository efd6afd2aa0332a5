//! Slotline server entry point.

use std::sync::Arc;
use std::time::Duration;

use slotline_api::utils::logging::init_tracing;
use slotline_api::{router, AppContext};
use slotline_core::MailboxSynchronizer;
use slotline_domain::constants::WATCH_RENEWAL_WINDOW_HOURS;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading configuration
    let dotenv = dotenvy::dotenv();

    let config = slotline_infra::config::load()?;
    init_tracing(&config.logging);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => warn!(error = %err, "no .env file loaded"),
    }

    let bind_address = config.server.bind_address.clone();
    let renewal_interval = Duration::from_secs(config.server.watch_renewal_interval_secs.max(60));
    let context = Arc::new(AppContext::new(config)?);

    if context.config.google.pubsub_topic.is_some() {
        tokio::spawn(renew_watches(Arc::clone(&context.mailbox), renewal_interval));
    } else {
        info!("no push topic configured; watch renewal disabled");
    }

    let listener = TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "slotline listening");

    axum::serve(listener, router(context)).with_graceful_shutdown(shutdown_signal()).await?;

    info!("slotline stopped");
    Ok(())
}

async fn renew_watches(mailbox: Arc<MailboxSynchronizer>, every: Duration) {
    let window = chrono::Duration::hours(WATCH_RENEWAL_WINDOW_HOURS);
    let mut ticker = tokio::time::interval(every);

    loop {
        ticker.tick().await;
        match mailbox.renew_expiring_watches(window).await {
            Ok(0) => {}
            Ok(renewed) => info!(renewed, "mailbox watches renewed"),
            Err(err) => error!(error = %err, "watch renewal sweep failed"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
