//! # reel-review Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use anyhow::Context;
use configs::Settings;
use rr_api::AppState;
use rr_core::{ChatPlatform, EventHandler, VideoRegistry};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "store-json")]
use rr_store_json::JsonFileStore;

#[cfg(feature = "discord")]
use rr_discord::DiscordPlatform;

#[cfg(feature = "gateway")]
use rr_discord_gateway::DiscordGateway;

#[cfg(not(all(feature = "store-json", feature = "discord")))]
compile_error!("reel-review needs a snapshot store and a chat platform: enable `store-json` and `discord`");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = Settings::load().context("loading configuration")?;

    // 1. Restore the registry from its snapshot
    let store = JsonFileStore::new(&settings.storage.state_path);
    let mut registry = VideoRegistry::new(Box::new(store));
    registry.load().await;
    let registry = registry.into_shared();

    // 2. Chat platform client
    let platform: Arc<dyn ChatPlatform> = Arc::new(
        DiscordPlatform::new(&settings.discord.api_base, settings.discord.token.clone())
            .context("building Discord client")?,
    );

    // 3. Event facade shared by the gateway and the relay route
    let events = Arc::new(EventHandler::new(
        registry.clone(),
        platform.clone(),
        &settings.discord.channel_id,
    ));

    #[cfg(feature = "gateway")]
    let gateway = tokio::spawn(DiscordGateway::new(&settings.discord.token, events.clone()).run());

    let relay_enabled = settings.discord.relay_secret.is_some();
    if !cfg!(feature = "gateway") && !relay_enabled {
        warn!("no gateway and no relay secret configured; uploads and reactions will not be observed");
    }

    let state = AppState {
        registry: registry.clone(),
        platform,
        events,
        guild_id: settings.discord.guild_id.clone(),
        ban_enabled: settings.moderation.ban_enabled,
        relay_secret: settings.discord.relay_secret.clone(),
    };
    let app = rr_api::router(state, settings.server.static_dir.as_deref());

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(
        %address,
        channel_id = %settings.discord.channel_id,
        ban_enabled = settings.moderation.ban_enabled,
        relay_enabled,
        "reel-review listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    #[cfg(feature = "gateway")]
    gateway.abort();

    registry.lock().await.save().await;
    info!("reel-review stopped");
    Ok(())
}

/// `LOG_FORMAT=json` switches to structured output; `RUST_LOG` filters.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
