use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use client_core::{api::ApiClient, transport, Analytics, Dispatcher, DurableTokenStore, Navigator};
use shared::domain::{ArchiveId, Category, Retro, RetroId};
use tracing::info;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
struct Args {
    /// Retro board to subscribe to.
    #[arg(long)]
    retro_id: i64,
    /// Overrides the configured API server url.
    #[arg(long)]
    server_url: Option<String>,
}

/// Headless stand-in for the routing layer: destinations are logged.
struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn home(&self) {
        info!("nav: home");
    }
    fn show_retro(&self, retro: &Retro) {
        info!(retro_id = retro.id.0, slug = %retro.slug, "nav: show retro");
    }
    fn show_retro_for_id(&self, retro_id: RetroId) {
        info!(retro_id = retro_id.0, "nav: show retro by id");
    }
    fn retro_login(&self, retro_id: RetroId) {
        info!(retro_id = retro_id.0, "nav: retro login");
    }
    fn retro_relogin(&self, retro: &Retro) {
        info!(slug = %retro.slug, "nav: retro relogin");
    }
    fn new_retro(&self) {
        info!("nav: new retro");
    }
    fn retro_archives(&self, retro_id: RetroId) {
        info!(retro_id = retro_id.0, "nav: retro archives");
    }
    fn retro_archive(&self, retro_id: RetroId, archive_id: ArchiveId) {
        info!(
            retro_id = retro_id.0,
            archive_id = archive_id.0,
            "nav: retro archive"
        );
    }
    fn retro_settings(&self, retro_id: RetroId) {
        info!(retro_id = retro_id.0, "nav: retro settings");
    }
    fn retro_password_settings(&self, retro_id: RetroId) {
        info!(retro_id = retro_id.0, "nav: retro password settings");
    }
    fn registration(&self, _access_token: &str, email: &str, name: &str) {
        info!(%email, %name, "nav: registration");
    }
}

struct LoggingAnalytics;

impl Analytics for LoggingAnalytics {
    fn archived_retro(&self, retro_id: RetroId) {
        info!(retro_id = retro_id.0, "analytics: archived retro");
    }
    fn created_retro(&self, retro_id: RetroId) {
        info!(retro_id = retro_id.0, "analytics: created retro");
    }
    fn created_retro_item(&self, retro_id: RetroId, category: Category) {
        info!(retro_id = retro_id.0, ?category, "analytics: created retro item");
    }
    fn visited_retro(&self, retro_id: RetroId) {
        info!(retro_id = retro_id.0, "analytics: visited retro");
    }
    fn done_action_item(&self, retro_id: RetroId) {
        info!(retro_id = retro_id.0, "analytics: done action item");
    }
    fn undone_action_item(&self, retro_id: RetroId) {
        info!(retro_id = retro_id.0, "analytics: undone action item");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }

    let database_url = storage::normalize_database_url(&settings.database_url);
    let tokens = DurableTokenStore::initialize(&database_url).await?;

    let dispatcher = Dispatcher::new(
        Arc::new(LoggingNavigator),
        Arc::new(LoggingAnalytics),
        tokens.clone(),
    );
    let emitter = dispatcher.emitter();
    let retro_id = RetroId(args.retro_id);

    let _pump = transport::subscribe(&settings.server_url, retro_id, emitter.clone()).await?;

    let api = ApiClient::new(settings.server_url.clone(), tokens, emitter);
    api.fetch_retro(retro_id).await;

    info!(retro_id = retro_id.0, server_url = %settings.server_url, "desktop: dispatching events");
    dispatcher.run().await;

    Ok(())
}
