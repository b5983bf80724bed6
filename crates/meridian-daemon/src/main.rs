use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use meridian_actions::{build_registry, WebSearchConfig};
use meridian_agent::ProactiveAgent;
use meridian_bus::{Bus, NatsBus};
use meridian_context::ContextStore;
use meridian_conversation::ConversationEngine;
use meridian_core::config::MeridianConfig;
use meridian_hosts::backends::{
    audio::StubAudioHost, filesystem::FilesystemHost, health::HealthHost, llm::StubLlmHost,
    system_action::SystemActionHost, vision::StubVisionHost,
};
use meridian_hosts::{HostRunner, ServiceHost};
use meridian_timeline::collectors::{CommandIngress, FilesystemCollector, SnapshotCollector};
use meridian_timeline::{RetentionConfig, TimelineStore};
use rusqlite::Connection;
use tokio::sync::watch;
use tracing::info;

mod app;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meridian_daemon=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("MERIDIAN_CONFIG").ok();
    let config = MeridianConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({e}), using defaults");
        MeridianConfig::default()
    });

    let bus: Arc<dyn Bus> = Arc::new(NatsBus::connect(&config.bus.url).await?);

    let context_conn = open_connection(&config.database.context_path)?;
    let context_store = Arc::new(ContextStore::new(context_conn, config.context.ttl_hours)?);

    let timeline_conn = open_connection(&config.database.timeline_path)?;
    let timeline_store = Arc::new(TimelineStore::new(
        timeline_conn,
        RetentionConfig {
            command_hours: config.timeline.command_retention_days * 24,
            file_hours: config.timeline.file_retention_days * 24,
            focus_hours: config.timeline.focus_retention_days * 24,
            snapshot_hours: config.timeline.snapshot_retention_hours,
        },
    )?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    spawn_hosts(bus.clone(), shutdown_rx.clone());
    spawn_collectors(
        bus.clone(),
        timeline_store.clone(),
        &config,
        shutdown_rx.clone(),
    );

    let agent = Arc::new(ProactiveAgent::new(bus.clone()));
    tokio::spawn({
        let agent = agent.clone();
        async move { agent.run().await }
    });

    let registry = Arc::new(build_registry(WebSearchConfig {
        api_url: std::env::var("MERIDIAN_WEB_SEARCH_URL").unwrap_or_default(),
        api_key: std::env::var("MERIDIAN_WEB_SEARCH_KEY").ok(),
    }));
    // Owned for the process lifetime so a future surface (cli/overlay —
    // out of scope here) can drive it; the daemon itself never calls it.
    let _engine = ConversationEngine::new(
        bus.clone(),
        context_store.clone(),
        registry,
        whoami(),
        hostname(),
    );

    let state = Arc::new(app::AppState::new(bus.clone()));
    state.mark_ready();
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.http.bind, config.http.port).parse()?;
    info!("meridian daemon listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, router);

    tokio::select! {
        result = server => { result?; }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    }

    Ok(())
}

fn open_connection(path: &str) -> anyhow::Result<Connection> {
    let cwd = std::env::current_dir()?;
    let expanded = meridian_core::paths::expand_path(path, &cwd);
    if let Some(parent) = expanded.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Connection::open(expanded)?)
}

fn spawn_hosts(bus: Arc<dyn Bus>, shutdown_rx: watch::Receiver<bool>) {
    let hosts: Vec<(Arc<dyn ServiceHost>, usize)> = vec![
        (Arc::new(StubLlmHost::new()), 4),
        (Arc::new(StubVisionHost), 1),
        (Arc::new(StubAudioHost), 2),
        (Arc::new(FilesystemHost), 4),
        (Arc::new(SystemActionHost), 2),
        (Arc::new(HealthHost::new(256)), 4),
    ];
    for (host, concurrency) in hosts {
        let runner = HostRunner::new(host, concurrency);
        let bus = bus.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { runner.run(bus, shutdown_rx).await });
    }
}

fn spawn_collectors(
    bus: Arc<dyn Bus>,
    timeline_store: Arc<TimelineStore>,
    config: &MeridianConfig,
    shutdown_rx: watch::Receiver<bool>,
) {
    tokio::spawn({
        let store = timeline_store.clone();
        let bus = bus.clone();
        async move { CommandIngress::run(store, bus).await }
    });

    let snapshot = SnapshotCollector::new(Duration::from_secs(config.collectors.snapshot_interval_secs));
    tokio::spawn({
        let store = timeline_store.clone();
        let bus = bus.clone();
        let shutdown_rx = shutdown_rx.clone();
        async move { snapshot.run(store, bus, shutdown_rx).await }
    });

    if !config.collectors.watch_paths.is_empty() {
        let paths: Vec<PathBuf> = config.collectors.watch_paths.iter().map(PathBuf::from).collect();
        let fs_collector = FilesystemCollector::new(paths, Duration::from_millis(config.collectors.fs_debounce_ms));
        tokio::spawn(async move { fs_collector.run(timeline_store, bus, shutdown_rx).await });
    }
}

fn whoami() -> String {
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}
