use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use listwise::background;
use listwise::catalog::{CatalogLookup, StaticCatalog};
use listwise::config::Config;
use listwise::datastore::Datastore;
use listwise::effect::{ActionKind, KindRegistry, LogEffect};
use listwise::engine::Engine;
use listwise::resolver::ListMembershipResolver;
use listwise::runner::ActionRunner;
use listwise::sweep::SweepScheduler;

/// How often the compactor checks the journal's append count.
const COMPACT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    listwise::observability::init(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let engine = Arc::new(Engine::new(config.journal_path())?);
    let store: Arc<dyn Datastore> = engine.clone();

    let catalog = match &config.catalog_path {
        Some(path) => StaticCatalog::from_json_file(path)?,
        None => StaticCatalog::new(),
    };
    info!(
        "catalog: {} items, {} categories",
        catalog.item_count(),
        catalog.category_count()
    );
    let catalog: Arc<dyn CatalogLookup> = Arc::new(catalog);

    let mut registry = KindRegistry::new();
    registry.register(ActionKind::new("log", "Log Action", Arc::new(LogEffect)))?;

    let resolver = Arc::new(
        ListMembershipResolver::new(store.clone(), catalog, config.codec()?)
            .with_title_template(config.default_title.clone()),
    );
    let runner = Arc::new(ActionRunner::new(store.clone(), Arc::new(registry), resolver));
    let scheduler = Arc::new(SweepScheduler::new(runner, store, config.sweep_concurrency));

    info!("listwise started");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  lists: {}, actions: {}", engine.list_count(), engine.action_count());
    info!("  sweep: every {:?}, concurrency {}", config.sweep_interval, config.sweep_concurrency);
    info!("  metrics: {}", config.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let sweeper = tokio::spawn(background::run_sweeper(scheduler, config.sweep_interval));
    let compactor = tokio::spawn(background::run_compactor(
        engine.clone(),
        config.compact_threshold,
        COMPACT_CHECK_INTERVAL,
    ));

    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await?;
    }

    info!("shutdown signal received");
    sweeper.abort();
    compactor.abort();
    // Saves are journaled before they return, so only a final compaction is left.
    if let Err(e) = engine.compact().await {
        tracing::warn!("final compaction failed: {e}");
    }
    info!("listwise stopped");
    Ok(())
}
