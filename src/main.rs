use std::{future::IntoFuture, process, sync::Arc};

use memoapp::{
    application::{
        dispatch::Dispatcher,
        error::AppError,
        repos::{CachePopulator, OperationContext, RepoError},
        selector::{RepositorySelector, Selection},
    },
    cache::{CacheConfig, CacheRefresher, CacheTrigger, EventQueue, RefreshOutcome},
    config,
    infra::{
        db::PostgresConnector,
        error::InfraError,
        http::{self, HttpState, SelectionView},
        redis::RedisConnector,
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Probe(_) => run_probe(settings).await,
        config::Command::Warm(_) => run_warm(settings).await,
    }
}

struct Backends {
    cache: Arc<RedisConnector>,
    store: Arc<PostgresConnector>,
}

fn init_connectors(settings: &config::Settings, migrate: bool) -> Result<Backends, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;
    let cache_url = settings
        .cache
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("cache url is not configured"))?;

    Ok(Backends {
        cache: Arc::new(RedisConnector::new(
            cache_url.clone(),
            settings.cache.listing_key.clone(),
        )),
        store: Arc::new(
            PostgresConnector::new(
                database_url.clone(),
                settings.database.max_connections.get(),
            )
            .with_migrations(migrate),
        ),
    })
}

async fn select(settings: &config::Settings, backends: &Backends) -> Result<Selection, AppError> {
    let ctx = OperationContext::from_timeout(settings.backend.timeout);
    RepositorySelector::new(backends.cache.clone(), backends.store.clone())
        .select(&ctx)
        .await
        .map_err(AppError::selection)
}

fn build_trigger(
    settings: &config::Settings,
    selection: &Selection,
    populator: Arc<dyn CachePopulator>,
) -> Arc<CacheTrigger> {
    let queue = Arc::new(EventQueue::new());
    let refresher = Arc::new(
        CacheRefresher::new(
            CacheConfig::from(&settings.cache),
            queue.clone(),
            selection.handle().clone(),
            populator,
        )
        .with_timeout(settings.backend.timeout),
    );
    Arc::new(CacheTrigger::new(queue, refresher))
}

async fn open_populator(backends: &Backends) -> Result<Arc<dyn CachePopulator>, AppError> {
    let cache = backends
        .cache
        .open()
        .await
        .map_err(|err: RepoError| AppError::from(InfraError::cache(err.to_string())))?;
    Ok(Arc::new(cache))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let backends = init_connectors(&settings, true)?;
    let selection = select(&settings, &backends).await?;
    let populator = open_populator(&backends).await?;
    let trigger = build_trigger(&settings, &selection, populator);

    info!(
        target = "memoapp::serve",
        backend = %selection.backend(),
        cache_backed = selection.is_cache_backed(),
        refresh_mode = trigger.refresher().mode().as_str(),
        "Repository selected"
    );

    // Picks up events left over when a batch hit its limit.
    let consume_handle = {
        let refresher = trigger.refresher().clone();
        let interval = settings.cache.auto_consume_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            interval.tick().await;
            loop {
                interval.tick().await;
                refresher.consume().await;
            }
        })
    };

    let dispatcher = Dispatcher::new(selection, trigger, settings.backend.timeout);
    let result = serve_http(&settings, HttpState::new(dispatcher)).await;

    consume_handle.abort();
    let _ = consume_handle.await;

    result
}

async fn run_probe(settings: config::Settings) -> Result<(), AppError> {
    let backends = init_connectors(&settings, false)?;
    let selection = select(&settings, &backends).await?;

    let view = SelectionView {
        cache_backed: selection.is_cache_backed(),
        backend: selection.backend(),
    };
    let rendered = serde_json::to_string(&view)
        .map_err(|err| AppError::unexpected(format!("failed to render selection: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn run_warm(settings: config::Settings) -> Result<(), AppError> {
    let backends = init_connectors(&settings, false)?;
    let selection = select(&settings, &backends).await?;
    let populator = open_populator(&backends).await?;
    let trigger = build_trigger(&settings, &selection, populator);

    match trigger.warm_now().await {
        RefreshOutcome::Refreshed { .. } => {
            info!(
                target = "memoapp::warm",
                key = %settings.cache.listing_key,
                "Cached listing materialized"
            );
            Ok(())
        }
        outcome => Err(AppError::unexpected(format!(
            "cache warm did not complete: {outcome:?}"
        ))),
    }
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "memoapp::serve", addr = %settings.server.addr, "Listening");

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let shutdown = async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for shutdown signal");
        }
        info!(target = "memoapp::serve", "Shutdown signal received; draining");
        let _ = signalled_tx.send(());
    };

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .into_future();
    tokio::pin!(server);

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        _ = async {
            if signalled_rx.await.is_ok() {
                tokio::time::sleep(grace).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            warn!(
                target = "memoapp::serve",
                grace_secs = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}
