//! Authentication service: JWT sessions, password reset by emailed code,
//! and per-client rate limiting over HTTP.
//!
//! Backends are chosen from the environment. PostgreSQL, Redis and the
//! notification service are each optional and fall back to in-memory or
//! log-only stand-ins for development.

use std::{
    net::SocketAddr,
    sync::{Arc, Weak},
    time::Duration,
};

use anyhow::{Context, Error};
use keyward::{
    cache::{KeyValueCache, MemoryCache, RedisCache},
    db::{CachedUserRepository, Database, MemoryUserRepository, PgUserRepository, UserRepository},
    notify::{HttpNotifier, LogNotifier, Notifier},
};
use kw_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use pico_args::Arguments;
use tracing::{debug, info, warn};

const HELP: &str = "\
Run the keyward authentication server

USAGE:
  kw_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL, else in-memory store]

FLAGS:
  --migrate                Run database migrations before serving
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  REDIS_URL                Redis connection string for reset challenges and user cache
  NOTIFICATION_URL         Notification service base URL
  JWT_SECRET               JWT signing secret (required, at least 32 characters)
  PASSWORD_PEPPER          Password hashing pepper
  LOG_FORMAT               text or json
  (See .env.example for all configuration options)
";

const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
        migrate: pargs.contains("--migrate"),
    };

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    logging::init(config.log_format);
    info!("Starting keyward server at {}", config.bind);

    // User store
    let database = match &config.database {
        Some(db_config) => {
            let database = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            if args.migrate {
                database.migrate().await.context("Failed to run migrations")?;
                info!("Database migrations applied");
            }
            info!("Database connected successfully");
            Some(database)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory user store");
            None
        }
    };

    let store: Arc<dyn UserRepository> = match &database {
        Some(database) => Arc::new(PgUserRepository::new(database.pool().clone())),
        None => Arc::new(MemoryUserRepository::new()),
    };

    // Challenge store and user cache
    let redis = match &config.redis_url {
        Some(url) => {
            let redis = RedisCache::connect(url)
                .await
                .context("Failed to connect to Redis")?;
            info!("Redis connected successfully");
            Some(redis)
        }
        None => {
            warn!("REDIS_URL not set; using in-memory cache");
            None
        }
    };

    let cache: Arc<dyn KeyValueCache> = match &redis {
        Some(redis) => Arc::new(redis.clone()),
        None => {
            let memory = Arc::new(MemoryCache::new());
            spawn_cache_purge(Arc::downgrade(&memory));
            memory
        }
    };

    let users: Arc<dyn UserRepository> = Arc::new(CachedUserRepository::new(
        store,
        cache.clone(),
        config.user_cache_ttl,
    ));

    let notifier: Arc<dyn Notifier> = match &config.notification.url {
        Some(url) => Arc::new(
            HttpNotifier::new(
                url.clone(),
                config.notification.request_timeout,
                config.notification.retry,
            )
            .context("Failed to build notification client")?,
        ),
        None => {
            warn!("NOTIFICATION_URL not set; reset codes will be written to the log");
            Arc::new(LogNotifier)
        }
    };

    let mut state = AppState::new(&config, users, cache, notifier);
    if let Some(database) = database.clone() {
        state = state.with_database(database);
    }
    if let Some(redis) = redis {
        state = state.with_redis(redis);
    }
    if config.metrics_enabled {
        let handle = metrics::install_recorder().map_err(anyhow::Error::msg)?;
        state = state.with_metrics(handle);
    }

    state.limiters.spawn_sweepers();

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Shutting down server...");
    if let Some(database) = database {
        database.close().await;
    }

    Ok(())
}

/// Drop expired in-memory cache entries until the cache itself is dropped
fn spawn_cache_purge(cache: Weak<MemoryCache>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let Some(cache) = cache.upgrade() else {
                break;
            };
            let purged = cache.purge_expired().await;
            if purged > 0 {
                debug!("Purged {} expired cache entries", purged);
            }
        }
    });
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
