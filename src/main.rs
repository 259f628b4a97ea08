use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use spark_match::config::{LoggingSettings, Settings};
use spark_match::core::{spawn_dislike_sweeper, Engine, EngineOptions};
use spark_match::routes::{self, auth::JwtKeys, error as route_error, AppState};
use spark_match::services::{
    CacheManager, CachedProfileStore, InteractionLog, MatchStore, MemoryStore, PostgresStore,
    ProfileStore,
};

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_tracing(&settings.logging);
    info!("Starting spark-match service...");

    let jwt_keys = JwtKeys::new(&settings.auth.jwt_secret);
    if !jwt_keys.is_configured() {
        error!("auth.jwt_secret is empty; refusing to start");
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "auth.jwt_secret must be set",
        ));
    }
    let jwt_keys = web::Data::new(jwt_keys);

    let (profiles, interactions, matches): (
        Arc<dyn ProfileStore>,
        Arc<dyn InteractionLog>,
        Arc<dyn MatchStore>,
    ) = match &settings.database.url {
        Some(url) => {
            let db = &settings.database;
            let store = Arc::new(
                PostgresStore::new(
                    url,
                    db.max_connections.unwrap_or(10),
                    db.min_connections.unwrap_or(1),
                    db.acquire_timeout(),
                    db.idle_timeout(),
                )
                .await
                .map_err(|e| {
                    error!("Failed to connect to PostgreSQL: {}", e);
                    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
                })?,
            );
            info!(
                "PostgreSQL store initialized (max: {} connections)",
                db.max_connections.unwrap_or(10)
            );
            (store.clone(), store.clone(), store)
        }
        None => {
            warn!("No database url configured, using the in-memory store");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store.clone(), store)
        }
    };

    // Redis is optional: the profile cache falls back to L1 only
    let cache_settings = &settings.cache;
    let cache = match &cache_settings.redis_url {
        Some(url) => match CacheManager::new(url, cache_settings.l1_size, cache_settings.ttl_secs).await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to connect to Redis ({}), using in-process cache only", e);
                CacheManager::l1_only(cache_settings.l1_size, cache_settings.ttl_secs)
            }
        },
        None => CacheManager::l1_only(cache_settings.l1_size, cache_settings.ttl_secs),
    };
    let cache = Arc::new(cache);
    info!(
        "Cache manager initialized (L1: {} entries, TTL: {}s, Redis: {})",
        cache_settings.l1_size,
        cache_settings.ttl_secs,
        cache.has_l2()
    );

    let profiles: Arc<dyn ProfileStore> =
        Arc::new(CachedProfileStore::new(profiles, cache.clone()));

    let engine = Engine::new(
        profiles,
        interactions.clone(),
        matches,
        EngineOptions {
            scoring_budget: settings.discovery.scoring_budget(),
            ..EngineOptions::default()
        },
    );

    info!(
        "Matching engine initialized (scoring budget: {:?})",
        settings.discovery.scoring_budget()
    );

    let sweeper = spawn_dislike_sweeper(
        interactions,
        settings.retention.dislike_retention(),
        settings.retention.sweep_interval(),
    );

    let app_state = AppState {
        engine,
        discovery: settings.discovery.clone(),
        cache: Some(cache),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(jwt_keys.clone())
            .app_data(web::JsonConfig::default().error_handler(route_error::handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(route_error::handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(route_error::handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await;

    sweeper.abort();
    info!("spark-match stopped");
    result
}
