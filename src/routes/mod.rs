// Route exports
pub mod auth;
pub mod error;
pub mod health;
pub mod matches;
pub mod users;

use actix_web::web;
use std::sync::Arc;

use crate::config::DiscoverySettings;
use crate::core::Engine;
use crate::services::CacheManager;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub discovery: DiscoverySettings,
    pub cache: Option<Arc<CacheManager>>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(matches::configure)
            .configure(users::configure),
    );
}
