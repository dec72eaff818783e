pub mod auth;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use crate::database::store::PgStore;
use crate::engine::RoleTransitionEngine;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RoleTransitionEngine<PgStore>>,
}
