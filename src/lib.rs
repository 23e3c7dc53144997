use anyhow::Context;
use axum::{routing::get, Router};
use deadpool::managed::Pool;
use diesel_async::{pooled_connection::AsyncDieselConnectionManager, AsyncPgConnection};
use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod models;
pub mod repo;
pub mod roles;
pub mod roster;
pub mod sample;
pub mod schema;

use config::Config;
use repo::{DemoRepository, PgRepository, SharedRepo};

pub type DbPool = Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

pub fn connect_to_db(db_url: &str) -> anyhow::Result<DbPool> {
    let db_config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(db_url);
    Pool::builder(db_config)
        .build()
        .context("failed to build database pool")
}

/// Picks the storage backend once, at startup.
pub fn repository(config: &Config) -> anyhow::Result<SharedRepo> {
    match config.database_url() {
        Some(url) => {
            tracing::info!("using postgres storage");
            Ok(Arc::new(PgRepository::new(connect_to_db(url)?)))
        }
        None => {
            tracing::warn!("demo mode: serving in-memory sample data");
            Ok(Arc::new(DemoRepository::seeded()))
        }
    }
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(|| async { "Campus Club Management Suite Backend" }))
        .nest("/api", api::app())
}
