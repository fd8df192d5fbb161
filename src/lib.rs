pub mod app_state;
pub mod cache;
pub mod chat;
pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod health;
pub mod middleware;
pub mod router;
pub mod scrape;
pub mod store;
pub mod telemetry;
