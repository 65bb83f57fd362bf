use crate::AppCore;
use axum::{Extension, Router, routing::get};
use std::sync::Arc;

use super::webhook;

pub fn build_router(core: Arc<AppCore>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/webhook", get(webhook::verify).post(webhook::receive))
        .layer(Extension(core))
}

async fn health_check() -> &'static str {
    "OK"
}
