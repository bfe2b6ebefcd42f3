use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use swapmeet_api::firebase::FirebaseVerifier;
use swapmeet_api::middleware::require_auth;
use swapmeet_api::{AppState, AppStateInner, chats, items, messages, products, profile};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swapmeet=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let project_id = std::env::var("FIREBASE_PROJECT_ID")
        .context("FIREBASE_PROJECT_ID must be set")?;
    let db_path = std::env::var("SWAPMEET_DB_PATH").unwrap_or_else(|_| "swapmeet.db".into());
    let host = std::env::var("SWAPMEET_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SWAPMEET_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;

    // Init database
    let db = swapmeet_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        verifier: FirebaseVerifier::new(project_id),
    });

    // Routes
    let public_routes = Router::new()
        .route("/items/", get(items::list_items))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route(
            "/api/profile/",
            get(profile::get_profile)
                .put(profile::update_profile)
                .patch(profile::update_profile),
        )
        .route(
            "/api/my-products/",
            get(products::list_my_products).post(products::create_product),
        )
        .route(
            "/api/my-products/{id}/",
            get(products::get_my_product)
                .put(products::update_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .route("/api/products/", get(products::list_all_products))
        .route("/api/products/{id}/like/", post(products::toggle_product_like))
        .route("/api/my-chats/", get(chats::list_my_chats))
        .route("/api/chats/create/", post(chats::create_chat_room))
        .route("/api/chats/{id}/", get(chats::get_chat_room))
        .route(
            "/api/chats/{id}/messages/",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/api/chats/{id}/mark-read/", post(messages::mark_messages_read))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("swapmeet server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
