//! Polls Backend
//!
//! Publishes poll questions, records one vote per user per question and serves
//! results, with SQLite persistence and Tantivy search for administrators.

mod api;
mod auth;
mod clock;
mod config;
mod db;
mod errors;
mod models;
mod polls;
mod search;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::{AuthEvents, TracingAuditObserver};
use clock::{Clock, SystemClock};
use config::Config;
use db::Repository;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub auth_events: Arc<AuthEvents>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Polls Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_psk.is_none() {
        tracing::warn!("No admin PSK configured (POLLS_ADMIN_PSK). Admin API is unprotected!");
    }

    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let search = Arc::new(SearchIndex::open(&config.index_path)?);
    tracing::info!("Building search index...");
    let questions = repo.list_questions_with_choices().await?;
    search.rebuild(&questions).await?;

    let mut auth_events = AuthEvents::new();
    auth_events.register(Arc::new(TracingAuditObserver));

    let state = AppState {
        repo,
        search,
        config: Arc::new(config.clone()),
        clock: Arc::new(SystemClock),
        auth_events: Arc::new(auth_events),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.admin_psk.clone();

    let admin_routes = Router::new()
        .route(
            "/questions",
            get(api::list_questions).post(api::create_question),
        )
        .route("/questions/search", get(api::search_questions))
        .route(
            "/questions/{id}",
            get(api::get_question)
                .put(api::update_question)
                .delete(api::delete_question),
        )
        .route("/questions/{id}/choices", post(api::add_choice))
        .route("/choices/{id}", delete(api::delete_choice))
        .route("/users", post(api::create_user))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    let public_routes = Router::new()
        .route("/", get(api::root))
        .route("/polls/", get(api::index))
        .route("/polls/{id}/", get(api::detail))
        .route("/polls/{id}/results/", get(api::results))
        .route("/polls/{id}/vote/", post(api::vote))
        .route("/accounts/login/", post(api::login))
        .route("/accounts/logout/", post(api::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_layer,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/admin", admin_routes)
        .merge(public_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
