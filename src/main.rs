// src/main.rs

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, patch, post},
};
use tokio::net::TcpListener;

use crate::config::AppState;
use crate::middleware::auth::auth_guard;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod notifications;
mod services;

#[tokio::main]
async fn main() {
    // Inicializa o sistema de logs (tracing)
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação");

    // Roda as migrações pendentes antes de aceitar tráfego
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao executar as migrações do banco de dados");

    tracing::info!("✅ Migrações aplicadas com sucesso!");

    // Rotas do painel, todas atrás do guardião de JWT
    let lead_routes = Router::new()
        .route("/api/leads", get(handlers::leads::list_leads).post(handlers::leads::create_lead))
        .route("/api/leads/export.csv", get(handlers::leads::export_leads))
        .route("/api/leads/{id}", patch(handlers::leads::update_lead))
        .route("/api/leads/{id}/events", get(handlers::leads::list_lead_events))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/public-config", get(handlers::bookings::public_config))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/reminders/run",
            get(handlers::reminders::run).post(handlers::reminders::run),
        )
        .route("/api/docs/openapi.json", get(docs::openapi_json))
        .merge(lead_routes)
        .with_state(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Falha ao vincular a porta 3000");

    tracing::info!("🚀 Servidor ouvindo em {}", listener.local_addr().unwrap());

    axum::serve(listener, app)
        .await
        .expect("Falha ao iniciar o servidor");
}
