// src/main.rs

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use protocolo_backend::config::AppState;
use protocolo_backend::handlers;
use protocolo_backend::docs;
use protocolo_backend::middleware::auth::auth_guard;
use protocolo_backend::services::event_bus::{iniciar_assinante, AssinanteNotificacoes};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é adequado aqui: sem configuração válida a aplicação não
    // deve subir.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("migrações do banco de dados executadas");

    // O colaborador de notificações consome os eventos de domínio em uma
    // task própria: lentidão ali nunca trava uma mutação de protocolo.
    let _notificador = iniciar_assinante(&app_state.event_bus, Arc::new(AssinanteNotificacoes));

    // Rotas de protocolo (todas exigem o token do colaborador de auth)
    let protocolo_routes = Router::new()
        .route("/"
               , post(handlers::protocolos::criar_protocolo)
               .get(handlers::protocolos::listar_protocolos)
        )
        .route("/{id}"
               , get(handlers::protocolos::obter_protocolo)
               .patch(handlers::protocolos::editar_protocolo)
        )
        .route("/{id}/transicao", post(handlers::protocolos::transicionar_protocolo))
        .route("/{id}/atribuir", post(handlers::protocolos::atribuir_protocolo))
        .route("/{id}/comentarios", post(handlers::protocolos::comentar_protocolo))
        .route("/{id}/documentos"
               , post(handlers::protocolos::anexar_documento)
               .get(handlers::protocolos::listar_documentos)
        )
        .route("/{id}/reagendar", post(handlers::protocolos::reagendar_protocolo))
        .route("/{id}/pagamento", post(handlers::protocolos::registrar_pagamento))
        .route("/{id}/avaliacao", post(handlers::protocolos::avaliar_protocolo))
        .route("/{id}/historico", get(handlers::protocolos::historico_protocolo))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let tenancy_routes = Router::new()
        .route("/", post(handlers::tenancy::provisionar_tenant))
        .route("/atual", get(handlers::tenancy::obter_tenant_atual))
        .route("/{id}/status", post(handlers::tenancy::alterar_status_tenant))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let diretorio_routes = Router::new()
        .route("/secretarias", get(handlers::diretorio::listar_secretarias))
        .route("/servicos", get(handlers::diretorio::listar_servicos))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/protocolos", protocolo_routes)
        .nest("/api/tenants", tenancy_routes)
        .nest("/api", diretorio_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
