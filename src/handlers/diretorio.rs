// src/handlers/diretorio.rs

use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AtorAutenticado, i18n::Locale, tenancy::ContextoTenant},
    models::{catalogo::ServicoCatalogo, diretorio::Secretaria},
};

// GET /api/secretarias
#[utoipa::path(
    get,
    path = "/api/secretarias",
    tag = "Diretorio",
    responses(
        (status = 200, description = "Secretarias do município", body = [Secretaria])
    ),
    security(("api_jwt" = []))
)]
pub async fn listar_secretarias(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    tenant: ContextoTenant,
) -> Result<impl IntoResponse, ApiError> {
    let secretarias = app_state
        .diretorio_service
        .listar_secretarias(&ator.0, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(secretarias))
}

// GET /api/servicos
#[utoipa::path(
    get,
    path = "/api/servicos",
    tag = "Diretorio",
    responses(
        (status = 200, description = "Catálogo de serviços ativos do município", body = [ServicoCatalogo])
    ),
    security(("api_jwt" = []))
)]
pub async fn listar_servicos(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    tenant: ContextoTenant,
) -> Result<impl IntoResponse, ApiError> {
    let servicos = app_state
        .diretorio_service
        .listar_servicos(&ator.0, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(servicos))
}
