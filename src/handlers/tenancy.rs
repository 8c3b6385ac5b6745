// src/handlers/tenancy.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AtorAutenticado, i18n::Locale, tenancy::ContextoTenant},
    models::tenancy::{PlanoTenant, StatusTenant, Tenant},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionarTenantPayload {
    #[validate(length(min = 3, message = "required"))]
    #[schema(example = "springfield")]
    pub slug: String,

    #[validate(length(min = 3, message = "required"))]
    #[schema(example = "Prefeitura de Springfield")]
    pub nome: String,

    pub plano: PlanoTenant,

    #[schema(example = 25)]
    pub max_usuarios: Option<i32>,

    #[schema(example = 5000)]
    pub max_protocolos: Option<i32>,

    #[schema(example = 20)]
    pub armazenamento_gb: Option<i32>,
}

// POST /api/tenants
#[utoipa::path(
    post,
    path = "/api/tenants",
    tag = "Tenancy",
    request_body = ProvisionarTenantPayload,
    responses(
        (status = 201, description = "Município provisionado em trial", body = Tenant),
        (status = 403, description = "Apenas super_admin")
    ),
    security(("api_jwt" = []))
)]
pub async fn provisionar_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    Json(payload): Json<ProvisionarTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let tenant = app_state
        .tenancy_service
        .provisionar(
            &ator.0,
            &payload.slug,
            &payload.nome,
            payload.plano,
            payload.max_usuarios.unwrap_or(10),
            payload.max_protocolos.unwrap_or(1000),
            payload.armazenamento_gb.unwrap_or(5),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(tenant)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlterarStatusTenantPayload {
    #[schema(example = "suspenso")]
    pub status: StatusTenant,
}

// POST /api/tenants/{id}/status
#[utoipa::path(
    post,
    path = "/api/tenants/{id}/status",
    tag = "Tenancy",
    request_body = AlterarStatusTenantPayload,
    params(("id" = Uuid, Path, description = "ID do Tenant")),
    responses(
        (status = 200, description = "Status alterado (suspensão/reativação); nunca apaga", body = Tenant)
    ),
    security(("api_jwt" = []))
)]
pub async fn alterar_status_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    Path(id): Path<Uuid>,
    Json(payload): Json<AlterarStatusTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = app_state
        .tenancy_service
        .alterar_status(&ator.0, id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tenant))
}

// GET /api/tenants/atual
#[utoipa::path(
    get,
    path = "/api/tenants/atual",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Dados e limites do município do ator", body = Tenant)
    ),
    security(("api_jwt" = []))
)]
pub async fn obter_tenant_atual(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    tenant: ContextoTenant,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = app_state
        .tenancy_service
        .obter(&ator.0, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tenant))
}
