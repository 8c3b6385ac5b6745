// src/handlers/protocolos.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    db::protocolo_repo::EdicaoCampos,
    middleware::{
        auth::{AtorAutenticado, Metadados},
        i18n::Locale,
        tenancy::ContextoTenant,
    },
    models::protocolo::{Prioridade, Protocolo, Requerente, StatusProtocolo},
    services::protocolo_service::DadosCriacao,
};

// =============================================================================
//  1. ABERTURA
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequerentePayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Maria da Silva")]
    pub nome: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "123.456.789-00")]
    pub documento: String,

    #[validate(email(message = "invalid"))]
    pub email: Option<String>,

    pub telefone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CriarProtocoloPayload {
    pub servico_id: Uuid,

    #[validate(length(min = 3, message = "required"))]
    #[schema(example = "Buraco na Rua das Flores")]
    pub titulo: String,

    #[validate(length(min = 1, message = "required"))]
    pub descricao: String,

    #[validate(nested)]
    pub requerente: RequerentePayload,

    pub prioridade: Option<Prioridade>,

    #[serde(default)]
    pub urgente: bool,

    pub subcategoria: Option<String>,

    /// Campos dinâmicos do formulário do serviço.
    pub formulario: Option<serde_json::Value>,
}

// POST /api/protocolos
#[utoipa::path(
    post,
    path = "/api/protocolos",
    tag = "Protocolos",
    request_body = CriarProtocoloPayload,
    responses(
        (status = 201, description = "Protocolo aberto com número reservado", body = Protocolo),
        (status = 403, description = "Tenant suspenso ou quota excedida"),
        (status = 422, description = "Serviço inválido para o tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn criar_protocolo(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    tenant: ContextoTenant,
    metadados: Metadados,
    Json(payload): Json<CriarProtocoloPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let dados = DadosCriacao {
        servico_id: payload.servico_id,
        titulo: payload.titulo,
        descricao: payload.descricao,
        requerente: Requerente {
            nome: payload.requerente.nome,
            documento: payload.requerente.documento,
            email: payload.requerente.email,
            telefone: payload.requerente.telefone,
        },
        prioridade: payload.prioridade,
        urgente: payload.urgente,
        subcategoria: payload.subcategoria,
        formulario: payload.formulario,
    };

    let protocolo = app_state
        .protocolo_service
        .criar(&ator.0, tenant.0, &metadados.0, dados)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(protocolo)))
}

// =============================================================================
//  2. CONSULTA
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListagemQuery {
    pub status: Option<StatusProtocolo>,
    pub limite: Option<i64>,
    pub deslocamento: Option<i64>,
}

// GET /api/protocolos
#[utoipa::path(
    get,
    path = "/api/protocolos",
    tag = "Protocolos",
    params(ListagemQuery),
    responses(
        (status = 200, description = "Protocolos visíveis para o papel do ator", body = [Protocolo])
    ),
    security(("api_jwt" = []))
)]
pub async fn listar_protocolos(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    tenant: ContextoTenant,
    Query(consulta): Query<ListagemQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let protocolos = app_state
        .protocolo_service
        .listar(
            &ator.0,
            tenant.0,
            consulta.status,
            consulta.limite.unwrap_or(50).clamp(1, 200),
            consulta.deslocamento.unwrap_or(0).max(0),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(protocolos))
}

// GET /api/protocolos/{id}
#[utoipa::path(
    get,
    path = "/api/protocolos/{id}",
    tag = "Protocolos",
    params(("id" = Uuid, Path, description = "ID do Protocolo")),
    responses(
        (status = 200, body = Protocolo),
        (status = 403, description = "Protocolo de outro tenant ou fora do alcance do papel"),
        (status = 404, description = "Não existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn obter_protocolo(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let protocolo = app_state
        .protocolo_service
        .obter(&ator.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(protocolo))
}

// GET /api/protocolos/{id}/historico
#[utoipa::path(
    get,
    path = "/api/protocolos/{id}/historico",
    tag = "Protocolos",
    params(("id" = Uuid, Path, description = "ID do Protocolo")),
    responses(
        (status = 200, description = "Trilha completa ordenada; cidadão vê só as entradas públicas",
         body = [crate::models::historico::HistoricoProtocolo])
    ),
    security(("api_jwt" = []))
)]
pub async fn historico_protocolo(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let historico = app_state
        .protocolo_service
        .historico(&ator.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(historico))
}

// GET /api/protocolos/{id}/documentos
#[utoipa::path(
    get,
    path = "/api/protocolos/{id}/documentos",
    tag = "Protocolos",
    params(("id" = Uuid, Path, description = "ID do Protocolo")),
    responses(
        (status = 200, body = [crate::models::protocolo::DocumentoProtocolo])
    ),
    security(("api_jwt" = []))
)]
pub async fn listar_documentos(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let documentos = app_state
        .protocolo_service
        .documentos(&ator.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(documentos))
}

// =============================================================================
//  3. TRANSIÇÃO DE STATUS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransicaoPayload {
    #[schema(example = "em_andamento")]
    pub novo_status: StatusProtocolo,

    pub nota: Option<String>,
}

// POST /api/protocolos/{id}/transicao
#[utoipa::path(
    post,
    path = "/api/protocolos/{id}/transicao",
    tag = "Protocolos",
    request_body = TransicaoPayload,
    params(("id" = Uuid, Path, description = "ID do Protocolo")),
    responses(
        (status = 200, description = "Status alterado + entrada de histórico, atomicamente", body = Protocolo),
        (status = 409, description = "Modificação concorrente detectada"),
        (status = 422, description = "Aresta fora da tabela de transições")
    ),
    security(("api_jwt" = []))
)]
pub async fn transicionar_protocolo(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    metadados: Metadados,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransicaoPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let protocolo = app_state
        .protocolo_service
        .transicionar(&ator.0, id, payload.novo_status, payload.nota, &metadados.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(protocolo))
}

// =============================================================================
//  4. EDIÇÃO DE CAMPOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditarProtocoloPayload {
    #[validate(length(min = 3, message = "required"))]
    pub titulo: Option<String>,

    pub descricao: Option<String>,
    pub prioridade: Option<Prioridade>,
    pub urgente: Option<bool>,
    pub observacoes_internas: Option<String>,
    pub observacoes_publicas: Option<String>,
    pub desconto: Option<Decimal>,
    pub valor_multa: Option<Decimal>,
    pub formulario: Option<serde_json::Value>,
}

// PATCH /api/protocolos/{id}
#[utoipa::path(
    patch,
    path = "/api/protocolos/{id}",
    tag = "Protocolos",
    request_body = EditarProtocoloPayload,
    params(("id" = Uuid, Path, description = "ID do Protocolo")),
    responses(
        (status = 200, description = "Uma entrada de histórico por campo alterado", body = Protocolo)
    ),
    security(("api_jwt" = []))
)]
pub async fn editar_protocolo(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    metadados: Metadados,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditarProtocoloPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let edicao = EdicaoCampos {
        titulo: payload.titulo,
        descricao: payload.descricao,
        prioridade: payload.prioridade,
        urgente: payload.urgente,
        observacoes_internas: payload.observacoes_internas,
        observacoes_publicas: payload.observacoes_publicas,
        desconto: payload.desconto,
        valor_multa: payload.valor_multa,
        formulario: payload.formulario,
    };

    let protocolo = app_state
        .protocolo_service
        .editar(&ator.0, id, edicao, &metadados.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(protocolo))
}

// =============================================================================
//  5. ATRIBUIÇÃO, COMENTÁRIOS, ANEXOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AtribuirPayload {
    pub responsavel_id: Uuid,
    pub supervisor_id: Option<Uuid>,
}

// POST /api/protocolos/{id}/atribuir
#[utoipa::path(
    post,
    path = "/api/protocolos/{id}/atribuir",
    tag = "Protocolos",
    request_body = AtribuirPayload,
    params(("id" = Uuid, Path, description = "ID do Protocolo")),
    responses(
        (status = 200, description = "Responsável definido (supervisor ou acima)", body = Protocolo)
    ),
    security(("api_jwt" = []))
)]
pub async fn atribuir_protocolo(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    metadados: Metadados,
    Path(id): Path<Uuid>,
    Json(payload): Json<AtribuirPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let protocolo = app_state
        .protocolo_service
        .atribuir(&ator.0, id, payload.responsavel_id, payload.supervisor_id, &metadados.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(protocolo))
}

fn padrao_publico() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComentarioPayload {
    #[validate(length(min = 1, message = "required"))]
    pub texto: String,

    /// false = nota interna, invisível para o cidadão (apenas servidores).
    #[serde(default = "padrao_publico")]
    pub publico: bool,
}

// POST /api/protocolos/{id}/comentarios
#[utoipa::path(
    post,
    path = "/api/protocolos/{id}/comentarios",
    tag = "Protocolos",
    request_body = ComentarioPayload,
    params(("id" = Uuid, Path, description = "ID do Protocolo")),
    responses(
        (status = 201, body = crate::models::historico::HistoricoProtocolo)
    ),
    security(("api_jwt" = []))
)]
pub async fn comentar_protocolo(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    metadados: Metadados,
    Path(id): Path<Uuid>,
    Json(payload): Json<ComentarioPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let entrada = app_state
        .protocolo_service
        .comentar(&ator.0, id, payload.texto, payload.publico, &metadados.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(entrada)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnexarDocumentoPayload {
    /// Referência opaca; o binário mora no armazenamento do colaborador.
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "s3://prefeitura/anexos/laudo.pdf")]
    pub uri: String,

    #[validate(length(min = 1, message = "required"))]
    pub nome_arquivo: String,

    #[schema(example = "application/pdf")]
    pub mime_type: String,

    pub tamanho_bytes: i64,
}

// POST /api/protocolos/{id}/documentos
#[utoipa::path(
    post,
    path = "/api/protocolos/{id}/documentos",
    tag = "Protocolos",
    request_body = AnexarDocumentoPayload,
    params(("id" = Uuid, Path, description = "ID do Protocolo")),
    responses(
        (status = 201, body = crate::models::protocolo::DocumentoProtocolo)
    ),
    security(("api_jwt" = []))
)]
pub async fn anexar_documento(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    metadados: Metadados,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnexarDocumentoPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let documento = app_state
        .protocolo_service
        .anexar_documento(
            &ator.0,
            id,
            payload.uri,
            payload.nome_arquivo,
            payload.mime_type,
            payload.tamanho_bytes,
            &metadados.0,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(documento)))
}

// =============================================================================
//  6. REAGENDAMENTO E PAGAMENTO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReagendarPayload {
    pub nova_data_limite: DateTime<Utc>,

    #[validate(length(min = 1, message = "required"))]
    pub justificativa: String,
}

// POST /api/protocolos/{id}/reagendar
#[utoipa::path(
    post,
    path = "/api/protocolos/{id}/reagendar",
    tag = "Protocolos",
    request_body = ReagendarPayload,
    params(("id" = Uuid, Path, description = "ID do Protocolo")),
    responses(
        (status = 200, description = "Prazo alterado com justificativa auditada", body = Protocolo)
    ),
    security(("api_jwt" = []))
)]
pub async fn reagendar_protocolo(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    metadados: Metadados,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReagendarPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let protocolo = app_state
        .protocolo_service
        .reagendar(&ator.0, id, payload.nova_data_limite, payload.justificativa, &metadados.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(protocolo))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PagamentoPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "pix")]
    pub metodo: String,
}

// POST /api/protocolos/{id}/pagamento
#[utoipa::path(
    post,
    path = "/api/protocolos/{id}/pagamento",
    tag = "Protocolos",
    request_body = PagamentoPayload,
    params(("id" = Uuid, Path, description = "ID do Protocolo")),
    responses(
        (status = 200, description = "Pagamento registrado (não condiciona o status)", body = Protocolo)
    ),
    security(("api_jwt" = []))
)]
pub async fn registrar_pagamento(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    metadados: Metadados,
    Path(id): Path<Uuid>,
    Json(payload): Json<PagamentoPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let protocolo = app_state
        .protocolo_service
        .registrar_pagamento(&ator.0, id, payload.metodo, &metadados.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(protocolo))
}

// =============================================================================
//  7. AVALIAÇÃO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvaliacaoPayload {
    #[validate(range(min = 1, max = 5, message = "range"))]
    #[schema(example = 5)]
    pub nota: i16,

    pub comentario: Option<String>,
}

// POST /api/protocolos/{id}/avaliacao
#[utoipa::path(
    post,
    path = "/api/protocolos/{id}/avaliacao",
    tag = "Protocolos",
    request_body = AvaliacaoPayload,
    params(("id" = Uuid, Path, description = "ID do Protocolo")),
    responses(
        (status = 200, description = "Avaliação registrada (uma única vez)", body = Protocolo),
        (status = 409, description = "Já avaliado"),
        (status = 422, description = "Protocolo ainda não concluído")
    ),
    security(("api_jwt" = []))
)]
pub async fn avaliar_protocolo(
    State(app_state): State<AppState>,
    locale: Locale,
    ator: AtorAutenticado,
    metadados: Metadados,
    Path(id): Path<Uuid>,
    Json(payload): Json<AvaliacaoPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let protocolo = app_state
        .avaliacao_service
        .avaliar(&ator.0, id, payload.nota, payload.comentario, &metadados.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(protocolo))
}
