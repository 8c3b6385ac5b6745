// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::ApiError,
    config::AppState,
    models::ator::{Ator, Claims, MetadadosRequisicao},
};

// A emissão de credenciais é do colaborador externo de autenticação; aqui o
// token só é validado e vira a tupla de ator que todo o núcleo consome.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    cabecalho: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(autorizacao) = cabecalho
        .ok_or_else(|| ApiError::nao_autenticado("Cabeçalho Authorization ausente."))?;

    let token_data = decode::<Claims>(
        autorizacao.token(),
        &DecodingKey::from_secret(app_state.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::nao_autenticado("Token de autenticação inválido."))?;

    let ator: Ator = token_data.claims.into();
    let metadados = extrair_metadados(request.headers());

    // Disponibiliza o ator e os metadados para extratores e handlers
    request.extensions_mut().insert(ator);
    request.extensions_mut().insert(metadados);

    Ok(next.run(request).await)
}

// IP e user-agent alimentam a trilha de auditoria.
fn extrair_metadados(headers: &axum::http::HeaderMap) -> MetadadosRequisicao {
    let ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim().to_string());

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    MetadadosRequisicao { ip, user_agent }
}

// Extrator para obter o ator autenticado diretamente nos handlers
pub struct AtorAutenticado(pub Ator);

impl<S> FromRequestParts<S> for AtorAutenticado
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Ator>()
            .cloned()
            .map(AtorAutenticado)
            .ok_or_else(|| ApiError::nao_autenticado("Requisição sem ator autenticado."))
    }
}

/// Metadados da requisição, para gravação no histórico.
pub struct Metadados(pub MetadadosRequisicao);

impl<S> FromRequestParts<S> for Metadados
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Metadados(
            parts
                .extensions
                .get::<MetadadosRequisicao>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}
