// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use uuid::Uuid;

use crate::{common::error::ApiError, models::ator::Ator};

// Cabeçalho usado pelo super_admin para operar sobre outro município
// (suporte de plataforma). Para qualquer outro papel ele é ignorado: o
// tenant vem sempre da identidade resolvida no token.
const TENANT_ID_HEADER: &str = "x-tenant-id";

#[derive(Debug, Clone)]
pub struct ContextoTenant(pub Uuid);

impl<S> FromRequestParts<S> for ContextoTenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ator = parts
            .extensions
            .get::<Ator>()
            .ok_or_else(|| ApiError::nao_autenticado("Requisição sem ator autenticado."))?;

        let cabecalho = parts.headers.get(TENANT_ID_HEADER);

        match cabecalho {
            Some(valor) if ator.papel == crate::models::ator::Papel::SuperAdmin => {
                let texto = valor.to_str().map_err(|_| {
                    ApiError::requisicao_invalida("Cabeçalho X-Tenant-Id contém caracteres inválidos.")
                })?;
                let tenant_id = Uuid::parse_str(texto).map_err(|_| {
                    ApiError::requisicao_invalida("Cabeçalho X-Tenant-Id não é um UUID.")
                })?;
                Ok(ContextoTenant(tenant_id))
            }
            _ => Ok(ContextoTenant(ator.tenant_id)),
        }
    }
}
