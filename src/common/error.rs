// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::protocolo::StatusProtocolo;

// Taxonomia de erros do domínio. Toda operação rejeitada devolve um tipo
// estável daqui; a UI decide o que fazer (ex.: botão de repetir só para
// Conflict/Unavailable) a partir do código, nunca da mensagem.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    // Inclui violação de isolamento entre tenants: a existência do recurso
    // não é escondida, a política é sempre Forbidden.
    #[error("Acesso negado")]
    Forbidden,

    #[error("Transição de status inválida: {de:?} -> {para:?}")]
    IllegalTransition {
        de: StatusProtocolo,
        para: StatusProtocolo,
    },

    #[error("Protocolo já está em estado terminal ({de:?})")]
    AlreadyTerminal { de: StatusProtocolo },

    // Modificação concorrente detectada pela checagem otimista de pré-estado.
    // Devolvido ao chamador para que ELE decida repetir; o núcleo nunca
    // repete uma transição por conta própria.
    #[error("O protocolo foi modificado por outra operação")]
    Conflict,

    #[error("Limite de protocolos do plano foi atingido")]
    QuotaExceeded,

    #[error("Tenant suspenso ou cancelado não aceita novos protocolos")]
    TenantSuspended,

    #[error("Protocolo já foi avaliado")]
    AlreadyEvaluated,

    #[error("Protocolo não é elegível para avaliação")]
    NotEligible,

    #[error("Serviço do catálogo inválido para este tenant")]
    InvalidCatalogEntry,

    #[error("Token inválido")]
    InvalidToken,

    // Falha de infraestrutura (pool esgotada, IO). Única classe elegível
    // para retentativa transparente, e somente em leituras.
    #[error("Infraestrutura indisponível")]
    Unavailable,

    #[error("Erro de banco de dados")]
    DatabaseError(sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Unavailable
            }
            outro => AppError::DatabaseError(outro),
        }
    }
}

impl AppError {
    /// Código estável consumido pela UI e pelo catálogo i18n.
    pub fn codigo(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validacao",
            AppError::ResourceNotFound(_) => "nao_encontrado",
            AppError::Forbidden => "acesso_negado",
            AppError::IllegalTransition { .. } => "transicao_invalida",
            AppError::AlreadyTerminal { .. } => "estado_terminal",
            AppError::Conflict => "conflito_concorrencia",
            AppError::QuotaExceeded => "quota_excedida",
            AppError::TenantSuspended => "tenant_suspenso",
            AppError::AlreadyEvaluated => "ja_avaliado",
            AppError::NotEligible => "avaliacao_nao_elegivel",
            AppError::InvalidCatalogEntry => "servico_invalido",
            AppError::InvalidToken => "token_invalido",
            AppError::Unavailable => "indisponivel",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "erro_interno",
        }
    }

    pub fn eh_indisponibilidade(&self) -> bool {
        matches!(self, AppError::Unavailable)
    }

    fn status_http(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden | AppError::QuotaExceeded | AppError::TenantSuspended => {
                StatusCode::FORBIDDEN
            }
            AppError::IllegalTransition { .. }
            | AppError::AlreadyTerminal { .. }
            | AppError::NotEligible
            | AppError::InvalidCatalogEntry => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict | AppError::AlreadyEvaluated => StatusCode::CONFLICT,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converte para a resposta HTTP com a mensagem no idioma negociado.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let detalhes = match self {
            AppError::ValidationError(erros) => {
                let mut campos = std::collections::HashMap::new();
                for (campo, erros_campo) in erros.field_errors() {
                    let mensagens: Vec<String> = erros_campo
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    campos.insert(campo.to_string(), mensagens);
                }
                Some(json!(campos))
            }
            AppError::IllegalTransition { de, para } => Some(json!({ "de": de, "para": para })),
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                // O detalhe vai para o log, nunca para o cliente.
                tracing::error!("erro interno: {:?}", self);
                None
            }
            _ => None,
        };

        ApiError {
            status: self.status_http(),
            codigo: self.codigo(),
            mensagem: i18n.mensagem(&locale.0, self.codigo()).to_string(),
            detalhes,
        }
    }
}

// ---
// ApiError: a forma que atravessa o fio
// ---

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub codigo: &'static str,
    pub mensagem: String,
    pub detalhes: Option<serde_json::Value>,
}

impl ApiError {
    pub fn nao_autenticado(mensagem: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            codigo: "token_invalido",
            mensagem: mensagem.to_string(),
            detalhes: None,
        }
    }

    pub fn requisicao_invalida(mensagem: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            codigo: "validacao",
            mensagem: mensagem.to_string(),
            detalhes: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let corpo = Json(json!({
            "codigo": self.codigo,
            "mensagem": self.mensagem,
            "detalhes": self.detalhes,
        }));
        (self.status, corpo).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falha_de_pool_vira_indisponivel() {
        let erro: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(erro.eh_indisponibilidade());
        assert_eq!(erro.codigo(), "indisponivel");
    }

    #[test]
    fn falha_de_linha_nao_vira_indisponivel() {
        let erro: AppError = sqlx::Error::RowNotFound.into();
        assert!(!erro.eh_indisponibilidade());
        assert_eq!(erro.codigo(), "erro_interno");
    }

    #[test]
    fn cada_rejeicao_tem_codigo_estavel() {
        use crate::models::protocolo::StatusProtocolo::*;
        assert_eq!(AppError::Forbidden.codigo(), "acesso_negado");
        assert_eq!(AppError::Conflict.codigo(), "conflito_concorrencia");
        assert_eq!(
            AppError::IllegalTransition { de: Aberto, para: Concluido }.codigo(),
            "transicao_invalida"
        );
        assert_eq!(AppError::AlreadyEvaluated.codigo(), "ja_avaliado");
    }
}
