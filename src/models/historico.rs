// src/models/historico.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::protocolo::{Prioridade, StatusProtocolo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "acao_historico", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AcaoHistorico {
    Criacao,
    MudancaStatus,
    EdicaoCampo,
    Comentario,
    Atribuicao,
    AnexoDocumento,
    Avaliacao,
    Reagendamento,
    Pagamento,
}

// ---
// Valor de campo com tipo preservado
// ---
// O delta antigo/novo é gravado como JSON etiquetado em vez de texto solto;
// só os campos dinâmicos de formulário caem no ramo genérico.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "tipo", content = "valor", rename_all = "snake_case")]
pub enum ValorCampo {
    Texto(String),
    Status(StatusProtocolo),
    Prioridade(Prioridade),
    Id(Uuid),
    Data(DateTime<Utc>),
    Numero(Decimal),
    Booleano(bool),
    Dinamico(serde_json::Value),
}

impl ValorCampo {
    pub fn para_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// ---
// Entrada do histórico (somente-apensar, nunca alterada)
// ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoricoProtocolo {
    pub id: Uuid,
    /// Desempate de ordenação entre entradas com o mesmo timestamp.
    pub seq: i64,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub protocolo_id: Uuid,
    pub acao: AcaoHistorico,
    #[schema(example = "status")]
    pub campo_alterado: Option<String>,
    pub valor_antigo: Option<serde_json::Value>,
    pub valor_novo: Option<serde_json::Value>,
    /// Texto livre da ação (nota de transição, comentário, justificativa).
    pub observacao: Option<String>,
    pub ator_id: Uuid,
    /// Entradas não públicas ficam invisíveis para o cidadão.
    pub publico: bool,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub criado_em: DateTime<Utc>,
}

/// Dados de uma entrada ainda não persistida.
#[derive(Debug, Clone)]
pub struct NovaEntradaHistorico {
    pub tenant_id: Uuid,
    pub protocolo_id: Uuid,
    pub acao: AcaoHistorico,
    pub campo_alterado: Option<String>,
    pub valor_antigo: Option<ValorCampo>,
    pub valor_novo: Option<ValorCampo>,
    pub observacao: Option<String>,
    pub ator_id: Uuid,
    pub publico: bool,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}
