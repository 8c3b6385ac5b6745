// src/models/catalogo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// Serviço do catálogo
// ---
// Leitura intensiva, escrita rara. Na criação do protocolo os termos (taxa,
// prazo, nome) são COPIADOS para a linha do protocolo: editar o catálogo
// depois não altera protocolos já abertos.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServicoCatalogo {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub secretaria_id: Uuid,
    #[schema(example = "Alvará de funcionamento")]
    pub nome: String,
    #[schema(example = "Licenciamento")]
    pub categoria: String,
    pub documentos_exigidos: Vec<String>,
    #[schema(example = "35.00")]
    pub taxa: Decimal,
    /// Prazo estimado de atendimento, em dias corridos.
    #[schema(example = 15)]
    pub prazo_dias: i32,
    pub disponivel_online: bool,
    pub disponivel_presencial: bool,
    pub ativo: bool,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}
