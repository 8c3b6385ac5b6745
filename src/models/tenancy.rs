// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "plano_tenant", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanoTenant {
    Starter,
    Professional,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "status_tenant", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StatusTenant {
    Ativo,
    Suspenso,
    Cancelado,
    Trial,
}

impl StatusTenant {
    /// Tenant suspenso ou cancelado não aceita protocolo novo. Trial aceita.
    pub fn aceita_novos_protocolos(self) -> bool {
        matches!(self, StatusTenant::Ativo | StatusTenant::Trial)
    }
}

// ---
// Tenant (o município)
// ---
// Nunca é apagado fisicamente; desativação é mudança de status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    #[schema(example = "springfield")]
    pub slug: String,
    /// Código usado na numeração dos protocolos.
    #[schema(example = "SPRINGFIELD")]
    pub codigo: String,
    #[schema(example = "Prefeitura de Springfield")]
    pub nome: String,
    pub plano: PlanoTenant,
    pub status: StatusTenant,
    pub max_usuarios: i32,
    pub max_protocolos: i32,
    pub armazenamento_gb: i32,
    pub protocolos_usados: i32,
    pub modulos: Vec<String>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspenso_e_cancelado_nao_aceitam_protocolos() {
        assert!(StatusTenant::Ativo.aceita_novos_protocolos());
        assert!(StatusTenant::Trial.aceita_novos_protocolos());
        assert!(!StatusTenant::Suspenso.aceita_novos_protocolos());
        assert!(!StatusTenant::Cancelado.aceita_novos_protocolos());
    }
}
