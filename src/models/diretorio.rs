// src/models/diretorio.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::ator::Papel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "status_usuario", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StatusUsuario {
    Ativo,
    Inativo,
    Pendente,
    Suspenso,
}

// ---
// Secretaria (departamento municipal)
// ---
// Pertence a exatamente um tenant; nunca é referenciada por protocolos de
// outro tenant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Secretaria {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Secretaria de Obras")]
    pub nome: String,
    #[schema(example = "SEOB")]
    pub sigla: Option<String>,
    pub responsavel_id: Option<Uuid>,
    pub adjunto_id: Option<Uuid>,
    pub categorias: Vec<String>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerfilUsuario {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub nome: String,
    pub email: String,
    pub papel: Papel,
    pub secretaria_id: Option<Uuid>,
    pub status: StatusUsuario,
    // O colaborador de autenticação é o dono destes dois campos.
    #[serde(skip_serializing)]
    pub tentativas_login_falhas: i32,
    #[serde(skip_serializing)]
    pub bloqueado_ate: Option<DateTime<Utc>>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}
