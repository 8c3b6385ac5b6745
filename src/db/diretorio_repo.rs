// src/db/diretorio_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::diretorio::{PerfilUsuario, Secretaria},
};

// Diretório de secretarias e perfis: modelos de leitura, escrita rara feita
// pelo provisionamento.
#[derive(Clone)]
pub struct DiretorioRepository {
    pool: PgPool,
}

impl DiretorioRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn listar_secretarias(&self, tenant_id: Uuid) -> Result<Vec<Secretaria>, AppError> {
        let secretarias = sqlx::query_as::<_, Secretaria>(
            "SELECT * FROM secretarias WHERE tenant_id = $1 ORDER BY nome",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(secretarias)
    }

    pub async fn buscar_perfil(&self, id: Uuid) -> Result<Option<PerfilUsuario>, AppError> {
        let perfil = sqlx::query_as::<_, PerfilUsuario>(
            "SELECT * FROM perfis_usuario WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(perfil)
    }
}
