// src/db/catalogo_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::catalogo::ServicoCatalogo};

#[derive(Clone)]
pub struct CatalogoRepository {
    pool: PgPool,
}

impl CatalogoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn buscar_por_id(&self, id: Uuid) -> Result<Option<ServicoCatalogo>, AppError> {
        let servico =
            sqlx::query_as::<_, ServicoCatalogo>("SELECT * FROM servicos_catalogo WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(servico)
    }

    pub async fn listar(&self, tenant_id: Uuid) -> Result<Vec<ServicoCatalogo>, AppError> {
        let servicos = sqlx::query_as::<_, ServicoCatalogo>(
            r#"
            SELECT * FROM servicos_catalogo
            WHERE tenant_id = $1 AND ativo = TRUE
            ORDER BY categoria, nome
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(servicos)
    }
}
