// src/db/sequencia_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;

// Gerador de numeração por (tenant, ano). O upsert com incremento é uma
// única instrução: o lock de linha do Postgres serializa chamadores do
// mesmo par enquanto pares distintos seguem em paralelo. Duplicata é
// impossível; lacuna (criação que falha depois de reservar) é tolerada.
#[derive(Clone)]
pub struct SequenciaRepository {
    pool: PgPool,
}

impl SequenciaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reserva e devolve o próximo número da sequência do par (tenant, ano).
    /// Roda direto na pool, FORA da transação de criação: se a criação
    /// falhar depois, o número fica perdido de propósito.
    pub async fn proximo_numero(&self, tenant_id: Uuid, ano: i32) -> Result<i32, AppError> {
        let numero = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO protocolo_sequencias (tenant_id, ano, ultimo_numero)
            VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, ano)
            DO UPDATE SET ultimo_numero = protocolo_sequencias.ultimo_numero + 1
            RETURNING ultimo_numero
            "#,
        )
        .bind(tenant_id)
        .bind(ano)
        .fetch_one(&self.pool)
        .await?;

        Ok(numero)
    }
}
