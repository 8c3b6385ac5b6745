// src/db/tenant_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::tenancy::{PlanoTenant, StatusTenant, Tenant},
};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn buscar_por_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tenant)
    }

    /// Provisionamento de um novo município. O slug é único na plataforma.
    #[allow(clippy::too_many_arguments)]
    pub async fn criar(
        &self,
        slug: &str,
        codigo: &str,
        nome: &str,
        plano: PlanoTenant,
        max_usuarios: i32,
        max_protocolos: i32,
        armazenamento_gb: i32,
    ) -> Result<Tenant, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (slug, codigo, nome, plano, status,
                                 max_usuarios, max_protocolos, armazenamento_gb)
            VALUES ($1, $2, $3, $4, 'trial', $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(slug)
        .bind(codigo)
        .bind(nome)
        .bind(plano)
        .bind(max_usuarios)
        .bind(max_protocolos)
        .bind(armazenamento_gb)
        .fetch_one(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// Incremento condicional atômico do contador de uso. Devolve `false`
    /// quando o tenant não pode receber protocolo novo (suspenso/cancelado
    /// ou quota cheia); o serviço reclassifica o motivo. Uma única UPDATE
    /// condicional: rajadas concorrentes de criação nunca estouram o limite.
    pub async fn reservar_quota_protocolo<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let resultado = sqlx::query(
            r#"
            UPDATE tenants
            SET protocolos_usados = protocolos_usados + 1, atualizado_em = NOW()
            WHERE id = $1
              AND status IN ('ativo', 'trial')
              AND protocolos_usados < max_protocolos
            "#,
        )
        .bind(tenant_id)
        .execute(executor)
        .await?;

        Ok(resultado.rows_affected() == 1)
    }

    /// Mudança de status (suspensão, cancelamento, reativação). Tenants
    /// nunca são apagados fisicamente.
    pub async fn atualizar_status(
        &self,
        tenant_id: Uuid,
        status: StatusTenant,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE tenants SET status = $2, atualizado_em = NOW() WHERE id = $1")
            .bind(tenant_id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
