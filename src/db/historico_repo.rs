// src/db/historico_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::historico::{HistoricoProtocolo, NovaEntradaHistorico},
};

// Trilha de auditoria: o contrato público só APENSA e LÊ. Não existe método
// de alteração nem de remoção aqui, de propósito.
#[derive(Clone)]
pub struct HistoricoRepository {
    pool: PgPool,
}

impl HistoricoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apensa uma entrada. Sempre chamado com o executor da transação que
    /// faz a mutação correspondente: ou os dois persistem, ou nenhum.
    pub async fn apensar<'e, E>(
        &self,
        executor: E,
        entrada: &NovaEntradaHistorico,
    ) -> Result<HistoricoProtocolo, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let registro = sqlx::query_as::<_, HistoricoProtocolo>(
            r#"
            INSERT INTO protocolo_historico (
                tenant_id, protocolo_id, acao, campo_alterado,
                valor_antigo, valor_novo, observacao,
                ator_id, publico, ip, user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(entrada.tenant_id)
        .bind(entrada.protocolo_id)
        .bind(entrada.acao)
        .bind(&entrada.campo_alterado)
        .bind(entrada.valor_antigo.as_ref().map(|v| v.para_json()))
        .bind(entrada.valor_novo.as_ref().map(|v| v.para_json()))
        .bind(&entrada.observacao)
        .bind(entrada.ator_id)
        .bind(entrada.publico)
        .bind(&entrada.ip)
        .bind(&entrada.user_agent)
        .fetch_one(executor)
        .await?;

        Ok(registro)
    }

    /// Sequência completa e ordenada (timestamp, depois ordem de inserção).
    /// Para cidadão, só as entradas públicas.
    pub async fn listar(
        &self,
        protocolo_id: Uuid,
        apenas_publicas: bool,
    ) -> Result<Vec<HistoricoProtocolo>, AppError> {
        let entradas = sqlx::query_as::<_, HistoricoProtocolo>(
            r#"
            SELECT * FROM protocolo_historico
            WHERE protocolo_id = $1
              AND ($2 = FALSE OR publico = TRUE)
            ORDER BY criado_em, seq
            "#,
        )
        .bind(protocolo_id)
        .bind(apenas_publicas)
        .fetch_all(&self.pool)
        .await?;

        Ok(entradas)
    }
}
