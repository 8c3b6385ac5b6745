// src/db/protocolo_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::protocolo::{DocumentoProtocolo, NovoProtocolo, Protocolo, StatusProtocolo},
    services::access_guard::EscopoListagem,
};

/// Campos editáveis fora do ciclo de status. O serviço compara antigo/novo e
/// grava uma entrada de histórico POR CAMPO alterado.
#[derive(Debug, Default, Clone)]
pub struct EdicaoCampos {
    pub titulo: Option<String>,
    pub descricao: Option<String>,
    pub prioridade: Option<crate::models::protocolo::Prioridade>,
    pub urgente: Option<bool>,
    pub observacoes_internas: Option<String>,
    pub observacoes_publicas: Option<String>,
    pub desconto: Option<rust_decimal::Decimal>,
    pub valor_multa: Option<rust_decimal::Decimal>,
    pub formulario: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct ProtocoloRepository {
    pool: PgPool,
}

impl ProtocoloRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn inserir<'e, E>(
        &self,
        executor: E,
        novo: &NovoProtocolo,
    ) -> Result<Protocolo, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let protocolo = sqlx::query_as::<_, Protocolo>(
            r#"
            INSERT INTO protocolos (
                tenant_id, numero_protocolo,
                categoria, subcategoria, prioridade, urgente,
                servico_id, servico_nome,
                requerente_nome, requerente_documento, requerente_email, requerente_telefone,
                criado_por, secretaria_origem_id, secretaria_destino_id,
                titulo, descricao, formulario,
                aberto_em, data_limite, valor_taxa
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            RETURNING *
            "#,
        )
        .bind(novo.tenant_id)
        .bind(&novo.numero_protocolo)
        .bind(&novo.categoria)
        .bind(&novo.subcategoria)
        .bind(novo.prioridade)
        .bind(novo.urgente)
        .bind(novo.servico_id)
        .bind(&novo.servico_nome)
        .bind(&novo.requerente.nome)
        .bind(&novo.requerente.documento)
        .bind(&novo.requerente.email)
        .bind(&novo.requerente.telefone)
        .bind(novo.criado_por)
        .bind(novo.secretaria_origem_id)
        .bind(novo.secretaria_destino_id)
        .bind(&novo.titulo)
        .bind(&novo.descricao)
        .bind(&novo.formulario)
        .bind(novo.aberto_em)
        .bind(novo.data_limite)
        .bind(novo.valor_taxa)
        .fetch_one(executor)
        .await?;

        Ok(protocolo)
    }

    /// Busca sem filtro de tenant: o Access Guard compara o tenant do alvo
    /// com o do ator e nega com Forbidden. É assim que acesso cruzado entre
    /// municípios NÃO vira 404.
    pub async fn buscar_por_id(&self, id: Uuid) -> Result<Option<Protocolo>, AppError> {
        let protocolo =
            sqlx::query_as::<_, Protocolo>("SELECT * FROM protocolos WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(protocolo)
    }

    /// Releitura com lock de linha, dentro da transação do chamador. É a
    /// checagem otimista: se o status mudou desde a pré-validação, o serviço
    /// responde Conflict em vez de sobrescrever o trabalho de outro ator.
    pub async fn buscar_para_atualizacao<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Protocolo>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let protocolo =
            sqlx::query_as::<_, Protocolo>("SELECT * FROM protocolos WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(protocolo)
    }

    pub async fn atualizar_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: StatusProtocolo,
        concluido_em: Option<DateTime<Utc>>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE protocolos
            SET status = $2,
                concluido_em = COALESCE($3, concluido_em),
                atualizado_em = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(concluido_em)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Uma única UPDATE cobre todos os campos editáveis; o que vier None
    /// fica como está.
    pub async fn atualizar_campos<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        edicao: &EdicaoCampos,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE protocolos
            SET titulo = COALESCE($2, titulo),
                descricao = COALESCE($3, descricao),
                prioridade = COALESCE($4, prioridade),
                urgente = COALESCE($5, urgente),
                observacoes_internas = COALESCE($6, observacoes_internas),
                observacoes_publicas = COALESCE($7, observacoes_publicas),
                desconto = COALESCE($8, desconto),
                valor_multa = COALESCE($9, valor_multa),
                formulario = COALESCE($10, formulario),
                atualizado_em = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&edicao.titulo)
        .bind(&edicao.descricao)
        .bind(edicao.prioridade)
        .bind(edicao.urgente)
        .bind(&edicao.observacoes_internas)
        .bind(&edicao.observacoes_publicas)
        .bind(edicao.desconto)
        .bind(edicao.valor_multa)
        .bind(&edicao.formulario)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn atribuir<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        responsavel_id: Uuid,
        supervisor_id: Option<Uuid>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE protocolos
            SET responsavel_id = $2,
                supervisor_id = COALESCE($3, supervisor_id),
                atualizado_em = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(responsavel_id)
        .bind(supervisor_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Reagendamento explícito do prazo. O prazo nunca é recalculado
    /// silenciosamente em edições.
    pub async fn atualizar_data_limite<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        nova_data: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE protocolos SET data_limite = $2, atualizado_em = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(nova_data)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn registrar_pagamento<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        metodo: &str,
        pago_em: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE protocolos
            SET metodo_pagamento = $2, pago_em = $3, atualizado_em = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(metodo)
        .bind(pago_em)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn registrar_avaliacao<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        nota: i16,
        comentario: Option<&str>,
        avaliado_em: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE protocolos
            SET avaliacao_nota = $2,
                avaliacao_comentario = $3,
                avaliado_em = $4,
                atualizado_em = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(nota)
        .bind(comentario)
        .bind(avaliado_em)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Listagem com o recorte de visibilidade decidido pelo Access Guard.
    pub async fn listar(
        &self,
        tenant_id: Uuid,
        escopo: &EscopoListagem,
        status: Option<StatusProtocolo>,
        limite: i64,
        deslocamento: i64,
    ) -> Result<Vec<Protocolo>, AppError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM protocolos WHERE tenant_id = ");
        query.push_bind(tenant_id);

        match escopo {
            EscopoListagem::TenantInteiro => {}
            EscopoListagem::Secretaria(secretaria_id) => {
                query.push(" AND (secretaria_origem_id = ");
                query.push_bind(*secretaria_id);
                query.push(" OR secretaria_destino_id = ");
                query.push_bind(*secretaria_id);
                query.push(")");
            }
            EscopoListagem::Proprios(usuario_id) => {
                query.push(" AND criado_por = ");
                query.push_bind(*usuario_id);
            }
        }

        if let Some(status) = status {
            query.push(" AND status = ");
            query.push_bind(status);
        }

        query.push(" ORDER BY aberto_em DESC LIMIT ");
        query.push_bind(limite);
        query.push(" OFFSET ");
        query.push_bind(deslocamento);

        let protocolos = query
            .build_query_as::<Protocolo>()
            .fetch_all(&self.pool)
            .await?;

        Ok(protocolos)
    }

    // =========================================================================
    //  DOCUMENTOS (referências opacas)
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn inserir_documento<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        protocolo_id: Uuid,
        uri: &str,
        nome_arquivo: &str,
        mime_type: &str,
        tamanho_bytes: i64,
        enviado_por: Uuid,
    ) -> Result<DocumentoProtocolo, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let documento = sqlx::query_as::<_, DocumentoProtocolo>(
            r#"
            INSERT INTO protocolo_documentos (
                tenant_id, protocolo_id, uri, nome_arquivo,
                mime_type, tamanho_bytes, enviado_por
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(protocolo_id)
        .bind(uri)
        .bind(nome_arquivo)
        .bind(mime_type)
        .bind(tamanho_bytes)
        .bind(enviado_por)
        .fetch_one(executor)
        .await?;

        Ok(documento)
    }

    pub async fn listar_documentos(
        &self,
        protocolo_id: Uuid,
    ) -> Result<Vec<DocumentoProtocolo>, AppError> {
        let documentos = sqlx::query_as::<_, DocumentoProtocolo>(
            "SELECT * FROM protocolo_documentos WHERE protocolo_id = $1 ORDER BY criado_em",
        )
        .bind(protocolo_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documentos)
    }
}
