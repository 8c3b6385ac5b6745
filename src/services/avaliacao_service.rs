// src/services/avaliacao_service.rs

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{HistoricoRepository, ProtocoloRepository},
    models::{
        ator::{Ator, MetadadosRequisicao},
        eventos::EventoDominio,
        historico::{AcaoHistorico, NovaEntradaHistorico, ValorCampo},
        protocolo::{Protocolo, StatusProtocolo},
    },
    services::{
        access_guard::{self, AlvoProtocolo, Operacao},
        event_bus::EventBus,
    },
};

// Avaliação de satisfação: nota 1–5, uma única vez por protocolo, somente
// pelo requerente e somente a partir de 'concluido'.
#[derive(Clone)]
pub struct AvaliacaoService {
    protocolo_repo: ProtocoloRepository,
    historico_repo: HistoricoRepository,
    event_bus: EventBus,
    pool: PgPool,
}

impl AvaliacaoService {
    pub fn new(
        protocolo_repo: ProtocoloRepository,
        historico_repo: HistoricoRepository,
        event_bus: EventBus,
        pool: PgPool,
    ) -> Self {
        Self {
            protocolo_repo,
            historico_repo,
            event_bus,
            pool,
        }
    }

    pub async fn avaliar(
        &self,
        ator: &Ator,
        protocolo_id: Uuid,
        nota: i16,
        comentario: Option<String>,
        metadados: &MetadadosRequisicao,
    ) -> Result<Protocolo, AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock de linha: de duas avaliações correndo em paralelo, só uma
        // enxerga avaliado_em vazio.
        let protocolo = self
            .protocolo_repo
            .buscar_para_atualizacao(&mut *tx, protocolo_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        access_guard::autorizar(ator, &AlvoProtocolo::de(&protocolo), &Operacao::Avaliar)?;

        if protocolo.status != StatusProtocolo::Concluido {
            return Err(AppError::NotEligible);
        }
        if protocolo.avaliado_em.is_some() {
            return Err(AppError::AlreadyEvaluated);
        }
        // O handler já validou o intervalo; aqui é a última linha de defesa
        if !(1..=5).contains(&nota) {
            return Err(anyhow::anyhow!("nota fora do intervalo 1..=5").into());
        }

        let avaliado_em = Utc::now();

        self.protocolo_repo
            .registrar_avaliacao(&mut *tx, protocolo_id, nota, comentario.as_deref(), avaliado_em)
            .await?;

        self.historico_repo
            .apensar(
                &mut *tx,
                &NovaEntradaHistorico {
                    tenant_id: protocolo.tenant_id,
                    protocolo_id,
                    acao: AcaoHistorico::Avaliacao,
                    campo_alterado: Some("avaliacao_nota".to_string()),
                    valor_antigo: None,
                    valor_novo: Some(ValorCampo::Numero(nota.into())),
                    observacao: comentario.clone(),
                    ator_id: ator.usuario_id,
                    publico: true,
                    ip: metadados.ip.clone(),
                    user_agent: metadados.user_agent.clone(),
                },
            )
            .await?;

        tx.commit().await?;

        self.event_bus.publicar(EventoDominio::ProtocoloAvaliado {
            protocolo_id,
            tenant_id: protocolo.tenant_id,
            nota,
        });

        Ok(Protocolo {
            avaliacao_nota: Some(nota),
            avaliacao_comentario: comentario,
            avaliado_em: Some(avaliado_em),
            ..protocolo
        })
    }
}
