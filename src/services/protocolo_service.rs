// src/services/protocolo_service.rs

use chrono::{Datelike, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, retry::com_retentativa_leitura},
    db::{
        protocolo_repo::EdicaoCampos, CatalogoRepository, DiretorioRepository,
        HistoricoRepository, ProtocoloRepository, SequenciaRepository, TenantRepository,
    },
    models::{
        ator::{Ator, MetadadosRequisicao, Papel},
        eventos::EventoDominio,
        historico::{AcaoHistorico, HistoricoProtocolo, NovaEntradaHistorico, ValorCampo},
        protocolo::{
            calcular_data_limite, formatar_numero, DocumentoProtocolo, NovoProtocolo, Prioridade,
            Protocolo, Requerente, StatusProtocolo,
        },
    },
    services::{
        access_guard::{self, AlvoProtocolo, Operacao},
        event_bus::EventBus,
    },
};

/// Pedido de abertura, ainda sem número nem prazo resolvidos.
#[derive(Debug, Clone)]
pub struct DadosCriacao {
    pub servico_id: Uuid,
    pub titulo: String,
    pub descricao: String,
    pub requerente: Requerente,
    pub prioridade: Option<Prioridade>,
    pub urgente: bool,
    pub subcategoria: Option<String>,
    pub formulario: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct ProtocoloService {
    protocolo_repo: ProtocoloRepository,
    historico_repo: HistoricoRepository,
    tenant_repo: TenantRepository,
    catalogo_repo: CatalogoRepository,
    sequencia_repo: SequenciaRepository,
    diretorio_repo: DiretorioRepository,
    event_bus: EventBus,
    pool: PgPool,
}

impl ProtocoloService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        protocolo_repo: ProtocoloRepository,
        historico_repo: HistoricoRepository,
        tenant_repo: TenantRepository,
        catalogo_repo: CatalogoRepository,
        sequencia_repo: SequenciaRepository,
        diretorio_repo: DiretorioRepository,
        event_bus: EventBus,
        pool: PgPool,
    ) -> Self {
        Self {
            protocolo_repo,
            historico_repo,
            tenant_repo,
            catalogo_repo,
            sequencia_repo,
            diretorio_repo,
            event_bus,
            pool,
        }
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    pub async fn criar(
        &self,
        ator: &Ator,
        tenant_id: Uuid,
        metadados: &MetadadosRequisicao,
        dados: DadosCriacao,
    ) -> Result<Protocolo, AppError> {
        access_guard::autorizar_criacao(ator, tenant_id)?;

        // Pré-validações fora da transação (fail fast, nada foi escrito)
        let tenant = self
            .tenant_repo
            .buscar_por_id(tenant_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Tenant {}", tenant_id)))?;

        if !tenant.status.aceita_novos_protocolos() {
            return Err(AppError::TenantSuspended);
        }
        if tenant.protocolos_usados >= tenant.max_protocolos {
            return Err(AppError::QuotaExceeded);
        }

        let servico = self
            .catalogo_repo
            .buscar_por_id(dados.servico_id)
            .await?
            .ok_or(AppError::InvalidCatalogEntry)?;
        if servico.tenant_id != tenant_id || !servico.ativo {
            return Err(AppError::InvalidCatalogEntry);
        }

        let aberto_em = Utc::now();
        let ano = aberto_em.year();

        // O número é reservado FORA da transação: se a inserção falhar, a
        // sequência segue em frente (lacuna tolerada, duplicata nunca).
        let sequencia = self.sequencia_repo.proximo_numero(tenant_id, ano).await?;
        let numero_protocolo = formatar_numero(&tenant.codigo, ano, sequencia);

        let novo = NovoProtocolo {
            tenant_id,
            numero_protocolo,
            // Termos copiados do catálogo: edições futuras do serviço não
            // alteram protocolos já abertos.
            categoria: servico.categoria.clone(),
            subcategoria: dados.subcategoria,
            prioridade: dados.prioridade.unwrap_or(Prioridade::Media),
            urgente: dados.urgente,
            servico_id: servico.id,
            servico_nome: servico.nome.clone(),
            requerente: dados.requerente,
            criado_por: ator.usuario_id,
            secretaria_origem_id: ator.secretaria_id,
            secretaria_destino_id: servico.secretaria_id,
            titulo: dados.titulo,
            descricao: dados.descricao,
            formulario: dados.formulario,
            aberto_em,
            data_limite: calcular_data_limite(aberto_em, servico.prazo_dias),
            valor_taxa: servico.taxa,
        };

        // Linha do protocolo + contador de quota + entrada de criação: uma
        // unidade atômica.
        let mut tx = self.pool.begin().await?;

        let reservado = self
            .tenant_repo
            .reservar_quota_protocolo(&mut *tx, tenant_id)
            .await?;
        if !reservado {
            // O contador mudou entre a pré-validação e agora; reclassifica.
            let tenant = self
                .tenant_repo
                .buscar_por_id(tenant_id)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound(format!("Tenant {}", tenant_id)))?;
            return Err(if tenant.status.aceita_novos_protocolos() {
                AppError::QuotaExceeded
            } else {
                AppError::TenantSuspended
            });
        }

        let protocolo = self.protocolo_repo.inserir(&mut *tx, &novo).await?;

        self.historico_repo
            .apensar(
                &mut *tx,
                &NovaEntradaHistorico {
                    tenant_id,
                    protocolo_id: protocolo.id,
                    acao: AcaoHistorico::Criacao,
                    campo_alterado: None,
                    valor_antigo: None,
                    valor_novo: Some(ValorCampo::Status(StatusProtocolo::Aberto)),
                    observacao: None,
                    ator_id: ator.usuario_id,
                    publico: true,
                    ip: metadados.ip.clone(),
                    user_agent: metadados.user_agent.clone(),
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            numero = %protocolo.numero_protocolo,
            tenant_id = %tenant_id,
            "protocolo aberto"
        );

        // Evento só depois do commit: transição que não persistiu não existe
        self.event_bus.publicar(EventoDominio::ProtocoloCriado {
            protocolo_id: protocolo.id,
            tenant_id,
        });

        Ok(protocolo)
    }

    // =========================================================================
    //  TRANSIÇÃO DE STATUS
    // =========================================================================

    pub async fn transicionar(
        &self,
        ator: &Ator,
        protocolo_id: Uuid,
        destino: StatusProtocolo,
        nota: Option<String>,
        metadados: &MetadadosRequisicao,
    ) -> Result<Protocolo, AppError> {
        let atual = self
            .protocolo_repo
            .buscar_por_id(protocolo_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        access_guard::autorizar(ator, &AlvoProtocolo::de(&atual), &Operacao::Transicionar { destino })?;

        // Validação da aresta contra o pré-estado, antes de qualquer escrita
        Self::validar_aresta(atual.status, destino)?;

        let mut tx = self.pool.begin().await?;

        // Checagem otimista: relê com lock. Se outro ator mexeu no status
        // entre a pré-validação e o lock, o chamador recebe Conflict e
        // decide ele mesmo se repete: a precondição sobre a qual ele
        // raciocinou já não vale.
        let corrente = self
            .protocolo_repo
            .buscar_para_atualizacao(&mut *tx, protocolo_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        if corrente.status != atual.status {
            return Err(AppError::Conflict);
        }

        let concluido_em = (destino == StatusProtocolo::Concluido).then(Utc::now);

        self.protocolo_repo
            .atualizar_status(&mut *tx, protocolo_id, destino, concluido_em)
            .await?;

        self.historico_repo
            .apensar(
                &mut *tx,
                &NovaEntradaHistorico {
                    tenant_id: corrente.tenant_id,
                    protocolo_id,
                    acao: AcaoHistorico::MudancaStatus,
                    campo_alterado: Some("status".to_string()),
                    valor_antigo: Some(ValorCampo::Status(corrente.status)),
                    valor_novo: Some(ValorCampo::Status(destino)),
                    observacao: nota,
                    ator_id: ator.usuario_id,
                    publico: true,
                    ip: metadados.ip.clone(),
                    user_agent: metadados.user_agent.clone(),
                },
            )
            .await?;

        tx.commit().await?;

        self.event_bus.publicar(EventoDominio::StatusAlterado {
            protocolo_id,
            tenant_id: corrente.tenant_id,
            de: corrente.status,
            para: destino,
            ator_id: ator.usuario_id,
        });

        Ok(Protocolo {
            status: destino,
            concluido_em: concluido_em.or(corrente.concluido_em),
            ..corrente
        })
    }

    fn validar_aresta(de: StatusProtocolo, para: StatusProtocolo) -> Result<(), AppError> {
        if de.eh_terminal() && para.eh_terminal() {
            return Err(AppError::AlreadyTerminal { de });
        }
        if !de.pode_transicionar_para(para) {
            return Err(AppError::IllegalTransition { de, para });
        }
        Ok(())
    }

    // =========================================================================
    //  EDIÇÃO DE CAMPOS (fora do ciclo de status)
    // =========================================================================

    /// Cada campo alterado gera exatamente UMA entrada de histórico nesta
    /// chamada; mudanças não relacionadas nunca são agrupadas numa entrada
    /// só. Auditabilidade vale mais que economia de linhas.
    pub async fn editar(
        &self,
        ator: &Ator,
        protocolo_id: Uuid,
        edicao: EdicaoCampos,
        metadados: &MetadadosRequisicao,
    ) -> Result<Protocolo, AppError> {
        let atual = self
            .protocolo_repo
            .buscar_por_id(protocolo_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        access_guard::autorizar(ator, &AlvoProtocolo::de(&atual), &Operacao::EditarCampos)?;

        let deltas = Self::calcular_deltas(&atual, &edicao);
        if deltas.is_empty() {
            return Ok(atual);
        }

        let mut tx = self.pool.begin().await?;

        self.protocolo_repo
            .atualizar_campos(&mut *tx, protocolo_id, &edicao)
            .await?;

        for (campo, antigo, novo, publico) in &deltas {
            self.historico_repo
                .apensar(
                    &mut *tx,
                    &NovaEntradaHistorico {
                        tenant_id: atual.tenant_id,
                        protocolo_id,
                        acao: AcaoHistorico::EdicaoCampo,
                        campo_alterado: Some((*campo).to_string()),
                        valor_antigo: antigo.clone(),
                        valor_novo: Some(novo.clone()),
                        observacao: None,
                        ator_id: ator.usuario_id,
                        publico: *publico,
                        ip: metadados.ip.clone(),
                        user_agent: metadados.user_agent.clone(),
                    },
                )
                .await?;
        }

        tx.commit().await?;

        Ok(Self::aplicar_edicao(atual, edicao))
    }

    /// (campo, valor antigo, valor novo, entrada pública?)
    fn calcular_deltas(
        atual: &Protocolo,
        edicao: &EdicaoCampos,
    ) -> Vec<(&'static str, Option<ValorCampo>, ValorCampo, bool)> {
        let mut deltas = Vec::new();

        if let Some(titulo) = &edicao.titulo {
            if *titulo != atual.titulo {
                deltas.push((
                    "titulo",
                    Some(ValorCampo::Texto(atual.titulo.clone())),
                    ValorCampo::Texto(titulo.clone()),
                    true,
                ));
            }
        }
        if let Some(descricao) = &edicao.descricao {
            if *descricao != atual.descricao {
                deltas.push((
                    "descricao",
                    Some(ValorCampo::Texto(atual.descricao.clone())),
                    ValorCampo::Texto(descricao.clone()),
                    true,
                ));
            }
        }
        if let Some(prioridade) = edicao.prioridade {
            if prioridade != atual.prioridade {
                deltas.push((
                    "prioridade",
                    Some(ValorCampo::Prioridade(atual.prioridade)),
                    ValorCampo::Prioridade(prioridade),
                    true,
                ));
            }
        }
        if let Some(urgente) = edicao.urgente {
            if urgente != atual.urgente {
                deltas.push((
                    "urgente",
                    Some(ValorCampo::Booleano(atual.urgente)),
                    ValorCampo::Booleano(urgente),
                    true,
                ));
            }
        }
        if let Some(texto) = &edicao.observacoes_internas {
            if Some(texto) != atual.observacoes_internas.as_ref() {
                // Nota interna: a entrada do histórico também fica invisível
                // para o cidadão
                deltas.push((
                    "observacoes_internas",
                    atual.observacoes_internas.clone().map(ValorCampo::Texto),
                    ValorCampo::Texto(texto.clone()),
                    false,
                ));
            }
        }
        if let Some(texto) = &edicao.observacoes_publicas {
            if Some(texto) != atual.observacoes_publicas.as_ref() {
                deltas.push((
                    "observacoes_publicas",
                    atual.observacoes_publicas.clone().map(ValorCampo::Texto),
                    ValorCampo::Texto(texto.clone()),
                    true,
                ));
            }
        }
        if let Some(desconto) = edicao.desconto {
            if desconto != atual.desconto {
                deltas.push((
                    "desconto",
                    Some(ValorCampo::Numero(atual.desconto)),
                    ValorCampo::Numero(desconto),
                    true,
                ));
            }
        }
        if let Some(multa) = edicao.valor_multa {
            if multa != atual.valor_multa {
                deltas.push((
                    "valor_multa",
                    Some(ValorCampo::Numero(atual.valor_multa)),
                    ValorCampo::Numero(multa),
                    true,
                ));
            }
        }
        if let Some(formulario) = &edicao.formulario {
            if Some(formulario) != atual.formulario.as_ref() {
                // Campos dinâmicos de formulário: única situação em que o
                // delta cai no ramo genérico chave-valor
                deltas.push((
                    "formulario",
                    atual.formulario.clone().map(ValorCampo::Dinamico),
                    ValorCampo::Dinamico(formulario.clone()),
                    true,
                ));
            }
        }

        deltas
    }

    fn aplicar_edicao(mut protocolo: Protocolo, edicao: EdicaoCampos) -> Protocolo {
        if let Some(titulo) = edicao.titulo {
            protocolo.titulo = titulo;
        }
        if let Some(descricao) = edicao.descricao {
            protocolo.descricao = descricao;
        }
        if let Some(prioridade) = edicao.prioridade {
            protocolo.prioridade = prioridade;
        }
        if let Some(urgente) = edicao.urgente {
            protocolo.urgente = urgente;
        }
        if let Some(texto) = edicao.observacoes_internas {
            protocolo.observacoes_internas = Some(texto);
        }
        if let Some(texto) = edicao.observacoes_publicas {
            protocolo.observacoes_publicas = Some(texto);
        }
        if let Some(desconto) = edicao.desconto {
            protocolo.desconto = desconto;
        }
        if let Some(multa) = edicao.valor_multa {
            protocolo.valor_multa = multa;
        }
        if let Some(formulario) = edicao.formulario {
            protocolo.formulario = Some(formulario);
        }
        protocolo
    }

    // =========================================================================
    //  ATRIBUIÇÃO
    // =========================================================================

    pub async fn atribuir(
        &self,
        ator: &Ator,
        protocolo_id: Uuid,
        responsavel_id: Uuid,
        supervisor_id: Option<Uuid>,
        metadados: &MetadadosRequisicao,
    ) -> Result<Protocolo, AppError> {
        let atual = self
            .protocolo_repo
            .buscar_por_id(protocolo_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        access_guard::autorizar(ator, &AlvoProtocolo::de(&atual), &Operacao::Atribuir)?;

        // O novo responsável precisa existir e ser do mesmo município
        let perfil = self
            .diretorio_repo
            .buscar_perfil(responsavel_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Usuário {}", responsavel_id)))?;
        if perfil.tenant_id != atual.tenant_id {
            return Err(AppError::Forbidden);
        }

        let mut tx = self.pool.begin().await?;

        self.protocolo_repo
            .atribuir(&mut *tx, protocolo_id, responsavel_id, supervisor_id)
            .await?;

        self.historico_repo
            .apensar(
                &mut *tx,
                &NovaEntradaHistorico {
                    tenant_id: atual.tenant_id,
                    protocolo_id,
                    acao: AcaoHistorico::Atribuicao,
                    campo_alterado: Some("responsavel_id".to_string()),
                    valor_antigo: atual.responsavel_id.map(ValorCampo::Id),
                    valor_novo: Some(ValorCampo::Id(responsavel_id)),
                    observacao: None,
                    ator_id: ator.usuario_id,
                    publico: true,
                    ip: metadados.ip.clone(),
                    user_agent: metadados.user_agent.clone(),
                },
            )
            .await?;

        if let Some(supervisor_id) = supervisor_id {
            if atual.supervisor_id != Some(supervisor_id) {
                self.historico_repo
                    .apensar(
                        &mut *tx,
                        &NovaEntradaHistorico {
                            tenant_id: atual.tenant_id,
                            protocolo_id,
                            acao: AcaoHistorico::Atribuicao,
                            campo_alterado: Some("supervisor_id".to_string()),
                            valor_antigo: atual.supervisor_id.map(ValorCampo::Id),
                            valor_novo: Some(ValorCampo::Id(supervisor_id)),
                            observacao: None,
                            ator_id: ator.usuario_id,
                            publico: true,
                            ip: metadados.ip.clone(),
                            user_agent: metadados.user_agent.clone(),
                        },
                    )
                    .await?;
            }
        }

        tx.commit().await?;

        self.event_bus.publicar(EventoDominio::ProtocoloAtribuido {
            protocolo_id,
            tenant_id: atual.tenant_id,
            responsavel_id,
        });

        Ok(Protocolo {
            responsavel_id: Some(responsavel_id),
            supervisor_id: supervisor_id.or(atual.supervisor_id),
            ..atual
        })
    }

    // =========================================================================
    //  COMENTÁRIOS, DOCUMENTOS, REAGENDAMENTO, PAGAMENTO
    // =========================================================================

    pub async fn comentar(
        &self,
        ator: &Ator,
        protocolo_id: Uuid,
        texto: String,
        publico: bool,
        metadados: &MetadadosRequisicao,
    ) -> Result<HistoricoProtocolo, AppError> {
        let atual = self
            .protocolo_repo
            .buscar_por_id(protocolo_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        access_guard::autorizar(ator, &AlvoProtocolo::de(&atual), &Operacao::Comentar { publico })?;

        // Inserção única: atômica por si só
        self.historico_repo
            .apensar(
                &self.pool,
                &NovaEntradaHistorico {
                    tenant_id: atual.tenant_id,
                    protocolo_id,
                    acao: AcaoHistorico::Comentario,
                    campo_alterado: None,
                    valor_antigo: None,
                    valor_novo: None,
                    observacao: Some(texto),
                    ator_id: ator.usuario_id,
                    publico,
                    ip: metadados.ip.clone(),
                    user_agent: metadados.user_agent.clone(),
                },
            )
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn anexar_documento(
        &self,
        ator: &Ator,
        protocolo_id: Uuid,
        uri: String,
        nome_arquivo: String,
        mime_type: String,
        tamanho_bytes: i64,
        metadados: &MetadadosRequisicao,
    ) -> Result<DocumentoProtocolo, AppError> {
        let atual = self
            .protocolo_repo
            .buscar_por_id(protocolo_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        access_guard::autorizar(ator, &AlvoProtocolo::de(&atual), &Operacao::AnexarDocumento)?;

        let mut tx = self.pool.begin().await?;

        let documento = self
            .protocolo_repo
            .inserir_documento(
                &mut *tx,
                atual.tenant_id,
                protocolo_id,
                &uri,
                &nome_arquivo,
                &mime_type,
                tamanho_bytes,
                ator.usuario_id,
            )
            .await?;

        self.historico_repo
            .apensar(
                &mut *tx,
                &NovaEntradaHistorico {
                    tenant_id: atual.tenant_id,
                    protocolo_id,
                    acao: AcaoHistorico::AnexoDocumento,
                    campo_alterado: Some("documentos".to_string()),
                    valor_antigo: None,
                    valor_novo: Some(ValorCampo::Texto(nome_arquivo)),
                    observacao: None,
                    ator_id: ator.usuario_id,
                    publico: true,
                    ip: metadados.ip.clone(),
                    user_agent: metadados.user_agent.clone(),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(documento)
    }

    /// Reagendamento explícito e auditado. O prazo NUNCA muda por efeito
    /// colateral de edição.
    pub async fn reagendar(
        &self,
        ator: &Ator,
        protocolo_id: Uuid,
        nova_data: chrono::DateTime<Utc>,
        justificativa: String,
        metadados: &MetadadosRequisicao,
    ) -> Result<Protocolo, AppError> {
        let atual = self
            .protocolo_repo
            .buscar_por_id(protocolo_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        access_guard::autorizar(ator, &AlvoProtocolo::de(&atual), &Operacao::Reagendar)?;

        let mut tx = self.pool.begin().await?;

        self.protocolo_repo
            .atualizar_data_limite(&mut *tx, protocolo_id, nova_data)
            .await?;

        self.historico_repo
            .apensar(
                &mut *tx,
                &NovaEntradaHistorico {
                    tenant_id: atual.tenant_id,
                    protocolo_id,
                    acao: AcaoHistorico::Reagendamento,
                    campo_alterado: Some("data_limite".to_string()),
                    valor_antigo: Some(ValorCampo::Data(atual.data_limite)),
                    valor_novo: Some(ValorCampo::Data(nova_data)),
                    observacao: Some(justificativa),
                    ator_id: ator.usuario_id,
                    publico: true,
                    ip: metadados.ip.clone(),
                    user_agent: metadados.user_agent.clone(),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(Protocolo { data_limite: nova_data, ..atual })
    }

    /// Registro de pagamento. Financeiro é ortogonal ao status: pagar (ou
    /// não) nunca condiciona transição.
    pub async fn registrar_pagamento(
        &self,
        ator: &Ator,
        protocolo_id: Uuid,
        metodo: String,
        metadados: &MetadadosRequisicao,
    ) -> Result<Protocolo, AppError> {
        let atual = self
            .protocolo_repo
            .buscar_por_id(protocolo_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        access_guard::autorizar(ator, &AlvoProtocolo::de(&atual), &Operacao::RegistrarPagamento)?;

        let pago_em = Utc::now();
        let mut tx = self.pool.begin().await?;

        self.protocolo_repo
            .registrar_pagamento(&mut *tx, protocolo_id, &metodo, pago_em)
            .await?;

        self.historico_repo
            .apensar(
                &mut *tx,
                &NovaEntradaHistorico {
                    tenant_id: atual.tenant_id,
                    protocolo_id,
                    acao: AcaoHistorico::Pagamento,
                    campo_alterado: Some("pago_em".to_string()),
                    valor_antigo: None,
                    valor_novo: Some(ValorCampo::Data(pago_em)),
                    observacao: Some(metodo.clone()),
                    ator_id: ator.usuario_id,
                    publico: true,
                    ip: metadados.ip.clone(),
                    user_agent: metadados.user_agent.clone(),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(Protocolo {
            pago_em: Some(pago_em),
            metodo_pagamento: Some(metodo),
            ..atual
        })
    }

    // =========================================================================
    //  LEITURAS
    // =========================================================================

    pub async fn obter(&self, ator: &Ator, protocolo_id: Uuid) -> Result<Protocolo, AppError> {
        let protocolo =
            com_retentativa_leitura(|| self.protocolo_repo.buscar_por_id(protocolo_id))
                .await?
                .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        access_guard::autorizar(ator, &AlvoProtocolo::de(&protocolo), &Operacao::Ler)?;

        Ok(protocolo)
    }

    pub async fn listar(
        &self,
        ator: &Ator,
        tenant_id: Uuid,
        status: Option<StatusProtocolo>,
        limite: i64,
        deslocamento: i64,
    ) -> Result<Vec<Protocolo>, AppError> {
        access_guard::autorizar_leitura_tenant(ator, tenant_id)?;
        let escopo = access_guard::escopo_listagem(ator)?;

        com_retentativa_leitura(|| {
            self.protocolo_repo
                .listar(tenant_id, &escopo, status, limite, deslocamento)
        })
        .await
    }

    pub async fn historico(
        &self,
        ator: &Ator,
        protocolo_id: Uuid,
    ) -> Result<Vec<HistoricoProtocolo>, AppError> {
        let protocolo =
            com_retentativa_leitura(|| self.protocolo_repo.buscar_por_id(protocolo_id))
                .await?
                .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        access_guard::autorizar(ator, &AlvoProtocolo::de(&protocolo), &Operacao::LerHistorico)?;

        // Cidadão não enxerga entradas internas
        let apenas_publicas = ator.papel == Papel::Cidadao;
        com_retentativa_leitura(|| self.historico_repo.listar(protocolo_id, apenas_publicas)).await
    }

    pub async fn documentos(
        &self,
        ator: &Ator,
        protocolo_id: Uuid,
    ) -> Result<Vec<DocumentoProtocolo>, AppError> {
        let protocolo =
            com_retentativa_leitura(|| self.protocolo_repo.buscar_por_id(protocolo_id))
                .await?
                .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocolo_id)))?;

        access_guard::autorizar(ator, &AlvoProtocolo::de(&protocolo), &Operacao::Ler)?;

        com_retentativa_leitura(|| self.protocolo_repo.listar_documentos(protocolo_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn protocolo_base() -> Protocolo {
        let agora = Utc::now();
        Protocolo {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            numero_protocolo: "TESTE-2025-0001".to_string(),
            categoria: "Infraestrutura".to_string(),
            subcategoria: None,
            prioridade: Prioridade::Media,
            urgente: false,
            servico_id: Uuid::new_v4(),
            servico_nome: "Tapa-buraco".to_string(),
            requerente: Requerente {
                nome: "Maria da Silva".to_string(),
                documento: "123.456.789-00".to_string(),
                email: None,
                telefone: None,
            },
            criado_por: Uuid::new_v4(),
            responsavel_id: None,
            supervisor_id: None,
            secretaria_origem_id: None,
            secretaria_destino_id: Uuid::new_v4(),
            titulo: "Buraco na rua".to_string(),
            descricao: "Cratera na altura do número 120.".to_string(),
            formulario: None,
            observacoes_internas: None,
            observacoes_publicas: None,
            status: StatusProtocolo::Aberto,
            aberto_em: agora,
            data_limite: agora + chrono::Duration::days(15),
            concluido_em: None,
            pago_em: None,
            avaliado_em: None,
            avaliacao_nota: None,
            avaliacao_comentario: None,
            valor_taxa: Decimal::new(3500, 2),
            desconto: Decimal::ZERO,
            valor_multa: Decimal::ZERO,
            metodo_pagamento: None,
            criado_em: agora,
            atualizado_em: agora,
        }
    }

    #[test]
    fn um_delta_por_campo_alterado() {
        let atual = protocolo_base();
        let edicao = EdicaoCampos {
            titulo: Some("Cratera na rua".to_string()),
            prioridade: Some(Prioridade::Alta),
            urgente: Some(true),
            ..Default::default()
        };

        let deltas = ProtocoloService::calcular_deltas(&atual, &edicao);
        let campos: Vec<&str> = deltas.iter().map(|(campo, ..)| *campo).collect();
        assert_eq!(campos, vec!["titulo", "prioridade", "urgente"]);
    }

    #[test]
    fn valor_igual_nao_gera_delta() {
        let atual = protocolo_base();
        let edicao = EdicaoCampos {
            // mesmo título já gravado
            titulo: Some(atual.titulo.clone()),
            ..Default::default()
        };
        assert!(ProtocoloService::calcular_deltas(&atual, &edicao).is_empty());
    }

    #[test]
    fn nota_interna_gera_entrada_nao_publica() {
        let atual = protocolo_base();
        let edicao = EdicaoCampos {
            observacoes_internas: Some("Aguardando parecer jurídico".to_string()),
            observacoes_publicas: Some("Em análise pela secretaria".to_string()),
            ..Default::default()
        };

        let deltas = ProtocoloService::calcular_deltas(&atual, &edicao);
        let publico_por_campo: Vec<(&str, bool)> =
            deltas.iter().map(|(campo, _, _, publico)| (*campo, *publico)).collect();
        assert_eq!(
            publico_por_campo,
            vec![("observacoes_internas", false), ("observacoes_publicas", true)]
        );
    }

    #[test]
    fn formulario_usa_o_ramo_dinamico() {
        let atual = protocolo_base();
        let edicao = EdicaoCampos {
            formulario: Some(serde_json::json!({ "lado_da_rua": "par" })),
            ..Default::default()
        };

        let deltas = ProtocoloService::calcular_deltas(&atual, &edicao);
        assert_eq!(deltas.len(), 1);
        assert!(matches!(deltas[0].2, ValorCampo::Dinamico(_)));
    }

    #[test]
    fn aresta_terminal_para_terminal_vira_already_terminal() {
        let erro = ProtocoloService::validar_aresta(
            StatusProtocolo::Concluido,
            StatusProtocolo::Cancelado,
        )
        .unwrap_err();
        assert!(matches!(erro, AppError::AlreadyTerminal { .. }));
    }

    #[test]
    fn aresta_fora_da_tabela_vira_illegal_transition() {
        let erro =
            ProtocoloService::validar_aresta(StatusProtocolo::Aberto, StatusProtocolo::Concluido)
                .unwrap_err();
        assert!(matches!(
            erro,
            AppError::IllegalTransition {
                de: StatusProtocolo::Aberto,
                para: StatusProtocolo::Concluido
            }
        ));
    }

    #[test]
    fn aresta_valida_passa() {
        assert!(ProtocoloService::validar_aresta(
            StatusProtocolo::AguardandoAprovacao,
            StatusProtocolo::Aprovado
        )
        .is_ok());
    }
}
