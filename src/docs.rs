// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Protocolos ---
        handlers::protocolos::criar_protocolo,
        handlers::protocolos::listar_protocolos,
        handlers::protocolos::obter_protocolo,
        handlers::protocolos::editar_protocolo,
        handlers::protocolos::transicionar_protocolo,
        handlers::protocolos::atribuir_protocolo,
        handlers::protocolos::comentar_protocolo,
        handlers::protocolos::anexar_documento,
        handlers::protocolos::listar_documentos,
        handlers::protocolos::reagendar_protocolo,
        handlers::protocolos::registrar_pagamento,
        handlers::protocolos::avaliar_protocolo,
        handlers::protocolos::historico_protocolo,

        // --- Tenancy ---
        handlers::tenancy::provisionar_tenant,
        handlers::tenancy::alterar_status_tenant,
        handlers::tenancy::obter_tenant_atual,

        // --- Diretório ---
        handlers::diretorio::listar_secretarias,
        handlers::diretorio::listar_servicos,
    ),
    components(
        schemas(
            // --- Protocolos ---
            models::protocolo::StatusProtocolo,
            models::protocolo::Prioridade,
            models::protocolo::Requerente,
            models::protocolo::Protocolo,
            models::protocolo::DocumentoProtocolo,

            // --- Histórico ---
            models::historico::AcaoHistorico,
            models::historico::ValorCampo,
            models::historico::HistoricoProtocolo,

            // --- Tenancy ---
            models::tenancy::PlanoTenant,
            models::tenancy::StatusTenant,
            models::tenancy::Tenant,

            // --- Diretório ---
            models::ator::Papel,
            models::diretorio::StatusUsuario,
            models::diretorio::Secretaria,
            models::diretorio::PerfilUsuario,
            models::catalogo::ServicoCatalogo,

            // --- Payloads ---
            handlers::protocolos::RequerentePayload,
            handlers::protocolos::CriarProtocoloPayload,
            handlers::protocolos::TransicaoPayload,
            handlers::protocolos::EditarProtocoloPayload,
            handlers::protocolos::AtribuirPayload,
            handlers::protocolos::ComentarioPayload,
            handlers::protocolos::AnexarDocumentoPayload,
            handlers::protocolos::ReagendarPayload,
            handlers::protocolos::PagamentoPayload,
            handlers::protocolos::AvaliacaoPayload,
            handlers::tenancy::ProvisionarTenantPayload,
            handlers::tenancy::AlterarStatusTenantPayload,
        )
    ),
    tags(
        (name = "Protocolos", description = "Ciclo de vida dos protocolos de atendimento"),
        (name = "Tenancy", description = "Provisionamento e dados do município"),
        (name = "Diretorio", description = "Secretarias e catálogo de serviços")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
