// src/models/protocolo.rs

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// Enums de domínio
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "status_protocolo", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StatusProtocolo {
    Aberto,
    EmAndamento,
    AguardandoDocumentos,
    AguardandoAprovacao,
    Aprovado,
    Rejeitado,
    Concluido,
    Cancelado,
    Suspenso,
    EmRevisao,
}

impl StatusProtocolo {
    /// Tabela de transições dirigidas do ciclo de vida. O `match` externo é
    /// exaustivo sobre o estado de origem: adicionar um novo status obriga a
    /// revisitar este ponto.
    pub fn pode_transicionar_para(self, destino: StatusProtocolo) -> bool {
        use StatusProtocolo::*;
        match self {
            Aberto => matches!(destino, EmAndamento | Cancelado),
            EmAndamento => matches!(
                destino,
                AguardandoDocumentos
                    | AguardandoAprovacao
                    | Aprovado
                    | Rejeitado
                    | Suspenso
                    | Cancelado
            ),
            AguardandoDocumentos => matches!(destino, EmAndamento | Cancelado),
            AguardandoAprovacao => matches!(destino, Aprovado | Rejeitado | EmAndamento),
            Aprovado => matches!(destino, Concluido),
            Rejeitado => matches!(destino, EmRevisao | Cancelado),
            EmRevisao => matches!(destino, EmAndamento | Rejeitado),
            Suspenso => matches!(destino, EmAndamento | Cancelado),
            // Estados terminais: nenhuma aresta de saída
            Concluido | Cancelado => false,
        }
    }

    pub fn eh_terminal(self) -> bool {
        matches!(self, StatusProtocolo::Concluido | StatusProtocolo::Cancelado)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "prioridade_protocolo", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Prioridade {
    Baixa,
    Media,
    Alta,
    Urgente,
    Critica,
}

// ---
// Requerente (objeto de valor)
// ---
// O cidadão pode abrir protocolo presencialmente sem conta no sistema, por
// isso os dados são capturados na própria linha e não como chave estrangeira.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Requerente {
    #[sqlx(rename = "requerente_nome")]
    #[schema(example = "Maria da Silva")]
    pub nome: String,

    #[sqlx(rename = "requerente_documento")]
    #[schema(example = "123.456.789-00")]
    pub documento: String,

    #[sqlx(rename = "requerente_email")]
    pub email: Option<String>,

    #[sqlx(rename = "requerente_telefone")]
    pub telefone: Option<String>,
}

// ---
// Protocolo (a entidade central)
// ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Protocolo {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    /// Imutável após a criação. Único dentro do tenant.
    #[schema(example = "SPRINGFIELD-2025-0001")]
    pub numero_protocolo: String,

    #[schema(example = "Infraestrutura")]
    pub categoria: String,
    pub subcategoria: Option<String>,
    pub prioridade: Prioridade,
    pub urgente: bool,

    pub servico_id: Uuid,
    #[schema(example = "Tapa-buraco")]
    pub servico_nome: String,

    #[sqlx(flatten)]
    pub requerente: Requerente,
    pub criado_por: Uuid,
    pub responsavel_id: Option<Uuid>,
    pub supervisor_id: Option<Uuid>,
    pub secretaria_origem_id: Option<Uuid>,
    pub secretaria_destino_id: Uuid,

    #[schema(example = "Buraco na Rua das Flores")]
    pub titulo: String,
    pub descricao: String,
    pub formulario: Option<serde_json::Value>,
    /// Visível apenas para servidores.
    pub observacoes_internas: Option<String>,
    /// Visível para o cidadão.
    pub observacoes_publicas: Option<String>,

    pub status: StatusProtocolo,
    pub aberto_em: DateTime<Utc>,
    pub data_limite: DateTime<Utc>,
    pub concluido_em: Option<DateTime<Utc>>,
    pub pago_em: Option<DateTime<Utc>>,
    pub avaliado_em: Option<DateTime<Utc>>,

    pub avaliacao_nota: Option<i16>,
    pub avaliacao_comentario: Option<String>,

    #[schema(example = "35.00")]
    pub valor_taxa: Decimal,
    pub desconto: Decimal,
    pub valor_multa: Decimal,
    pub metodo_pagamento: Option<String>,

    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentoProtocolo {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub protocolo_id: Uuid,
    #[schema(example = "s3://prefeitura/anexos/laudo.pdf")]
    pub uri: String,
    pub nome_arquivo: String,
    pub mime_type: String,
    pub tamanho_bytes: i64,
    pub enviado_por: Uuid,
    pub criado_em: DateTime<Utc>,
}

/// Dados já resolvidos de um protocolo a inserir: número reservado, prazo
/// calculado e termos do serviço copiados do catálogo.
#[derive(Debug, Clone)]
pub struct NovoProtocolo {
    pub tenant_id: Uuid,
    pub numero_protocolo: String,
    pub categoria: String,
    pub subcategoria: Option<String>,
    pub prioridade: Prioridade,
    pub urgente: bool,
    pub servico_id: Uuid,
    pub servico_nome: String,
    pub requerente: Requerente,
    pub criado_por: Uuid,
    pub secretaria_origem_id: Option<Uuid>,
    pub secretaria_destino_id: Uuid,
    pub titulo: String,
    pub descricao: String,
    pub formulario: Option<serde_json::Value>,
    pub aberto_em: DateTime<Utc>,
    pub data_limite: DateTime<Utc>,
    pub valor_taxa: Decimal,
}

// ---
// Numeração e prazo
// ---

/// Monta o número humano do protocolo: `CODIGO-ANO-SEQ` com a sequência
/// zero-preenchida a 4 dígitos.
pub fn formatar_numero(codigo_tenant: &str, ano: i32, sequencia: i32) -> String {
    format!("{}-{}-{:04}", codigo_tenant, ano, sequencia)
}

/// Prazo em dias corridos a partir da abertura. Não há calendário de
/// feriados: fins de semana contam. Alterar o prazo depois é uma ação
/// explícita de reagendamento, nunca um recálculo silencioso.
pub fn calcular_data_limite(aberto_em: DateTime<Utc>, prazo_dias: i32) -> DateTime<Utc> {
    aberto_em + Duration::days(i64::from(prazo_dias))
}

#[cfg(test)]
mod tests {
    use super::*;
    use StatusProtocolo::*;

    const TODOS: [StatusProtocolo; 10] = [
        Aberto,
        EmAndamento,
        AguardandoDocumentos,
        AguardandoAprovacao,
        Aprovado,
        Rejeitado,
        Concluido,
        Cancelado,
        Suspenso,
        EmRevisao,
    ];

    fn arestas_permitidas() -> Vec<(StatusProtocolo, StatusProtocolo)> {
        vec![
            (Aberto, EmAndamento),
            (Aberto, Cancelado),
            (EmAndamento, AguardandoDocumentos),
            (EmAndamento, AguardandoAprovacao),
            (EmAndamento, Aprovado),
            (EmAndamento, Rejeitado),
            (EmAndamento, Suspenso),
            (EmAndamento, Cancelado),
            (AguardandoDocumentos, EmAndamento),
            (AguardandoDocumentos, Cancelado),
            (AguardandoAprovacao, Aprovado),
            (AguardandoAprovacao, Rejeitado),
            (AguardandoAprovacao, EmAndamento),
            (Aprovado, Concluido),
            (Rejeitado, EmRevisao),
            (Rejeitado, Cancelado),
            (EmRevisao, EmAndamento),
            (EmRevisao, Rejeitado),
            (Suspenso, EmAndamento),
            (Suspenso, Cancelado),
        ]
    }

    #[test]
    fn matriz_completa_de_transicoes() {
        // Varre as 100 combinações: tudo que não está na tabela é negado.
        let permitidas = arestas_permitidas();
        for de in TODOS {
            for para in TODOS {
                let esperado = permitidas.contains(&(de, para));
                assert_eq!(
                    de.pode_transicionar_para(para),
                    esperado,
                    "aresta ({:?} -> {:?})",
                    de,
                    para
                );
            }
        }
    }

    #[test]
    fn terminais_nao_tem_saida() {
        for para in TODOS {
            assert!(!Concluido.pode_transicionar_para(para));
            assert!(!Cancelado.pode_transicionar_para(para));
        }
        assert!(Concluido.eh_terminal());
        assert!(Cancelado.eh_terminal());
        assert!(!Aberto.eh_terminal());
    }

    #[test]
    fn salto_direto_de_aberto_para_concluido_eh_negado() {
        assert!(!Aberto.pode_transicionar_para(Concluido));
    }

    #[test]
    fn formato_do_numero_de_protocolo() {
        assert_eq!(formatar_numero("SPRINGFIELD", 2025, 1), "SPRINGFIELD-2025-0001");
        assert_eq!(formatar_numero("SPRINGFIELD", 2025, 42), "SPRINGFIELD-2025-0042");
        // A partir de 5 dígitos o número cresce, sem truncar
        assert_eq!(formatar_numero("SP", 2026, 123_456), "SP-2026-123456");
    }

    #[test]
    fn prazo_em_dias_corridos() {
        let abertura = "2025-01-10T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let limite = calcular_data_limite(abertura, 15);
        assert_eq!(limite, "2025-01-25T12:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }
}
