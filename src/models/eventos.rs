// src/models/eventos.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::protocolo::StatusProtocolo;

// ---
// Eventos de domínio
// ---
// Contrato estável consumido pelos colaboradores de notificação e analytics.
// Evolução apenas aditiva: nunca remova nem renomeie campos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "evento", rename_all = "snake_case")]
pub enum EventoDominio {
    ProtocoloCriado {
        protocolo_id: Uuid,
        tenant_id: Uuid,
    },
    StatusAlterado {
        protocolo_id: Uuid,
        tenant_id: Uuid,
        de: StatusProtocolo,
        para: StatusProtocolo,
        ator_id: Uuid,
    },
    ProtocoloAtribuido {
        protocolo_id: Uuid,
        tenant_id: Uuid,
        responsavel_id: Uuid,
    },
    ProtocoloAvaliado {
        protocolo_id: Uuid,
        tenant_id: Uuid,
        nota: i16,
    },
}

impl EventoDominio {
    pub fn protocolo_id(&self) -> Uuid {
        match self {
            EventoDominio::ProtocoloCriado { protocolo_id, .. }
            | EventoDominio::StatusAlterado { protocolo_id, .. }
            | EventoDominio::ProtocoloAtribuido { protocolo_id, .. }
            | EventoDominio::ProtocoloAvaliado { protocolo_id, .. } => *protocolo_id,
        }
    }

    pub fn nome(&self) -> &'static str {
        match self {
            EventoDominio::ProtocoloCriado { .. } => "protocolo_criado",
            EventoDominio::StatusAlterado { .. } => "status_alterado",
            EventoDominio::ProtocoloAtribuido { .. } => "protocolo_atribuido",
            EventoDominio::ProtocoloAvaliado { .. } => "protocolo_avaliado",
        }
    }
}
