// src/services/event_bus.rs

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::eventos::EventoDominio;

/// Quantos eventos um assinante lento pode acumular antes de começar a
/// perder os mais antigos.
pub const CAPACIDADE_PADRAO: usize = 256;

// Emissor de eventos de domínio. A publicação acontece DEPOIS do commit e é
// fire-and-forget: um assinante lento ou quebrado jamais desfaz ou atrasa a
// transação que originou o evento.
#[derive(Clone)]
pub struct EventBus {
    remetente: broadcast::Sender<EventoDominio>,
}

impl EventBus {
    pub fn new(capacidade: usize) -> Self {
        let (remetente, _) = broadcast::channel(capacidade);
        Self { remetente }
    }

    /// Publica sem bloquear. Zero assinantes não é erro.
    pub fn publicar(&self, evento: EventoDominio) {
        let nome = evento.nome();
        match self.remetente.send(evento) {
            Ok(entregues) => {
                tracing::debug!(evento = nome, entregues, "evento de domínio publicado");
            }
            Err(_) => {
                tracing::debug!(evento = nome, "evento publicado sem assinantes");
            }
        }
    }

    pub fn assinar(&self) -> broadcast::Receiver<EventoDominio> {
        self.remetente.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(CAPACIDADE_PADRAO)
    }
}

/// Um colaborador externo interessado nos eventos (notificação, analytics).
#[async_trait]
pub trait Assinante: Send + Sync {
    fn nome(&self) -> &'static str;
    async fn processar(&self, evento: EventoDominio);
}

/// Liga um assinante ao barramento em uma task própria. Se ele atrasar a
/// ponto de perder eventos, isso vira log, nunca backpressure no núcleo.
pub fn iniciar_assinante(bus: &EventBus, assinante: Arc<dyn Assinante>) -> tokio::task::JoinHandle<()> {
    let mut recebedor = bus.assinar();
    tokio::spawn(async move {
        loop {
            match recebedor.recv().await {
                Ok(evento) => assinante.processar(evento).await,
                Err(broadcast::error::RecvError::Lagged(perdidos)) => {
                    tracing::warn!(
                        assinante = assinante.nome(),
                        perdidos,
                        "assinante lento perdeu eventos"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

// O colaborador de entrega de notificações fica fora deste núcleo; aqui
// apenas registramos o que seria despachado.
pub struct AssinanteNotificacoes;

#[async_trait]
impl Assinante for AssinanteNotificacoes {
    fn nome(&self) -> &'static str {
        "notificacoes"
    }

    async fn processar(&self, evento: EventoDominio) {
        tracing::info!(
            evento = evento.nome(),
            protocolo_id = %evento.protocolo_id(),
            "notificação encaminhada ao colaborador externo"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn assinante_recebe_evento_publicado() {
        let bus = EventBus::new(8);
        let mut recebedor = bus.assinar();

        let evento = EventoDominio::ProtocoloCriado {
            protocolo_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
        };
        bus.publicar(evento.clone());

        assert_eq!(recebedor.recv().await.unwrap(), evento);
    }

    #[tokio::test]
    async fn publicar_sem_assinantes_nao_falha() {
        let bus = EventBus::new(8);
        bus.publicar(EventoDominio::ProtocoloAvaliado {
            protocolo_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            nota: 5,
        });
        // Sem pânico, sem erro: publicação é fire-and-forget.
    }

    #[tokio::test]
    async fn assinante_lento_nao_bloqueia_o_publicador() {
        let bus = EventBus::new(4);
        // Assinante existe mas nunca consome
        let _recebedor = bus.assinar();

        // Publica bem além da capacidade; cada publicar retorna na hora
        for _ in 0..64 {
            bus.publicar(EventoDominio::ProtocoloCriado {
                protocolo_id: Uuid::new_v4(),
                tenant_id: Uuid::new_v4(),
            });
        }
    }

    #[tokio::test]
    async fn cada_assinante_recebe_sua_copia() {
        let bus = EventBus::new(8);
        let mut a = bus.assinar();
        let mut b = bus.assinar();

        let evento = EventoDominio::ProtocoloAtribuido {
            protocolo_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            responsavel_id: Uuid::new_v4(),
        };
        bus.publicar(evento.clone());

        assert_eq!(a.recv().await.unwrap(), evento);
        assert_eq!(b.recv().await.unwrap(), evento);
    }
}
