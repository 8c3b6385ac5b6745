// src/common/retry.rs

use std::future::Future;
use std::time::Duration;

use crate::common::error::AppError;

const MAX_TENTATIVAS: u32 = 3;
const ATRASO_BASE_MS: u64 = 50;

/// Retentativa com backoff exponencial, SOMENTE para leituras e SOMENTE para
/// falhas de infraestrutura (`Unavailable`). Escritas nunca passam por aqui:
/// sem chave de idempotência, repetir uma escrita arrisca duplicação.
pub async fn com_retentativa_leitura<T, F, Fut>(operacao: F) -> Result<T, AppError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut tentativa: u32 = 0;
    loop {
        match operacao().await {
            Err(erro) if erro.eh_indisponibilidade() && tentativa + 1 < MAX_TENTATIVAS => {
                tentativa += 1;
                let atraso = Duration::from_millis(ATRASO_BASE_MS << tentativa);
                tracing::warn!(tentativa, atraso_ms = atraso.as_millis() as u64,
                    "leitura indisponível, repetindo");
                tokio::time::sleep(atraso).await;
            }
            resultado => return resultado,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn repete_apenas_indisponibilidade() {
        let chamadas = AtomicU32::new(0);
        let resultado: Result<u32, AppError> = com_retentativa_leitura(|| async {
            let n = chamadas.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(AppError::Unavailable)
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(resultado.unwrap(), 7);
        assert_eq!(chamadas.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn erro_de_dominio_nao_repete() {
        let chamadas = AtomicU32::new(0);
        let resultado: Result<u32, AppError> = com_retentativa_leitura(|| async {
            chamadas.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Forbidden)
        })
        .await;
        assert!(matches!(resultado, Err(AppError::Forbidden)));
        assert_eq!(chamadas.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn desiste_depois_do_limite() {
        let chamadas = AtomicU32::new(0);
        let resultado: Result<u32, AppError> = com_retentativa_leitura(|| async {
            chamadas.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Unavailable)
        })
        .await;
        assert!(matches!(resultado, Err(AppError::Unavailable)));
        assert_eq!(chamadas.load(Ordering::SeqCst), MAX_TENTATIVAS);
    }
}
