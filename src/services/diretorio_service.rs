// src/services/diretorio_service.rs

use uuid::Uuid;

use crate::{
    common::{error::AppError, retry::com_retentativa_leitura},
    db::{CatalogoRepository, DiretorioRepository},
    models::{ator::Ator, catalogo::ServicoCatalogo, diretorio::Secretaria},
    services::access_guard,
};

// Diretório de secretarias + catálogo de serviços: modelos de leitura
// escopados por tenant.
#[derive(Clone)]
pub struct DiretorioService {
    diretorio_repo: DiretorioRepository,
    catalogo_repo: CatalogoRepository,
}

impl DiretorioService {
    pub fn new(diretorio_repo: DiretorioRepository, catalogo_repo: CatalogoRepository) -> Self {
        Self {
            diretorio_repo,
            catalogo_repo,
        }
    }

    pub async fn listar_secretarias(
        &self,
        ator: &Ator,
        tenant_id: Uuid,
    ) -> Result<Vec<Secretaria>, AppError> {
        access_guard::autorizar_leitura_tenant(ator, tenant_id)?;
        com_retentativa_leitura(|| self.diretorio_repo.listar_secretarias(tenant_id)).await
    }

    pub async fn listar_servicos(
        &self,
        ator: &Ator,
        tenant_id: Uuid,
    ) -> Result<Vec<ServicoCatalogo>, AppError> {
        access_guard::autorizar_leitura_tenant(ator, tenant_id)?;
        com_retentativa_leitura(|| self.catalogo_repo.listar(tenant_id)).await
    }
}
