// src/services/tenancy_service.rs

use uuid::Uuid;

use crate::{
    common::{error::AppError, retry::com_retentativa_leitura},
    db::TenantRepository,
    models::{
        ator::Ator,
        tenancy::{PlanoTenant, StatusTenant, Tenant},
    },
    services::access_guard,
};

// Registro de tenants: provisionamento e modelo de leitura. Plano e billing
// são mutados por colaboradores externos; aqui fica só a interface.
#[derive(Clone)]
pub struct TenancyService {
    tenant_repo: TenantRepository,
}

impl TenancyService {
    pub fn new(tenant_repo: TenantRepository) -> Self {
        Self { tenant_repo }
    }

    /// Provisiona um município novo. Operação de plataforma (super_admin).
    #[allow(clippy::too_many_arguments)]
    pub async fn provisionar(
        &self,
        ator: &Ator,
        slug: &str,
        nome: &str,
        plano: PlanoTenant,
        max_usuarios: i32,
        max_protocolos: i32,
        armazenamento_gb: i32,
    ) -> Result<Tenant, AppError> {
        access_guard::autorizar_provisionamento(ator)?;

        // Código de numeração: slug em caixa alta, sem hífens
        // ("vila-nova" -> "VILANOVA-2025-0001")
        let codigo = slug.to_uppercase().replace('-', "");

        let tenant = self
            .tenant_repo
            .criar(slug, &codigo, nome, plano, max_usuarios, max_protocolos, armazenamento_gb)
            .await?;

        tracing::info!(slug = %tenant.slug, "município provisionado");
        Ok(tenant)
    }

    /// Suspensão/reativação vinda do colaborador de billing. Nunca apaga.
    pub async fn alterar_status(
        &self,
        ator: &Ator,
        tenant_id: Uuid,
        status: StatusTenant,
    ) -> Result<Tenant, AppError> {
        access_guard::autorizar_provisionamento(ator)?;

        self.tenant_repo.atualizar_status(tenant_id, status).await?;

        self.tenant_repo
            .buscar_por_id(tenant_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Tenant {}", tenant_id)))
    }

    pub async fn obter(&self, ator: &Ator, tenant_id: Uuid) -> Result<Tenant, AppError> {
        access_guard::autorizar_leitura_tenant(ator, tenant_id)?;

        com_retentativa_leitura(|| self.tenant_repo.buscar_por_id(tenant_id))
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Tenant {}", tenant_id)))
    }
}
