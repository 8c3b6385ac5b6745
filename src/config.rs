// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{
        CatalogoRepository, DiretorioRepository, HistoricoRepository, ProtocoloRepository,
        SequenciaRepository, TenantRepository,
    },
    services::{
        event_bus::CAPACIDADE_PADRAO, AvaliacaoService, DiretorioService, EventBus,
        ProtocoloService, TenancyService,
    },
};

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub i18n_store: I18nStore,
    pub event_bus: EventBus,
    pub protocolo_service: ProtocoloService,
    pub avaliacao_service: AvaliacaoService,
    pub tenancy_service: TenancyService,
    pub diretorio_service: DiretorioService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        // Timeout de aquisição curto: se a pool esgotar, a operação devolve
        // 'indisponivel' em vez de enfileirar indefinidamente
        let db_pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("conexão com o banco de dados estabelecida");

        // --- Monta o grafo de dependências ---
        let protocolo_repo = ProtocoloRepository::new(db_pool.clone());
        let historico_repo = HistoricoRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let catalogo_repo = CatalogoRepository::new(db_pool.clone());
        let sequencia_repo = SequenciaRepository::new(db_pool.clone());
        let diretorio_repo = DiretorioRepository::new(db_pool.clone());

        let event_bus = EventBus::new(CAPACIDADE_PADRAO);

        let protocolo_service = ProtocoloService::new(
            protocolo_repo.clone(),
            historico_repo.clone(),
            tenant_repo.clone(),
            catalogo_repo.clone(),
            sequencia_repo,
            diretorio_repo.clone(),
            event_bus.clone(),
            db_pool.clone(),
        );
        let avaliacao_service = AvaliacaoService::new(
            protocolo_repo,
            historico_repo,
            event_bus.clone(),
            db_pool.clone(),
        );
        let tenancy_service = TenancyService::new(tenant_repo);
        let diretorio_service = DiretorioService::new(diretorio_repo, catalogo_repo);

        Ok(Self {
            db_pool,
            jwt_secret,
            i18n_store: I18nStore::new(),
            event_bus,
            protocolo_service,
            avaliacao_service,
            tenancy_service,
            diretorio_service,
        })
    }
}
