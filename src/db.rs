pub mod catalogo_repo;
pub use catalogo_repo::CatalogoRepository;
pub mod diretorio_repo;
pub use diretorio_repo::DiretorioRepository;
pub mod historico_repo;
pub use historico_repo::HistoricoRepository;
pub mod protocolo_repo;
pub use protocolo_repo::ProtocoloRepository;
pub mod sequencia_repo;
pub use sequencia_repo::SequenciaRepository;
pub mod tenant_repo;
pub use tenant_repo::TenantRepository;
