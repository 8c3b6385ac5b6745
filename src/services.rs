pub mod access_guard;
pub mod avaliacao_service;
pub mod diretorio_service;
pub mod event_bus;
pub mod protocolo_service;
pub mod tenancy_service;

pub use avaliacao_service::AvaliacaoService;
pub use diretorio_service::DiretorioService;
pub use event_bus::EventBus;
pub use protocolo_service::ProtocoloService;
pub use tenancy_service::TenancyService;
