pub mod diretorio;
pub mod protocolos;
pub mod tenancy;
