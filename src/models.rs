pub mod ator;
pub mod catalogo;
pub mod diretorio;
pub mod eventos;
pub mod historico;
pub mod protocolo;
pub mod tenancy;
