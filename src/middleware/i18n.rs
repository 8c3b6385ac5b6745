// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

// Extrator de idioma negociado via Accept-Language. O padrão da plataforma
// é português.
pub struct Locale(pub String);

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let idioma = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|valor| valor.to_str().ok())
            .and_then(|texto| {
                accept_language::parse(texto)
                    .first()
                    // "pt-BR" -> "pt"; "en" fica "en"
                    .map(|tag| tag.split('-').next().unwrap_or(tag).to_string())
            })
            .unwrap_or_else(|| "pt".to_string());

        Ok(Locale(idioma))
    }
}
