// src/models/ator.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// Papel (enumeração fechada, não é um grafo de permissões)
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "papel_usuario", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Papel {
    SuperAdmin,
    Admin,
    Secretario,
    Diretor,
    Coordenador,
    Supervisor,
    Operador,
    Cidadao,
}

impl Papel {
    pub fn eh_cidadao(self) -> bool {
        matches!(self, Papel::Cidadao)
    }

    /// Secretário (e acima) atua em todas as secretarias do seu tenant.
    pub fn atua_em_todas_secretarias(self) -> bool {
        matches!(self, Papel::SuperAdmin | Papel::Admin | Papel::Secretario)
    }

    /// Reatribuição exige supervisor ou acima.
    pub fn pode_reatribuir(self) -> bool {
        matches!(
            self,
            Papel::SuperAdmin
                | Papel::Admin
                | Papel::Secretario
                | Papel::Diretor
                | Papel::Coordenador
                | Papel::Supervisor
        )
    }
}

// ---
// Ator: a tupla de identidade já resolvida pelo colaborador de autenticação.
// Sempre passada explicitamente, nunca lida de estado global.
// ---

#[derive(Debug, Clone)]
pub struct Ator {
    pub usuario_id: Uuid,
    pub tenant_id: Uuid,
    pub papel: Papel,
    pub secretaria_id: Option<Uuid>,
}

/// Claims do token emitido pelo colaborador de autenticação.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub tenant_id: Uuid,
    pub papel: Papel,
    pub secretaria_id: Option<Uuid>,
    pub exp: usize,
    pub iat: usize,
}

impl From<Claims> for Ator {
    fn from(claims: Claims) -> Self {
        Self {
            usuario_id: claims.sub,
            tenant_id: claims.tenant_id,
            papel: claims.papel,
            secretaria_id: claims.secretaria_id,
        }
    }
}

/// Metadados da requisição gravados em cada entrada do histórico.
#[derive(Debug, Clone, Default)]
pub struct MetadadosRequisicao {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}
